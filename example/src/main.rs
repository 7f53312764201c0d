// Line-oriented client for the motor controller
// Run with: cargo run -p example
// Against the simulator: cargo run -p sim, then MOTOR_PANEL_URL=ws://127.0.0.1:8080/ws

use std::time::Duration;

use motor_link::drivers::{PanelDriver, PanelDriverConfig};
use motor_link::{Action, LinkError, Severity};
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Act(Action),
    Confirm,
    Cancel,
    Show,
    Help,
    Quit,
}

fn motor_arg(arg: Option<&str>) -> Result<usize, String> {
    let text = arg.ok_or("missing motor number")?;
    let number: usize = text.parse().map_err(|_| format!("'{}' is not a motor number", text))?;
    // motors are numbered from 1 on the panel
    number.checked_sub(1).ok_or_else(|| "motors are numbered from 1".to_string())
}

fn mm_arg(arg: Option<&str>) -> Result<i32, String> {
    let text = arg.ok_or("missing target in mm")?;
    text.parse().map_err(|_| format!("'{}' is not a target in mm", text))
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Err("empty command".to_string());
    };
    let arg = words.next();

    let action = match cmd {
        "set" => {
            let motor = motor_arg(arg)?;
            Action::SetTarget { motor, target: mm_arg(words.next())? }
        }
        "all" => Action::SetAllTargets { target: mm_arg(arg)? },
        "cal" => Action::Calibrate { motor: motor_arg(arg)? },
        "fwd" => Action::FullForward { motor: motor_arg(arg)? },
        "back" => Action::FullBackward { motor: motor_arg(arg)? },
        "calall" => Action::CalibrateAll,
        "allfwd" => Action::AllFullForward,
        "allback" => Action::AllFullBackward,
        "servo" => match arg {
            Some("on") => Action::SetServo { on: true },
            Some("off") => Action::SetServo { on: false },
            _ => return Err("usage: servo on|off".to_string()),
        },
        "stop" => Action::EmergencyStop,
        "refresh" => Action::Refresh,
        "check" => Action::CheckUpdates,
        "update-fw" => Action::UpdateFirmware { url: arg.ok_or("missing URL")?.to_string() },
        "update-fs" => Action::UpdateFilesystem { url: arg.ok_or("missing URL")?.to_string() },
        "restart" => Action::Restart,
        "reset-wifi" => Action::ResetWifi,
        "format" => Action::FormatFilesystem,
        "yes" => return Ok(Input::Confirm),
        "no" => return Ok(Input::Cancel),
        "state" => return Ok(Input::Show),
        "help" | "?" => return Ok(Input::Help),
        "quit" | "q" => return Ok(Input::Quit),
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(Input::Act(action))
}

fn print_help() {
    println!("Commands:");
    println!("  set <motor> <mm>   move one motor       all <mm>        move every motor");
    println!("  cal <motor>        toggle calibration   calall          calibrate all");
    println!("  fwd|back <motor>   toggle full travel   allfwd|allback  toggle for all");
    println!("  servo on|off       stop                 refresh         state");
    println!("  check              update-fw <url>      update-fs <url>");
    println!("  restart            reset-wifi           format");
    println!("  yes|no             answer a confirmation");
    println!("  quit");
}

#[tokio::main]
async fn main() -> Result<(), LinkError> {
    tracing_subscriber::fmt::init();

    let config = PanelDriverConfig::from_env();
    println!("Connecting to {}...", config.url);
    let driver = PanelDriver::start(config)?;

    if let Err(e) = driver.wait_until_open(Duration::from_secs(10)).await {
        println!("{} (still retrying in the background)", e);
    }

    let mut connection = driver.subscribe_connection();
    tokio::spawn(async move {
        while connection.changed().await.is_ok() {
            let state = *connection.borrow_and_update();
            tracing::info!("Connection: {}", state.label());
        }
    });

    let mut notifications = driver.subscribe_notifications();
    tokio::spawn(async move {
        while let Ok(n) = notifications.recv().await {
            let marker = match n.severity {
                Severity::Success => "ok",
                Severity::Warning => "!!",
                Severity::Error => "ERR",
                Severity::Info => "..",
            };
            println!("[{}] {}", marker, n.message);
        }
    });

    print_help();
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(e) => {
                println!("Error: {}", e);
                continue;
            }
        };

        let result = match input {
            Input::Act(action) => driver.submit(action).await,
            Input::Confirm => driver.confirm().await,
            Input::Cancel => driver.cancel().await,
            Input::Show => {
                match serde_json::to_string_pretty(&driver.ui()) {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("Error: {}", e),
                }
                Ok(())
            }
            Input::Help => {
                print_help();
                Ok(())
            }
            Input::Quit => break,
        };

        match result {
            Ok(()) => {}
            Err(LinkError::ConfirmationRequired) => {
                // the engine has the dialog text; wait for it to publish
                tokio::time::sleep(Duration::from_millis(50)).await;
                if let Some(pending) = driver.pending_confirmation() {
                    println!("{}: {}", pending.title, pending.message);
                }
                println!("Type 'yes' to confirm or 'no' to cancel.");
            }
            Err(e) => {
                tracing::warn!("Command not sent: {}", e);
                println!("Error: {}", e);
            }
        }
    }

    println!("Shutting down...");
    driver.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_numbers_start_at_one() {
        assert_eq!(
            parse_input("set 1 12"),
            Ok(Input::Act(Action::SetTarget { motor: 0, target: 12 }))
        );
        assert!(parse_input("cal 0").is_err());
    }

    #[test]
    fn test_gated_and_plain_commands() {
        assert_eq!(
            parse_input("update-fw http://x/fw.bin"),
            Ok(Input::Act(Action::UpdateFirmware { url: "http://x/fw.bin".to_string() }))
        );
        assert_eq!(parse_input("servo off"), Ok(Input::Act(Action::SetServo { on: false })));
        assert_eq!(parse_input("yes"), Ok(Input::Confirm));
    }

    #[test]
    fn test_bad_input() {
        assert!(parse_input("set 2").is_err());
        assert!(parse_input("servo maybe").is_err());
        assert!(parse_input("fly").is_err());
    }
}
