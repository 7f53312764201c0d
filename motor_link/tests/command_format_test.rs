use motor_link::{Action, Command, CommandEnvelope};
use serde_json::{json, Value};

fn encoded(command: Command, timestamp: u64) -> Value {
    let text = command.issue(timestamp).encode().unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_set_target_envelope() {
    let parsed = encoded(Command::SetTarget { motor: 1, target: 12 }, 1712345678901);

    assert_eq!(parsed["type"], "set_target");
    assert_eq!(parsed["data"], json!({ "motor": 1, "target": 12 }));
    assert_eq!(parsed["timestamp"], 1712345678901u64);
}

#[test]
fn test_commands_without_payload_carry_empty_data_object() {
    for command in [
        Command::GetIp {},
        Command::CheckUpdates {},
        Command::CalibrateAll {},
        Command::EmergencyStop {},
        Command::AllFullForward {},
        Command::AllFullBackward {},
    ] {
        let name = command.name();
        let parsed = encoded(command, 42);

        assert_eq!(parsed["type"], name);
        assert_eq!(parsed["data"], json!({}), "{} should send an empty data object", name);
        assert_eq!(parsed["timestamp"], 42);
    }
}

#[test]
fn test_servo_and_update_payload_fields() {
    let servo = encoded(Command::SetServo { state: true }, 1);
    assert_eq!(servo["type"], "set_servo");
    assert_eq!(servo["data"]["state"], true);

    let fs = encoded(
        Command::UpdateLittlefs { url: "http://host/littlefs.bin".to_string() },
        1,
    );
    assert_eq!(fs["type"], "update_littlefs");
    assert_eq!(fs["data"]["url"], "http://host/littlefs.bin");

    let all = encoded(Command::SetAllTargets { target: 7 }, 1);
    assert_eq!(all["type"], "set_all_targets");
    assert_eq!(all["data"], json!({ "target": 7 }));
}

#[test]
fn test_envelope_has_exactly_three_keys() {
    let parsed = encoded(Command::Calibrate { motor: 3 }, 5);
    let keys: Vec<&String> = parsed.as_object().unwrap().keys().collect();

    assert_eq!(keys.len(), 3, "unexpected keys: {:?}", keys);
    assert_eq!(parsed["data"], json!({ "motor": 3 }));
}

#[test]
fn test_decode_what_the_controller_receives() {
    let text = r#"{"type":"full_backward","data":{"motor":2},"timestamp":99}"#;
    let envelope = CommandEnvelope::decode(text).unwrap();

    assert_eq!(envelope.command, Command::FullBackward { motor: 2 });
    assert_eq!(envelope.timestamp, 99);
}

#[test]
fn test_unknown_command_type_is_rejected() {
    let text = r#"{"type":"self_destruct","data":{},"timestamp":1}"#;
    assert!(CommandEnvelope::decode(text).is_err());
}

#[test]
fn test_filesystem_action_maps_to_littlefs_command() {
    let action = Action::UpdateFilesystem { url: "u".to_string() };
    assert_eq!(action.command(), Some(Command::UpdateLittlefs { url: "u".to_string() }));
    assert_eq!(Action::SetServo { on: false }.command(), Some(Command::SetServo { state: false }));
    assert_eq!(Action::Restart.command(), None);
}
