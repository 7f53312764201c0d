//! In-memory model of the controller: four (or N) linear motors, a servo and
//! the OTA updater. Mirrors how the firmware reacts to each command, minus
//! the GPIO.

use serde_json::{json, Map, Value};

use motor_link::Command;

/// Mechanical travel of each motor, millimetres.
pub const MIN_MM: i32 = 0;
pub const MAX_MM: i32 = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimMotor {
    pub position: i32,
    pub target: i32,
    pub running: bool,
    pub calibrating: bool,
    pub full_forward: bool,
    pub full_backward: bool,
    /// -1, 0 or 1.
    pub dir: i32,
}

impl SimMotor {
    fn stop(&mut self) {
        *self = SimMotor {
            position: self.position,
            target: self.target,
            ..Default::default()
        };
    }

    fn start(&mut self, dir: i32) {
        self.running = true;
        self.dir = dir;
    }

    fn set_target(&mut self, target: i32) {
        self.target = target.clamp(MIN_MM, MAX_MM);
        self.calibrating = false;
        self.full_forward = false;
        self.full_backward = false;
        match self.target.cmp(&self.position) {
            std::cmp::Ordering::Greater => self.start(1),
            std::cmp::Ordering::Less => self.start(-1),
            std::cmp::Ordering::Equal => self.stop(),
        }
    }

    fn toggle_forward(&mut self) {
        if self.full_forward {
            self.stop();
        } else {
            self.calibrating = false;
            self.full_backward = false;
            self.full_forward = true;
            self.start(1);
        }
    }

    fn toggle_backward(&mut self) {
        if self.full_backward {
            self.stop();
        } else {
            self.calibrating = false;
            self.full_forward = false;
            self.full_backward = true;
            self.start(-1);
        }
    }

    fn toggle_calibration(&mut self) {
        if self.calibrating {
            self.stop();
        } else {
            self.full_forward = false;
            self.full_backward = false;
            self.calibrating = true;
            self.start(-1);
        }
    }

    /// Advance one millimetre. Returns true if anything changed.
    fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.position = (self.position + self.dir).clamp(MIN_MM, MAX_MM);

        let reached_target = !self.full_forward
            && !self.full_backward
            && !self.calibrating
            && ((self.dir > 0 && self.position >= self.target)
                || (self.dir < 0 && self.position <= self.target));
        // calibration runs into the home switch at 0
        let homed = self.calibrating && self.position == MIN_MM;
        let at_end = (self.full_forward && self.position == MAX_MM)
            || (self.full_backward && self.position == MIN_MM);

        if reached_target || homed || at_end {
            self.stop();
        }
        true
    }

    fn to_json(&self) -> Value {
        json!({
            "position": self.position,
            "target": self.target,
            "running": self.running,
            "calibrating": self.calibrating,
            "fullForward": self.full_forward,
            "fullBackward": self.full_backward,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimUpdate {
    pub in_progress: bool,
    pub progress: u8,
    pub status: String,
    /// `"firmware"` or `"littlefs"`, as on the wire.
    pub kind: &'static str,
}

/// What a command did to the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Broadcast the full state to everyone.
    State,
    /// Send this one message to the client that asked.
    Direct(Value),
    Nothing,
}

#[derive(Clone, Debug)]
pub struct Device {
    pub ip: String,
    pub motors: Vec<SimMotor>,
    pub servo_on: bool,
    pub update: Option<SimUpdate>,
    pub latest_version: String,
    pub firmware_url: Option<String>,
    pub littlefs_url: Option<String>,
    /// Progress added per simulation step while updating.
    pub update_step: u8,
}

impl Device {
    pub fn new(motor_count: usize, ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            motors: vec![SimMotor::default(); motor_count],
            servo_on: false,
            update: None,
            latest_version: "1.0.0".to_string(),
            firmware_url: None,
            littlefs_url: None,
            update_step: 20,
        }
    }

    pub fn any_running(&self) -> bool {
        self.motors.iter().any(|m| m.running)
    }

    fn motor_mut(&mut self, index: usize) -> Option<&mut SimMotor> {
        let count = self.motors.len();
        let motor = self.motors.get_mut(index);
        if motor.is_none() {
            tracing::warn!("command for motor{} ignored, device has {}", index, count);
        }
        motor
    }

    pub fn apply(&mut self, command: &Command) -> Reply {
        match *command {
            Command::GetIp {} => Reply::State,
            Command::CheckUpdates {} => Reply::Direct(self.update_info()),
            Command::UpdateFirmware { ref url } => self.start_update(url, "firmware"),
            Command::UpdateLittlefs { ref url } => self.start_update(url, "littlefs"),
            Command::SetTarget { motor, target } => match self.motor_mut(motor) {
                Some(m) => {
                    m.set_target(target);
                    Reply::State
                }
                None => Reply::Nothing,
            },
            Command::Calibrate { motor } => match self.motor_mut(motor) {
                Some(m) => {
                    m.toggle_calibration();
                    Reply::State
                }
                None => Reply::Nothing,
            },
            Command::FullForward { motor } => match self.motor_mut(motor) {
                Some(m) => {
                    m.toggle_forward();
                    Reply::State
                }
                None => Reply::Nothing,
            },
            Command::FullBackward { motor } => match self.motor_mut(motor) {
                Some(m) => {
                    m.toggle_backward();
                    Reply::State
                }
                None => Reply::Nothing,
            },
            Command::SetAllTargets { target } => {
                self.motors.iter_mut().for_each(|m| m.set_target(target));
                Reply::State
            }
            Command::CalibrateAll {} => {
                self.motors.iter_mut().for_each(SimMotor::toggle_calibration);
                Reply::State
            }
            Command::EmergencyStop {} => {
                self.motors.iter_mut().for_each(SimMotor::stop);
                Reply::State
            }
            Command::AllFullForward {} => {
                if self.motors.iter().all(|m| m.full_forward) {
                    self.motors.iter_mut().for_each(SimMotor::stop);
                } else {
                    for m in self.motors.iter_mut().filter(|m| !m.full_forward) {
                        m.toggle_forward();
                    }
                }
                Reply::State
            }
            Command::AllFullBackward {} => {
                if self.motors.iter().all(|m| m.full_backward) {
                    self.motors.iter_mut().for_each(SimMotor::stop);
                } else {
                    for m in self.motors.iter_mut().filter(|m| !m.full_backward) {
                        m.toggle_backward();
                    }
                }
                Reply::State
            }
            Command::SetServo { state } => {
                self.servo_on = state;
                Reply::State
            }
        }
    }

    fn start_update(&mut self, url: &str, kind: &'static str) -> Reply {
        if self.update.as_ref().is_some_and(|u| u.in_progress) {
            tracing::warn!("update already running, ignoring {}", kind);
            return Reply::Nothing;
        }
        let update = if url.trim().is_empty() {
            SimUpdate {
                in_progress: false,
                progress: 0,
                status: "Update failed: no URL".to_string(),
                kind,
            }
        } else {
            tracing::info!("Simulating {} update from {}", kind, url);
            SimUpdate {
                in_progress: true,
                progress: 0,
                status: "Downloading".to_string(),
                kind,
            }
        };
        self.update = Some(update);
        Reply::State
    }

    /// One simulation step: motors move a millimetre, a running update
    /// advances. Returns true if a broadcast is due.
    pub fn step(&mut self) -> bool {
        let mut changed = false;
        for motor in &mut self.motors {
            changed |= motor.step();
        }

        let step = self.update_step;
        if let Some(update) = self.update.as_mut().filter(|u| u.in_progress) {
            update.progress = update.progress.saturating_add(step).min(100);
            if update.progress == 100 {
                update.in_progress = false;
                update.status = "Update complete".to_string();
                if update.kind == "firmware" {
                    // now running the latest image
                    self.firmware_url = None;
                }
            } else {
                update.status = format!("Writing {}%", update.progress);
            }
            changed = true;
        }
        changed
    }

    pub fn update_info(&self) -> Value {
        json!({
            "type": "update_info",
            "data": {
                "latest_version": self.latest_version,
                "firmware_url": self.firmware_url.clone().unwrap_or_default(),
                "littlefs_url": self.littlefs_url.clone().unwrap_or_default(),
            }
        })
    }

    /// Full state broadcast, the same shape the firmware sends.
    pub fn snapshot(&self) -> Value {
        let mut doc = Map::new();
        for (i, motor) in self.motors.iter().enumerate() {
            doc.insert(format!("motor{}", i), motor.to_json());
        }
        doc.insert("ip".to_string(), json!(self.ip));
        doc.insert("servoState".to_string(), json!(self.servo_on));
        let status = if self.any_running() { "RUNNING" } else { "STOPPED" };
        doc.insert("globalStatus".to_string(), json!(status));
        doc.insert("latestVersion".to_string(), json!(self.latest_version));

        if let Some(ref update) = self.update {
            doc.insert("updateInProgress".to_string(), json!(update.in_progress));
            doc.insert("updateProgress".to_string(), json!(update.progress));
            doc.insert("updateStatus".to_string(), json!(update.status));
            doc.insert("updateType".to_string(), json!(update.kind));
        }
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motor_link::{DeviceSnapshot, GlobalStatus};

    fn run_until_idle(device: &mut Device) {
        for _ in 0..100 {
            if !device.step() {
                return;
            }
        }
        panic!("device never settled");
    }

    #[test]
    fn test_set_target_moves_and_stops() {
        let mut device = Device::new(4, "127.0.0.1");
        assert_eq!(device.apply(&Command::SetTarget { motor: 1, target: 5 }), Reply::State);
        assert!(device.motors[1].running);

        run_until_idle(&mut device);

        assert_eq!(device.motors[1].position, 5);
        assert!(!device.motors[1].running);
    }

    #[test]
    fn test_target_is_clamped_to_travel() {
        let mut device = Device::new(4, "127.0.0.1");
        device.apply(&Command::SetTarget { motor: 0, target: 99 });
        assert_eq!(device.motors[0].target, MAX_MM);
    }

    #[test]
    fn test_full_forward_toggles() {
        let mut device = Device::new(4, "127.0.0.1");
        device.apply(&Command::FullForward { motor: 2 });
        assert!(device.motors[2].full_forward && device.motors[2].running);

        device.apply(&Command::FullForward { motor: 2 });
        assert_eq!(device.motors[2].full_forward, false);
        assert_eq!(device.motors[2].running, false);
    }

    #[test]
    fn test_all_full_backward_toggles_as_a_group() {
        let mut device = Device::new(4, "127.0.0.1");
        device.apply(&Command::FullBackward { motor: 0 });
        device.apply(&Command::AllFullBackward {});
        assert!(device.motors.iter().all(|m| m.full_backward));

        device.apply(&Command::AllFullBackward {});
        assert!(device.motors.iter().all(|m| !m.full_backward && !m.running));
    }

    #[test]
    fn test_calibration_homes_to_zero() {
        let mut device = Device::new(4, "127.0.0.1");
        device.motors[3].position = 7;
        device.apply(&Command::Calibrate { motor: 3 });
        assert!(device.motors[3].calibrating);

        run_until_idle(&mut device);

        assert_eq!(device.motors[3].position, 0);
        assert!(!device.motors[3].calibrating);
    }

    #[test]
    fn test_emergency_stop_clears_everything() {
        let mut device = Device::new(4, "127.0.0.1");
        device.apply(&Command::AllFullForward {});
        device.apply(&Command::EmergencyStop {});
        assert!(!device.any_running());
        assert!(device.motors.iter().all(|m| !m.full_forward));
    }

    #[test]
    fn test_unknown_motor_is_ignored() {
        let mut device = Device::new(2, "127.0.0.1");
        assert_eq!(device.apply(&Command::Calibrate { motor: 5 }), Reply::Nothing);
    }

    #[test]
    fn test_firmware_update_progresses_to_completion() {
        let mut device = Device::new(4, "127.0.0.1");
        device.firmware_url = Some("http://updates/fw.bin".to_string());
        device.apply(&Command::UpdateFirmware { url: "http://updates/fw.bin".to_string() });

        run_until_idle(&mut device);

        let update = device.update.clone().unwrap();
        assert!(!update.in_progress);
        assert_eq!(update.progress, 100);
        assert_eq!(device.firmware_url, None);
    }

    #[test]
    fn test_empty_update_url_fails() {
        let mut device = Device::new(4, "127.0.0.1");
        device.apply(&Command::UpdateLittlefs { url: String::new() });
        let update = device.update.clone().unwrap();
        assert!(!update.in_progress);
        assert!(update.status.contains("failed"));
    }

    #[test]
    fn test_snapshot_decodes_with_panel_parser() {
        let mut device = Device::new(4, "10.0.0.2");
        device.apply(&Command::SetServo { state: true });
        device.apply(&Command::SetTarget { motor: 0, target: 3 });

        let text = device.snapshot().to_string();
        let snapshot = DeviceSnapshot::parse(&text, 4).unwrap();

        assert_eq!(snapshot.ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(snapshot.servo_state, Some(true));
        assert_eq!(snapshot.global_status, Some(GlobalStatus::Running));
        assert_eq!(snapshot.motors[&0].target, Some(3));
        assert_eq!(snapshot.motors.len(), 4);
    }

    #[test]
    fn test_update_info_shape() {
        let mut device = Device::new(4, "127.0.0.1");
        device.littlefs_url = Some("http://updates/fs.bin".to_string());

        let value = match device.apply(&Command::CheckUpdates {}) {
            Reply::Direct(value) => value,
            other => panic!("Expected a direct reply, got: {:?}", other),
        };
        let snapshot = DeviceSnapshot::from_value(&value, 4).unwrap();
        let info = snapshot.update_info.unwrap();
        assert_eq!(info.littlefs_url.as_deref(), Some("http://updates/fs.bin"));
        assert_eq!(info.firmware_url, None);
    }
}
