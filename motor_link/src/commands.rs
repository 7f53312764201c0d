//! Outbound command protocol.
//!
//! Every command travels inside the same envelope:
//!
//! ```text
//! { "type": "set_target", "data": { "motor": 1, "target": 12 }, "timestamp": 1712345678901 }
//! ```
//!
//! The protocol is one-way. The controller never replies to a command
//! directly; the effect shows up in a later state snapshot.

use serde::{Deserialize, Serialize};

use crate::LinkError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Command {
    /// Ask the controller to broadcast its full state (IP included).
    #[serde(rename = "get_ip")]
    GetIp {},

    #[serde(rename = "check_updates")]
    CheckUpdates {},

    #[serde(rename = "update_firmware")]
    UpdateFirmware { url: String },

    #[serde(rename = "update_littlefs")]
    UpdateLittlefs { url: String },

    #[serde(rename = "calibrate_all")]
    CalibrateAll {},

    #[serde(rename = "emergency_stop")]
    EmergencyStop {},

    #[serde(rename = "set_target")]
    SetTarget { motor: usize, target: i32 },

    #[serde(rename = "calibrate")]
    Calibrate { motor: usize },

    #[serde(rename = "full_forward")]
    FullForward { motor: usize },

    #[serde(rename = "full_backward")]
    FullBackward { motor: usize },

    #[serde(rename = "set_all_targets")]
    SetAllTargets { target: i32 },

    #[serde(rename = "all_full_forward")]
    AllFullForward {},

    #[serde(rename = "all_full_backward")]
    AllFullBackward {},

    #[serde(rename = "set_servo")]
    SetServo { state: bool },
}

impl Command {
    /// The lightweight state request used on open and as a liveness ping.
    pub fn refresh() -> Self {
        Command::GetIp {}
    }

    /// Wire name of the command (the envelope's `type`).
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetIp {} => "get_ip",
            Command::CheckUpdates {} => "check_updates",
            Command::UpdateFirmware { .. } => "update_firmware",
            Command::UpdateLittlefs { .. } => "update_littlefs",
            Command::CalibrateAll {} => "calibrate_all",
            Command::EmergencyStop {} => "emergency_stop",
            Command::SetTarget { .. } => "set_target",
            Command::Calibrate { .. } => "calibrate",
            Command::FullForward { .. } => "full_forward",
            Command::FullBackward { .. } => "full_backward",
            Command::SetAllTargets { .. } => "set_all_targets",
            Command::AllFullForward {} => "all_full_forward",
            Command::AllFullBackward {} => "all_full_backward",
            Command::SetServo { .. } => "set_servo",
        }
    }

    /// Refresh requests go out every few seconds; callers skip logging them.
    pub fn is_polling(&self) -> bool {
        matches!(self, Command::GetIp {})
    }

    /// Stamp the command with its issue time (epoch milliseconds).
    pub fn issue(self, timestamp: u64) -> CommandEnvelope {
        CommandEnvelope {
            command: self,
            timestamp,
        }
    }
}

/// A command plus the time it was issued. Immutable once built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    #[serde(flatten)]
    pub command: Command,
    pub timestamp: u64,
}

impl CommandEnvelope {
    pub fn encode(&self) -> Result<String, LinkError> {
        serde_json::to_string(self)
            .map_err(|e| LinkError::Serialization(format!("{}: {}", self.command.name(), e)))
    }

    pub fn decode(text: &str) -> Result<Self, LinkError> {
        serde_json::from_str(text).map_err(|e| LinkError::Serialization(e.to_string()))
    }
}
