//! Confirmation gate for destructive or device-disrupting actions.

use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::notifier::Severity;
use crate::LinkError;

/// Something the user asked for. Most actions map to exactly one command;
/// a few maintenance actions have no command on the current firmware.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Action {
    Refresh,
    SetTarget { motor: usize, target: i32 },
    Calibrate { motor: usize },
    FullForward { motor: usize },
    FullBackward { motor: usize },
    SetAllTargets { target: i32 },
    AllFullForward,
    AllFullBackward,
    SetServo { on: bool },
    EmergencyStop,
    CheckUpdates,
    UpdateFirmware { url: String },
    UpdateFilesystem { url: String },
    Restart,
    ResetWifi,
    FormatFilesystem,
    CalibrateAll,
}

impl Action {
    /// Gated actions wait for an explicit confirm. Emergency stop is never gated.
    pub fn is_gated(&self) -> bool {
        matches!(
            self,
            Action::UpdateFirmware { .. }
                | Action::UpdateFilesystem { .. }
                | Action::Restart
                | Action::ResetWifi
                | Action::FormatFilesystem
                | Action::CalibrateAll
        )
    }

    pub fn command(&self) -> Option<Command> {
        let command = match self {
            Action::Refresh => Command::refresh(),
            Action::SetTarget { motor, target } => Command::SetTarget { motor: *motor, target: *target },
            Action::Calibrate { motor } => Command::Calibrate { motor: *motor },
            Action::FullForward { motor } => Command::FullForward { motor: *motor },
            Action::FullBackward { motor } => Command::FullBackward { motor: *motor },
            Action::SetAllTargets { target } => Command::SetAllTargets { target: *target },
            Action::AllFullForward => Command::AllFullForward {},
            Action::AllFullBackward => Command::AllFullBackward {},
            Action::SetServo { on } => Command::SetServo { state: *on },
            Action::EmergencyStop => Command::EmergencyStop {},
            Action::CheckUpdates => Command::CheckUpdates {},
            Action::UpdateFirmware { url } => Command::UpdateFirmware { url: url.clone() },
            Action::UpdateFilesystem { url } => Command::UpdateLittlefs { url: url.clone() },
            Action::CalibrateAll => Command::CalibrateAll {},
            // No wire command exists for these yet; confirming only shows the notice.
            Action::Restart | Action::ResetWifi | Action::FormatFilesystem => return None,
        };
        Some(command)
    }

    /// Dialog title and body for gated actions.
    pub fn confirmation_text(&self) -> Option<(&'static str, &'static str)> {
        let text = match self {
            Action::UpdateFirmware { .. } => (
                "Update Firmware",
                "Are you sure you want to update the firmware? The device will restart after update. Do not power off during update!",
            ),
            Action::UpdateFilesystem { .. } => (
                "Update Filesystem",
                "Are you sure you want to update the filesystem? This will replace all web files. The device will not restart.",
            ),
            Action::Restart => (
                "Restart Device",
                "Are you sure you want to restart the device? All current operations will be interrupted.",
            ),
            Action::ResetWifi => (
                "Reset WiFi Settings",
                "This will reset all WiFi settings and restart in configuration mode.",
            ),
            Action::FormatFilesystem => (
                "Format Filesystem",
                "WARNING: This will erase all files from the filesystem! This action cannot be undone.",
            ),
            Action::CalibrateAll => (
                "Calibrate All Motors",
                "This will start calibration for all motors.",
            ),
            _ => return None,
        };
        Some(text)
    }

    /// Feedback shown once the action has gone out.
    pub fn dispatch_notice(&self) -> Option<(&'static str, Severity)> {
        let notice = match self {
            Action::EmergencyStop => ("Emergency stop activated!", Severity::Warning),
            Action::CheckUpdates => ("Checking for updates...", Severity::Info),
            Action::UpdateFirmware { .. } => ("Starting firmware update...", Severity::Success),
            Action::UpdateFilesystem { .. } => ("Starting filesystem update...", Severity::Success),
            Action::Restart => ("Restarting device...", Severity::Success),
            Action::ResetWifi => ("WiFi settings reset. Reconnecting...", Severity::Warning),
            Action::FormatFilesystem => ("Formatting filesystem...", Severity::Warning),
            Action::CalibrateAll => ("Starting calibration of all motors...", Severity::Success),
            _ => return None,
        };
        Some(notice)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub title: String,
    pub message: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Dispatch(Action),
    Pending(PendingConfirmation),
}

impl GateDecision {
    pub fn into_result(self) -> Result<Action, LinkError> {
        match self {
            GateDecision::Dispatch(action) => Ok(action),
            GateDecision::Pending(_) => Err(LinkError::ConfirmationRequired),
        }
    }
}

/// Holds at most one pending confirmation. A newer gated request replaces an
/// older unconfirmed one.
#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    pending: Option<PendingConfirmation>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, action: Action) -> GateDecision {
        let Some((title, message)) = action.confirmation_text().filter(|_| action.is_gated()) else {
            return GateDecision::Dispatch(action);
        };

        let pending = PendingConfirmation {
            title: title.to_string(),
            message: message.to_string(),
            action,
        };
        if let Some(previous) = self.pending.replace(pending.clone()) {
            tracing::debug!("confirmation for {:?} replaced by {:?}", previous.action, pending.action);
        }
        GateDecision::Pending(pending)
    }

    /// Take the pending action for dispatch. Yields it at most once.
    pub fn confirm(&mut self) -> Option<Action> {
        self.pending.take().map(|p| p.action)
    }

    /// Drop the pending action. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Closing the dialog any other way (close button, backdrop click) is a cancel.
    pub fn dismiss(&mut self) -> bool {
        self.cancel()
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }
}
