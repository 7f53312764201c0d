//! The render-facing state of the panel.
//!
//! `UiState` is always fully populated: before the first snapshot arrives it
//! holds defaults. Only the reconciler produces new values of it.

use std::fmt;
use serde::{Deserialize, Serialize};

/// Controller-wide status line. The firmware reports free text
/// ("RUNNING", "STOPPED", ...); the two well-known values get their own variants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub enum GlobalStatus {
    #[default]
    Idle,
    Running,
    Other(String),
}

impl GlobalStatus {
    pub fn from_text(text: &str) -> Self {
        if text.eq_ignore_ascii_case("running") {
            GlobalStatus::Running
        } else if text.eq_ignore_ascii_case("idle") {
            GlobalStatus::Idle
        } else {
            GlobalStatus::Other(text.to_string())
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            GlobalStatus::Idle => "IDLE",
            GlobalStatus::Running => "RUNNING",
            GlobalStatus::Other(text) => text,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, GlobalStatus::Running)
    }
}

impl fmt::Display for GlobalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

/// Which image an over-the-air update is writing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateKind {
    #[default]
    Firmware,
    Filesystem,
}

impl UpdateKind {
    /// The device sends `"firmware"` for firmware images and anything else
    /// (in practice `"littlefs"`) for the filesystem image.
    pub fn from_wire(text: &str) -> Self {
        if text.eq_ignore_ascii_case("firmware") {
            UpdateKind::Firmware
        } else {
            UpdateKind::Filesystem
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateState {
    pub in_progress: bool,
    /// 0..=100
    pub progress_percent: u8,
    pub status_text: String,
    pub kind: UpdateKind,
}

/// Result of an update check (`"type": "update_info"`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateInfo {
    pub latest_version: Option<String>,
    pub firmware_url: Option<String>,
    pub littlefs_url: Option<String>,
}

impl UpdateInfo {
    pub fn has_any_update(&self) -> bool {
        self.firmware_url.is_some() || self.littlefs_url.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorState {
    /// Measured position, millimetres.
    pub position: i32,
    /// Target position, millimetres.
    pub target: i32,
    pub running: bool,
    pub calibrating: bool,
    pub full_forward: bool,
    pub full_backward: bool,
}

/// What a motor is doing, for the status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorActivity {
    Idle,
    Calibrating,
    Forward,
    Backward,
    Moving,
}

impl MotorActivity {
    pub fn label(&self) -> &'static str {
        match self {
            MotorActivity::Idle => "IDLE",
            MotorActivity::Calibrating => "CALIBRATING",
            MotorActivity::Forward => "FORWARD",
            MotorActivity::Backward => "BACKWARD",
            MotorActivity::Moving => "MOVING",
        }
    }
}

impl MotorState {
    pub fn activity(&self) -> MotorActivity {
        if !self.running {
            MotorActivity::Idle
        } else if self.calibrating {
            MotorActivity::Calibrating
        } else if self.full_forward {
            MotorActivity::Forward
        } else if self.full_backward {
            MotorActivity::Backward
        } else {
            MotorActivity::Moving
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct UiState {
    pub ip: String,
    pub global_status: GlobalStatus,
    pub servo_on: bool,
    pub update: UpdateState,
    pub latest_version: Option<String>,
    pub available_update: Option<UpdateInfo>,
    pub motors: Vec<MotorState>,
    /// Every motor in the last motor-bearing snapshot reported full forward.
    pub all_motors_forward: bool,
    /// Every motor in the last motor-bearing snapshot reported full backward.
    pub all_motors_backward: bool,
}

impl UiState {
    pub fn new(motor_count: usize) -> Self {
        Self {
            motors: vec![MotorState::default(); motor_count],
            ..Default::default()
        }
    }

    pub fn motor(&self, index: usize) -> Option<&MotorState> {
        self.motors.get(index)
    }

    pub fn motor_count(&self) -> usize {
        self.motors.len()
    }
}
