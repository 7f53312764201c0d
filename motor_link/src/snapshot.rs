//! Inbound state snapshots.
//!
//! The controller broadcasts a JSON object whenever something changes. Every
//! key is optional and a missing key means "unchanged". The encoder on the
//! device is not strict, so values are coerced leniently and a value that
//! cannot be coerced is dropped as if the key were missing.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::state::{GlobalStatus, UpdateInfo, UpdateKind};
use crate::DecodeError;

/// One motor's slice of a snapshot. Each field is independently optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MotorSnapshot {
    pub position: Option<i32>,
    pub target: Option<i32>,
    pub running: Option<bool>,
    pub calibrating: Option<bool>,
    pub full_forward: Option<bool>,
    pub full_backward: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceSnapshot {
    pub ip: Option<String>,
    pub global_status: Option<GlobalStatus>,
    pub servo_state: Option<bool>,
    pub update_in_progress: Option<bool>,
    pub update_progress: Option<u8>,
    pub update_status: Option<String>,
    pub update_kind: Option<UpdateKind>,
    pub latest_version: Option<String>,
    pub update_info: Option<UpdateInfo>,
    /// Keyed by motor index; only motors actually present in the payload.
    pub motors: BTreeMap<usize, MotorSnapshot>,
}

impl DeviceSnapshot {
    /// True when the payload carried nothing we recognise.
    pub fn is_empty(&self) -> bool {
        *self == DeviceSnapshot::default()
    }

    /// Decode raw message text. `motor_count` bounds which `motorN` keys are read.
    pub fn parse(text: &str, motor_count: usize) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Json(e.to_string()))?;
        Self::from_value(&value, motor_count)
    }

    pub fn from_value(value: &Value, motor_count: usize) -> Result<Self, DecodeError> {
        let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

        let mut snapshot = DeviceSnapshot {
            ip: non_empty_string(obj.get("ip")),
            global_status: non_empty_string(obj.get("globalStatus"))
                .map(|s| GlobalStatus::from_text(&s)),
            servo_state: obj.get("servoState").and_then(coerce_bool),
            update_in_progress: obj.get("updateInProgress").and_then(coerce_bool),
            update_progress: obj
                .get("updateProgress")
                .and_then(coerce_int)
                .map(|p| p.clamp(0, 100) as u8),
            update_status: obj.get("updateStatus").and_then(coerce_string),
            update_kind: obj
                .get("updateType")
                .and_then(coerce_string)
                .map(|s| UpdateKind::from_wire(&s)),
            latest_version: non_empty_string(obj.get("latestVersion"))
                .or_else(|| non_empty_string(obj.get("latest_version"))),
            update_info: None,
            motors: BTreeMap::new(),
        };

        if obj.get("type").and_then(Value::as_str) == Some("update_info") {
            snapshot.update_info = obj.get("data").and_then(Value::as_object).map(parse_update_info);
        }

        for index in 0..motor_count {
            let key = format!("motor{}", index);
            match obj.get(&key) {
                Some(Value::Object(motor)) => {
                    snapshot.motors.insert(index, parse_motor(motor));
                }
                Some(other) => {
                    tracing::debug!("ignoring {}: expected object, got {}", key, other);
                }
                None => {}
            }
        }

        Ok(snapshot)
    }
}

fn parse_motor(motor: &Map<String, Value>) -> MotorSnapshot {
    MotorSnapshot {
        position: motor.get("position").and_then(coerce_i32),
        target: motor.get("target").and_then(coerce_i32),
        running: motor.get("running").and_then(coerce_bool),
        calibrating: motor.get("calibrating").and_then(coerce_bool),
        full_forward: motor.get("fullForward").and_then(coerce_bool),
        full_backward: motor.get("fullBackward").and_then(coerce_bool),
    }
}

fn parse_update_info(data: &Map<String, Value>) -> UpdateInfo {
    UpdateInfo {
        latest_version: non_empty_string(data.get("latest_version")),
        firmware_url: non_empty_string(data.get("firmware_url")),
        littlefs_url: non_empty_string(data.get("littlefs_url")),
    }
}

/// Integers, finite floats (rounded) and numeric strings.
pub(crate) fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        }
        _ => None,
    }
}

fn coerce_i32(value: &Value) -> Option<i32> {
    coerce_int(value).and_then(|n| i32::try_from(n).ok())
}

/// `true`/`false`, `1`/`0`, and the usual string spellings.
pub(crate) fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Some(true),
            "false" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value.and_then(coerce_string).filter(|s| !s.is_empty())
}
