//! Merging device snapshots into the UI state.
//!
//! Everything here is a pure function of its inputs so the merge rules can be
//! tested without a socket.

use crate::edit_guard::{ControlId, EditGuard};
use crate::notifier::Severity;
use crate::snapshot::DeviceSnapshot;
use crate::state::{UiState, UpdateKind};

/// Fold `snapshot` into `ui`.
///
/// Present fields overwrite, absent fields are left alone. A motor's target is
/// the one exception: while the user holds an edit on that motor the local
/// value wins.
pub fn merge(ui: &UiState, snapshot: &DeviceSnapshot, guard: &EditGuard) -> UiState {
    let mut next = ui.clone();

    if let Some(ref ip) = snapshot.ip {
        next.ip = ip.clone();
    }
    if let Some(ref status) = snapshot.global_status {
        next.global_status = status.clone();
    }
    if let Some(servo) = snapshot.servo_state {
        next.servo_on = servo;
    }

    if let Some(in_progress) = snapshot.update_in_progress {
        next.update.in_progress = in_progress;
    }
    if let Some(progress) = snapshot.update_progress {
        next.update.progress_percent = progress;
    }
    if let Some(ref status) = snapshot.update_status {
        next.update.status_text = status.clone();
    }
    if let Some(kind) = snapshot.update_kind {
        next.update.kind = kind;
    }
    if let Some(ref version) = snapshot.latest_version {
        next.latest_version = Some(version.clone());
    }
    if let Some(ref info) = snapshot.update_info {
        if let Some(ref version) = info.latest_version {
            next.latest_version = Some(version.clone());
        }
        next.available_update = Some(info.clone());
    }

    for (&index, reported) in &snapshot.motors {
        let Some(motor) = next.motors.get_mut(index) else {
            tracing::debug!("snapshot reports motor{} but only {} are configured", index, ui.motor_count());
            continue;
        };

        if let Some(position) = reported.position {
            motor.position = position;
        }
        if let Some(running) = reported.running {
            motor.running = running;
        }
        if let Some(calibrating) = reported.calibrating {
            motor.calibrating = calibrating;
        }
        if let Some(full_forward) = reported.full_forward {
            motor.full_forward = full_forward;
        }
        if let Some(full_backward) = reported.full_backward {
            motor.full_backward = full_backward;
        }
        if let Some(target) = reported.target {
            if !guard.is_editing(ControlId::Motor(index)) {
                motor.target = target;
            }
        }
    }

    // Aggregates only consider motors this snapshot reported. A snapshot with
    // no motors at all (an update_info reply, say) leaves them as they were.
    if !snapshot.motors.is_empty() {
        next.all_motors_forward = snapshot
            .motors
            .values()
            .all(|m| m.full_forward == Some(true));
        next.all_motors_backward = snapshot
            .motors
            .values()
            .all(|m| m.full_backward == Some(true));
    }

    next
}

/// Write a user-chosen target into the state: a draft while dragging, or the
/// committed value on "set".
pub fn apply_local_target(ui: &UiState, motor: usize, target: i32) -> UiState {
    let mut next = ui.clone();
    match next.motors.get_mut(motor) {
        Some(m) => m.target = target,
        None => tracing::warn!("local target for unknown motor{}", motor),
    }
    next
}

/// User-facing message implied by an update-related snapshot, if any.
pub fn update_notice(snapshot: &DeviceSnapshot) -> Option<(String, Severity)> {
    if let Some(ref info) = snapshot.update_info {
        return Some(if info.has_any_update() {
            ("Update check complete".to_string(), Severity::Success)
        } else {
            ("No updates available".to_string(), Severity::Warning)
        });
    }

    if snapshot.update_in_progress != Some(false) {
        return None;
    }
    let status = snapshot.update_status.as_deref()?;

    if snapshot.update_progress == Some(100) {
        let message = match snapshot.update_kind {
            Some(UpdateKind::Firmware) => "Firmware update complete! Device will restart.",
            _ => "Filesystem update complete!",
        };
        return Some((message.to_string(), Severity::Success));
    }

    let lowered = status.to_ascii_lowercase();
    if lowered.contains("error") || lowered.contains("failed") {
        return Some((format!("Update failed: {}", status), Severity::Error));
    }
    None
}
