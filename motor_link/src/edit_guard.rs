use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An adjustable control the user can hold an uncommitted edit on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    /// The per-motor target slider.
    Motor(usize),
    /// The group slider. The device never reports a group target, so no
    /// snapshot ever touches it.
    AllMotors,
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlId::Motor(i) => write!(f, "motor{}", i),
            ControlId::AllMotors => f.write_str("all-motors"),
        }
    }
}

/// Tracks which controls the user is currently dragging or editing.
///
/// Written by the input layer, read by the reconciler on every merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditGuard {
    editing: HashSet<ControlId>,
}

impl EditGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_edit(&mut self, control: ControlId) {
        if self.editing.insert(control) {
            tracing::trace!("edit started on {}", control);
        }
    }

    /// Covers both commit and cancel; the guard does not care which.
    pub fn end_edit(&mut self, control: ControlId) {
        if self.editing.remove(&control) {
            tracing::trace!("edit ended on {}", control);
        }
    }

    pub fn is_editing(&self, control: ControlId) -> bool {
        self.editing.contains(&control)
    }

    pub fn any_editing(&self) -> bool {
        !self.editing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_are_per_control() {
        let mut guard = EditGuard::new();
        guard.begin_edit(ControlId::Motor(2));

        assert!(guard.is_editing(ControlId::Motor(2)));
        assert!(!guard.is_editing(ControlId::Motor(0)));
        assert!(!guard.is_editing(ControlId::AllMotors));

        guard.end_edit(ControlId::Motor(2));
        assert!(!guard.is_editing(ControlId::Motor(2)));
        assert!(!guard.any_editing());
    }

    #[test]
    fn test_end_without_begin_is_harmless() {
        let mut guard = EditGuard::new();
        guard.end_edit(ControlId::Motor(1));
        assert!(!guard.any_editing());
    }

    #[test]
    fn test_begin_twice_then_end_once_clears() {
        let mut guard = EditGuard::new();
        guard.begin_edit(ControlId::AllMotors);
        guard.begin_edit(ControlId::AllMotors);
        guard.end_edit(ControlId::AllMotors);
        assert!(!guard.is_editing(ControlId::AllMotors));
    }
}
