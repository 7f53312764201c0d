//! The engine: one owner for session, UI state, edit guard, gate and notifier,
//! driven by a single event/effect dispatch table.
//!
//! Hosts feed [`PanelEvent`]s in with the current time and carry out the
//! returned [`Effect`]s. The engine itself never blocks, never sleeps and
//! never touches the network.

use std::time::Duration;

use crate::config::PanelConfig;
use crate::edit_guard::{ControlId, EditGuard};
use crate::gate::{Action, ActionGate, GateDecision, PendingConfirmation};
use crate::notifier::{Notification, Notifier, Severity};
use crate::reconcile;
use crate::session::{ConnectionState, Liveness, Session};
use crate::state::UiState;
use crate::LinkError;

/// Everything that can happen to the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    // Lifecycle
    Connect,

    // Transport
    TransportOpened,
    TransportMessage(String),
    TransportClosed { code: u16, reason: String },
    TransportError(String),

    // Timers
    ReconnectDue,
    LivenessTick,
    NotificationExpired(u64),

    // User input
    BeginEdit(ControlId),
    /// Slider moved while held; shown locally, not sent.
    PreviewTarget { motor: usize, target: i32 },
    /// Edit abandoned without committing.
    CancelEdit(ControlId),
    Action(Action),
    Confirm,
    Cancel,
}

/// Work the host must do on the engine's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenTransport { url: String },
    CloseTransport,
    Send(String),
    ScheduleReconnect { delay: Duration },
    CancelReconnect,
    ConnectionChanged(ConnectionState),
    /// `Panel::ui()` changed; re-render.
    StateChanged,
    ShowNotification(Notification),
    ScheduleDismiss { id: u64, after: Duration },
    HideNotification,
    ShowConfirmation(PendingConfirmation),
    HideConfirmation,
}

#[derive(Debug, Clone)]
pub struct Panel {
    config: PanelConfig,
    session: Session,
    ui: UiState,
    guard: EditGuard,
    gate: ActionGate,
    notifier: Notifier,
    /// Last committed or device-reported target per motor. A released
    /// slider falls back to this.
    settled_targets: Vec<i32>,
}

impl Panel {
    /// `url` is the device endpoint, see [`PanelConfig::endpoint`].
    pub fn new(config: PanelConfig, url: impl Into<String>, now: u64) -> Self {
        let session = Session::new(url, &config, now);
        let ui = UiState::new(config.motor_count);
        Self {
            settled_targets: ui.motors.iter().map(|m| m.target).collect(),
            ui,
            notifier: Notifier::new(config.notification_ttl()),
            guard: EditGuard::new(),
            gate: ActionGate::new(),
            session,
            config,
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn edit_guard(&self) -> &EditGuard {
        &self.guard
    }

    pub fn pending_confirmation(&self) -> Option<&PendingConfirmation> {
        self.gate.pending()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifier.current()
    }

    /// The dispatch table.
    pub fn handle(&mut self, event: PanelEvent, now: u64) -> Vec<Effect> {
        let mut out = Vec::new();

        match event {
            PanelEvent::Connect => {
                if let Err(e) = self.session.connect(&mut out) {
                    tracing::warn!("{}", e);
                }
            }
            PanelEvent::TransportOpened => match self.session.on_open(now, &mut out) {
                Ok(()) => self.notify("Connected to device", Severity::Success, now, &mut out),
                Err(e) => tracing::warn!("{}", e),
            },
            PanelEvent::TransportMessage(text) => self.on_message(&text, now, &mut out),
            PanelEvent::TransportClosed { code, reason } => {
                tracing::warn!("WebSocket closed: code={}, reason={}", code, reason);
                self.on_disconnect(now, &mut out);
            }
            PanelEvent::TransportError(message) => {
                tracing::error!("WebSocket error: {}", message);
                self.on_disconnect(now, &mut out);
            }
            PanelEvent::ReconnectDue => {
                if let Err(e) = self.session.on_reconnect_due(&mut out) {
                    tracing::warn!("{}", e);
                }
            }
            PanelEvent::LivenessTick => {
                if self.session.liveness_check(now, &mut out) == Liveness::ForcedReconnect {
                    self.notify("Device stopped responding, reconnecting", Severity::Warning, now, &mut out);
                }
            }
            PanelEvent::NotificationExpired(id) => {
                if self.notifier.expire(id) {
                    out.push(Effect::HideNotification);
                }
            }
            PanelEvent::BeginEdit(control) => self.guard.begin_edit(control),
            PanelEvent::PreviewTarget { motor, target } => {
                if self.guard.is_editing(ControlId::Motor(motor)) {
                    self.set_ui(reconcile::apply_local_target(&self.ui, motor, target), &mut out);
                }
            }
            PanelEvent::CancelEdit(control) => {
                self.guard.end_edit(control);
                if let ControlId::Motor(motor) = control {
                    self.restore_target(motor, &mut out);
                }
            }
            PanelEvent::Action(action) => {
                match self.submit(action, now, &mut out) {
                    Ok(()) | Err(LinkError::ConfirmationRequired) => {}
                    Err(e) => tracing::debug!("action not dispatched: {}", e),
                }
            }
            PanelEvent::Confirm => {
                if let Some(action) = self.gate.confirm() {
                    out.push(Effect::HideConfirmation);
                    if let Err(e) = self.dispatch(action, now, &mut out) {
                        tracing::debug!("confirmed action not dispatched: {}", e);
                    }
                }
            }
            PanelEvent::Cancel => {
                if self.gate.dismiss() {
                    out.push(Effect::HideConfirmation);
                }
            }
        }

        out
    }

    /// Run a user action through the gate. Gated actions come back as
    /// `Err(ConfirmationRequired)` with the dialog effect already pushed.
    pub fn submit(&mut self, action: Action, now: u64, out: &mut Vec<Effect>) -> Result<(), LinkError> {
        match self.gate.request(action) {
            GateDecision::Dispatch(action) => self.dispatch(action, now, out),
            GateDecision::Pending(pending) => {
                tracing::info!("Awaiting confirmation: {}", pending.title);
                out.push(Effect::ShowConfirmation(pending));
                Err(LinkError::ConfirmationRequired)
            }
        }
    }

    fn dispatch(&mut self, action: Action, now: u64, out: &mut Vec<Effect>) -> Result<(), LinkError> {
        // committing a slider ends its edit whether or not the send succeeds
        match action {
            Action::SetTarget { motor, .. } => self.guard.end_edit(ControlId::Motor(motor)),
            Action::SetAllTargets { .. } => self.guard.end_edit(ControlId::AllMotors),
            _ => {}
        }

        if let Some(command) = action.command() {
            if let Err(e) = self.session.send(&command, now, out) {
                match e {
                    LinkError::NotConnected => {
                        self.notify("No connection to device", Severity::Warning, now, out)
                    }
                    ref other => self.notify(other.to_string(), Severity::Error, now, out),
                }
                if let Action::SetTarget { motor, .. } = action {
                    self.restore_target(motor, out);
                }
                return Err(e);
            }
        }

        match action {
            Action::SetTarget { motor, target } => {
                self.settle_target(motor, target);
                self.set_ui(reconcile::apply_local_target(&self.ui, motor, target), out);
            }
            Action::SetAllTargets { target } => {
                let mut next = self.ui.clone();
                for motor in 0..next.motor_count() {
                    if !self.guard.is_editing(ControlId::Motor(motor)) {
                        self.settle_target(motor, target);
                        next = reconcile::apply_local_target(&next, motor, target);
                    }
                }
                self.set_ui(next, out);
            }
            _ => {}
        }

        if let Some((message, severity)) = action.dispatch_notice() {
            self.notify(message, severity, now, out);
        }
        Ok(())
    }

    fn on_message(&mut self, text: &str, now: u64, out: &mut Vec<Effect>) {
        let snapshot = match self.session.on_message(text, now) {
            Ok(snapshot) => snapshot,
            // already logged by the session
            Err(_) => return,
        };

        for (&motor, reported) in &snapshot.motors {
            if let Some(target) = reported.target {
                self.settle_target(motor, target);
            }
        }

        let next = reconcile::merge(&self.ui, &snapshot, &self.guard);
        self.set_ui(next, out);

        if let Some((message, severity)) = reconcile::update_notice(&snapshot) {
            self.notify(message, severity, now, out);
        }
    }

    fn on_disconnect(&mut self, now: u64, out: &mut Vec<Effect>) {
        if self.session.on_close(out) {
            self.notify("Disconnected from device", Severity::Warning, now, out);
        }
    }

    fn settle_target(&mut self, motor: usize, target: i32) {
        if let Some(settled) = self.settled_targets.get_mut(motor) {
            *settled = target;
        }
    }

    /// Drop an uncommitted slider value in favour of the settled target.
    fn restore_target(&mut self, motor: usize, out: &mut Vec<Effect>) {
        if let Some(&target) = self.settled_targets.get(motor) {
            self.set_ui(reconcile::apply_local_target(&self.ui, motor, target), out);
        }
    }

    fn set_ui(&mut self, next: UiState, out: &mut Vec<Effect>) {
        if next != self.ui {
            self.ui = next;
            out.push(Effect::StateChanged);
        }
    }

    fn notify(&mut self, message: impl Into<String>, severity: Severity, now: u64, out: &mut Vec<Effect>) {
        let notification = self.notifier.notify(message, severity, now);
        out.push(Effect::ScheduleDismiss {
            id: notification.id,
            after: self.notifier.ttl(),
        });
        out.push(Effect::ShowNotification(notification));
    }
}
