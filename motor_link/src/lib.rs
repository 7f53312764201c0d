//! Session and state-reconciliation engine for the motor controller panel.
//!
//! The controller (an ESP32 driving four motors, a servo and OTA update
//! machinery) talks JSON over a single WebSocket at `/ws`:
//!
//! - outbound: `{"type", "data", "timestamp"}` command envelopes ([`commands`])
//! - inbound: partial state snapshots ([`snapshot`])
//!
//! [`Panel`] ties the pieces together behind one event/effect dispatch table
//! so the same engine runs in the browser (`web_app`) and natively
//! ([`drivers::PanelDriver`], feature `driver`).
//!
//! # Usage
//!
//! ```rust
//! use motor_link::{Effect, Panel, PanelConfig, PanelEvent};
//!
//! let config = PanelConfig::default();
//! let url = config.endpoint("http:", "192.168.4.1");
//! let mut panel = Panel::new(config, url, 0);
//!
//! let effects = panel.handle(PanelEvent::Connect, 0);
//! assert!(effects.contains(&Effect::OpenTransport { url: "ws://192.168.4.1/ws".to_string() }));
//! ```

pub mod commands;
pub mod config;
pub mod edit_guard;
pub mod errors;
pub mod gate;
pub mod notifier;
pub mod panel;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod state;

pub mod drivers;

pub use commands::{Command, CommandEnvelope};
pub use config::{websocket_url, PanelConfig, ReconnectPolicy};
pub use edit_guard::{ControlId, EditGuard};
pub use errors::*;
pub use gate::{Action, ActionGate, GateDecision, PendingConfirmation};
pub use notifier::{Notification, Notifier, Severity};
pub use panel::{Effect, Panel, PanelEvent};
pub use session::{ConnectionState, Liveness, Session};
pub use snapshot::{DeviceSnapshot, MotorSnapshot};
pub use state::{GlobalStatus, MotorActivity, MotorState, UiState, UpdateInfo, UpdateKind, UpdateState};
