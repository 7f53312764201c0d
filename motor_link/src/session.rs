//! Connection state machine.
//!
//! ```text
//!  Idle ──connect──▶ Connecting ──open──▶ Open
//!                      │  ▲                 │
//!                close/error│ reconnect   close/error
//!                      ▼  │                 │
//!                     Closed ◀──────────────┘
//! ```
//!
//! The session never touches a socket or a timer itself. Every method pushes
//! the side effects it needs onto `out` and the host carries them out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::config::{PanelConfig, ReconnectPolicy};
use crate::panel::Effect;
use crate::snapshot::DeviceSnapshot;
use crate::LinkError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Open => "Connected",
            ConnectionState::Closed => "Disconnected",
        }
    }
}

/// Outcome of one liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Not open, nothing to check.
    Inactive,
    Fresh,
    /// Stale: a refresh request went out as a ping.
    Pinged,
    /// Silent past the forced-reconnect bound: the socket was dropped.
    ForcedReconnect,
}

#[derive(Debug, Clone)]
pub struct Session {
    url: String,
    motor_count: usize,
    state: ConnectionState,
    last_message_at: u64,
    policy: ReconnectPolicy,
    reconnect_delay: Duration,
    reconnect_scheduled: bool,
    stale_after_ms: u64,
    force_reconnect_after_ms: Option<u64>,
    decode_failures: u64,
}

impl Session {
    pub fn new(url: impl Into<String>, config: &PanelConfig, now: u64) -> Self {
        Self {
            url: url.into(),
            motor_count: config.motor_count,
            state: ConnectionState::Idle,
            last_message_at: now,
            policy: config.reconnect,
            reconnect_delay: config.reconnect.base(),
            reconnect_scheduled: false,
            stale_after_ms: config.stale_after_ms,
            force_reconnect_after_ms: config.force_reconnect_after_ms,
            decode_failures: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn last_message_at(&self) -> u64 {
        self.last_message_at
    }

    /// Delay the next scheduled reconnect will use.
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn reconnect_scheduled(&self) -> bool {
        self.reconnect_scheduled
    }

    /// Inbound messages dropped because they could not be decoded.
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    fn transition(&mut self, next: ConnectionState, out: &mut Vec<Effect>) {
        tracing::debug!("session {:?} -> {:?}", self.state, next);
        self.state = next;
        out.push(Effect::ConnectionChanged(next));
    }

    /// Open a transport. Valid from `Idle` or `Closed` only.
    pub fn connect(&mut self, out: &mut Vec<Effect>) -> Result<(), LinkError> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Closed => {}
            from => {
                return Err(LinkError::InvalidTransition {
                    from,
                    action: "connect",
                })
            }
        }

        if self.reconnect_scheduled {
            self.reconnect_scheduled = false;
            out.push(Effect::CancelReconnect);
        }

        tracing::info!("Connecting to {}", self.url);
        self.transition(ConnectionState::Connecting, out);
        out.push(Effect::OpenTransport { url: self.url.clone() });
        Ok(())
    }

    /// The transport reported open. Resets the backoff and asks for a snapshot.
    pub fn on_open(&mut self, now: u64, out: &mut Vec<Effect>) -> Result<(), LinkError> {
        if self.state != ConnectionState::Connecting {
            return Err(LinkError::InvalidTransition {
                from: self.state,
                action: "open",
            });
        }

        tracing::info!("WebSocket connected to {}", self.url);
        self.transition(ConnectionState::Open, out);
        self.reconnect_delay = self.policy.base();
        // silence is measured from the moment the link came up
        self.last_message_at = now;
        self.send(&Command::refresh(), now, out)
    }

    /// The transport closed or errored. Returns true when this moved the
    /// session to `Closed`; a second close for the same drop changes nothing.
    pub fn on_close(&mut self, out: &mut Vec<Effect>) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.transition(ConnectionState::Closed, out);
                self.schedule_reconnect(out);
                true
            }
            ConnectionState::Idle | ConnectionState::Closed => false,
        }
    }

    fn schedule_reconnect(&mut self, out: &mut Vec<Effect>) {
        if self.reconnect_scheduled {
            return;
        }
        let delay = self.reconnect_delay;
        self.reconnect_delay = self.policy.next(delay);
        self.reconnect_scheduled = true;
        tracing::info!("Reconnecting in {} ms", delay.as_millis());
        out.push(Effect::ScheduleReconnect { delay });
    }

    /// The reconnect timer fired.
    pub fn on_reconnect_due(&mut self, out: &mut Vec<Effect>) -> Result<(), LinkError> {
        if !self.reconnect_scheduled {
            tracing::debug!("ignoring reconnect timer that was already cancelled");
            return Ok(());
        }
        self.reconnect_scheduled = false;
        self.connect(out)
    }

    /// Decode one inbound message. Failures are logged and counted; they never
    /// tear the session down.
    pub fn on_message(&mut self, raw: &str, now: u64) -> Result<DeviceSnapshot, LinkError> {
        match DeviceSnapshot::parse(raw, self.motor_count) {
            Ok(snapshot) => {
                self.last_message_at = now;
                Ok(snapshot)
            }
            Err(e) => {
                self.decode_failures += 1;
                tracing::warn!("Dropping undecodable message ({}): {}", e, raw);
                Err(LinkError::Decode(e))
            }
        }
    }

    /// Encode and queue `command` for the transport. Only valid while open;
    /// otherwise the command is dropped.
    pub fn send(&mut self, command: &Command, now: u64, out: &mut Vec<Effect>) -> Result<(), LinkError> {
        if self.state != ConnectionState::Open {
            tracing::warn!("Dropping {}: session is {:?}", command.name(), self.state);
            return Err(LinkError::NotConnected);
        }

        let text = command.clone().issue(now).encode()?;
        if !command.is_polling() {
            tracing::debug!("Sent command: {}", text);
        }
        out.push(Effect::Send(text));
        Ok(())
    }

    /// Periodic staleness test.
    pub fn liveness_check(&mut self, now: u64, out: &mut Vec<Effect>) -> Liveness {
        if self.state != ConnectionState::Open {
            return Liveness::Inactive;
        }

        let silent_for = now.saturating_sub(self.last_message_at);

        if let Some(limit) = self.force_reconnect_after_ms {
            if silent_for > limit {
                tracing::warn!("No updates for {} ms, dropping connection", silent_for);
                out.push(Effect::CloseTransport);
                self.transition(ConnectionState::Closed, out);
                self.schedule_reconnect(out);
                return Liveness::ForcedReconnect;
            }
        }

        if silent_for > self.stale_after_ms {
            tracing::info!("No updates for {} ms, sending ping", silent_for);
            return match self.send(&Command::refresh(), now, out) {
                Ok(()) => Liveness::Pinged,
                Err(e) => {
                    tracing::error!("Liveness ping failed: {}", e);
                    Liveness::Fresh
                }
            };
        }

        Liveness::Fresh
    }
}
