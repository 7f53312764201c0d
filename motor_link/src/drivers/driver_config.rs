use serde::{Deserialize, Serialize};

use crate::{LinkError, PanelConfig};

/// ```rust
/// use motor_link::drivers::PanelDriverConfig;
///
/// let config = PanelDriverConfig::new("ws://192.168.4.1/ws".to_string());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PanelDriverConfig {
    /// Full device endpoint, e.g. `ws://192.168.4.1/ws`.
    pub url: String,
    pub panel: PanelConfig,
    /// Capacity of the event queue feeding the engine task.
    pub max_events: usize,
}

impl PanelDriverConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }

    /// Defaults overridden by `MOTOR_PANEL_URL`, `MOTOR_PANEL_MOTORS` and
    /// `MOTOR_PANEL_RECONNECT_MS` when set and parseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("MOTOR_PANEL_URL") {
            config.url = url;
        }
        if let Some(count) = std::env::var("MOTOR_PANEL_MOTORS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.panel.motor_count = count;
        }
        if let Some(delay_ms) = std::env::var("MOTOR_PANEL_RECONNECT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.panel.reconnect = crate::ReconnectPolicy::Fixed { delay_ms };
        }
        config
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(LinkError::Config(format!("'{}' is not a ws:// or wss:// URL.", self.url)));
        }
        if self.max_events == 0 {
            return Err(LinkError::Config("Event queue capacity must be greater than 0.".to_string()));
        }
        self.panel.validate()
    }
}

impl Default for PanelDriverConfig {
    fn default() -> Self {
        let panel = PanelConfig::default();
        Self {
            url: panel.endpoint("http:", "127.0.0.1:8080"),
            panel,
            max_events: 100,
        }
    }
}
