use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::LinkError;

/// How long to wait before reconnecting after the socket drops.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay every time.
    Fixed { delay_ms: u64 },
    /// Doubles after every failed attempt, capped at `max_ms`, back to
    /// `base_ms` once a connection opens.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed { delay_ms: 3000 }
    }
}

impl ReconnectPolicy {
    pub fn base(&self) -> Duration {
        match *self {
            ReconnectPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            ReconnectPolicy::Exponential { base_ms, .. } => Duration::from_millis(base_ms),
        }
    }

    /// Delay to use after `current` has been spent on a failed attempt.
    pub fn next(&self, current: Duration) -> Duration {
        match *self {
            ReconnectPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            ReconnectPolicy::Exponential { max_ms, .. } => {
                current.saturating_mul(2).min(Duration::from_millis(max_ms))
            }
        }
    }
}

/// Engine configuration. Defaults match the controller shipped with four motors.
///
/// ```rust
/// use motor_link::PanelConfig;
///
/// let config = PanelConfig { motor_count: 6, ..Default::default() };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.endpoint("https:", "panel.local"), "wss://panel.local/ws");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PanelConfig {
    pub motor_count: usize,
    /// Path of the WebSocket endpoint on the device.
    pub ws_path: String,
    pub reconnect: ReconnectPolicy,
    /// How often the liveness check runs.
    pub liveness_interval_ms: u64,
    /// Silence longer than this makes the liveness check send a refresh.
    pub stale_after_ms: u64,
    /// Silence longer than this forces the socket closed and a reconnect.
    /// Off by default: a half-open socket keeps being pinged.
    pub force_reconnect_after_ms: Option<u64>,
    pub notification_ttl_ms: u64,
    /// Slider bounds, millimetres.
    pub target_min: i32,
    pub target_max: i32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            motor_count: 4,
            ws_path: "/ws".to_string(),
            reconnect: ReconnectPolicy::default(),
            liveness_interval_ms: 5000,
            stale_after_ms: 15000,
            force_reconnect_after_ms: None,
            notification_ttl_ms: 3000,
            target_min: 0,
            target_max: 20,
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.motor_count == 0 {
            return Err(LinkError::Config("Motor count must be greater than 0.".to_string()));
        }
        if !self.ws_path.starts_with('/') {
            return Err(LinkError::Config("WebSocket path must start with '/'.".to_string()));
        }
        if self.reconnect.base().is_zero() {
            return Err(LinkError::Config("Reconnect delay must be greater than 0.".to_string()));
        }
        if let ReconnectPolicy::Exponential { base_ms, max_ms } = self.reconnect {
            if max_ms < base_ms {
                return Err(LinkError::Config("Reconnect cap is below the base delay.".to_string()));
            }
        }
        if self.liveness_interval_ms == 0 {
            return Err(LinkError::Config("Liveness interval must be greater than 0.".to_string()));
        }
        if let Some(force) = self.force_reconnect_after_ms {
            if force <= self.stale_after_ms {
                return Err(LinkError::Config(
                    "Forced reconnect must come after the stale threshold.".to_string(),
                ));
            }
        }
        if self.target_min > self.target_max {
            return Err(LinkError::Config("Target range is empty.".to_string()));
        }
        Ok(())
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    /// Device endpoint for a page served over `page_scheme` from `host`.
    pub fn endpoint(&self, page_scheme: &str, host: &str) -> String {
        websocket_url(page_scheme, host, &self.ws_path)
    }
}

/// `ws://` for plain pages, `wss://` for `https:` pages.
pub fn websocket_url(page_scheme: &str, host: &str, path: &str) -> String {
    let secure = page_scheme.trim_end_matches(':').eq_ignore_ascii_case("https");
    format!("{}://{}{}", if secure { "wss" } else { "ws" }, host, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_mirrors_page() {
        assert_eq!(websocket_url("http:", "192.168.4.1", "/ws"), "ws://192.168.4.1/ws");
        assert_eq!(websocket_url("https:", "panel.local:8443", "/ws"), "wss://panel.local:8443/ws");
        assert_eq!(websocket_url("https", "panel.local", "/ws"), "wss://panel.local/ws");
    }

    #[test]
    fn test_exponential_backoff_caps() {
        let policy = ReconnectPolicy::Exponential { base_ms: 1000, max_ms: 5000 };
        let mut delay = policy.base();
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(delay.as_millis());
            delay = policy.next(delay);
        }
        assert_eq!(seen, vec![1000, 2000, 4000, 5000, 5000]);
    }

    #[test]
    fn test_fixed_backoff_never_grows() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.next(policy.base()), Duration::from_millis(3000));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_motors = PanelConfig { motor_count: 0, ..Default::default() };
        assert!(matches!(zero_motors.validate(), Err(LinkError::Config(_))));

        let early_force = PanelConfig {
            force_reconnect_after_ms: Some(10_000),
            ..Default::default()
        };
        assert!(early_force.validate().is_err());

        assert!(PanelConfig::default().validate().is_ok());
    }
}
