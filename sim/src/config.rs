use std::time::Duration;

/// Simulator settings, read from the environment with defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub port: u16,
    pub motor_count: usize,
    /// Time the simulated motors take per millimetre.
    pub step: Duration,
    /// Address reported in the `ip` field.
    pub reported_ip: String,
    pub latest_version: String,
    pub firmware_url: Option<String>,
    pub littlefs_url: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            motor_count: 4,
            step: Duration::from_millis(250),
            reported_ip: "127.0.0.1".to_string(),
            latest_version: "1.0.0".to_string(),
            firmware_url: None,
            littlefs_url: None,
        }
    }
}

impl SimConfig {
    /// `SIM_PORT`, `SIM_MOTORS`, `SIM_STEP_MS`, `SIM_IP`, `SIM_LATEST_VERSION`,
    /// `SIM_FIRMWARE_URL`, `SIM_LITTLEFS_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok());
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Self {
            port: parsed("SIM_PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(defaults.port),
            motor_count: parsed("SIM_MOTORS")
                .map(|n| n as usize)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.motor_count),
            step: parsed("SIM_STEP_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.step),
            reported_ip: non_empty("SIM_IP").unwrap_or(defaults.reported_ip),
            latest_version: non_empty("SIM_LATEST_VERSION").unwrap_or(defaults.latest_version),
            firmware_url: non_empty("SIM_FIRMWARE_URL"),
            littlefs_url: non_empty("SIM_LITTLEFS_URL"),
        }
    }
}
