use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::{MonitorError, Result};

/// Raw configuration file shape (`config/config.yaml`), before validation
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,
    #[serde(default = "default_check_interval_minutes")]
    pub check_interval_minutes: u64,
    #[serde(default = "default_market_open_time")]
    pub market_open_time: String,
    #[serde(default = "default_market_close_time")]
    pub market_close_time: String,
    #[serde(default = "default_alert_cooldown_minutes")]
    pub alert_cooldown_minutes: u64,
    #[serde(default = "default_api_timeout_seconds")]
    pub api_timeout_seconds: u64,
    #[serde(default = "default_api_retry_attempts")]
    pub api_retry_attempts: u32,
    /// Per-symbol threshold overrides, applied when no explicit threshold
    /// is given at add time
    #[serde(default)]
    pub stock_thresholds: HashMap<String, f64>,
}

fn default_threshold_percent() -> f64 {
    5.0
}
fn default_check_interval_minutes() -> u64 {
    5
}
fn default_market_open_time() -> String {
    "09:15".to_string()
}
fn default_market_close_time() -> String {
    "15:30".to_string()
}
fn default_alert_cooldown_minutes() -> u64 {
    30
}
fn default_api_timeout_seconds() -> u64 {
    5
}
fn default_api_retry_attempts() -> u32 {
    3
}

impl Settings {
    /// Load from the given file (extension optional, missing file allowed)
    /// plus `STOCKWATCH_*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("STOCKWATCH").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

/// Validated process-wide settings, built once at startup and owned by the
/// engine for the session's lifetime
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub default_threshold_percent: f64,
    pub check_interval: Duration,
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
    pub alert_cooldown: Duration,
    pub api_timeout: Duration,
    pub api_retry_attempts: u32,
    pub stock_thresholds: HashMap<String, f64>,
}

impl MonitorConfig {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        if settings.threshold_percent <= 0.0 {
            return Err(MonitorError::Validation(format!(
                "threshold_percent must be positive, got {}",
                settings.threshold_percent
            )));
        }
        if settings.check_interval_minutes == 0 {
            return Err(MonitorError::Validation(
                "check_interval_minutes must be at least 1".to_string(),
            ));
        }
        for (symbol, threshold) in &settings.stock_thresholds {
            if *threshold <= 0.0 {
                return Err(MonitorError::Validation(format!(
                    "stock_thresholds entry for {} must be positive, got {}",
                    symbol, threshold
                )));
            }
        }

        Ok(Self {
            default_threshold_percent: settings.threshold_percent,
            check_interval: Duration::from_secs(settings.check_interval_minutes * 60),
            market_open: parse_wall_clock(&settings.market_open_time)?,
            market_close: parse_wall_clock(&settings.market_close_time)?,
            alert_cooldown: Duration::from_secs(settings.alert_cooldown_minutes * 60),
            api_timeout: Duration::from_secs(settings.api_timeout_seconds),
            api_retry_attempts: settings.api_retry_attempts,
            stock_thresholds: settings.stock_thresholds,
        })
    }
}

/// "HH:MM", 24-hour
fn parse_wall_clock(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| {
        MonitorError::ClockConfig(format!("bad wall-clock time '{}': {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings {
            threshold_percent: 5.0,
            check_interval_minutes: 5,
            market_open_time: "09:15".to_string(),
            market_close_time: "15:30".to_string(),
            alert_cooldown_minutes: 30,
            api_timeout_seconds: 5,
            api_retry_attempts: 3,
            stock_thresholds: HashMap::new(),
        }
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let settings = Settings::load("does-not-exist/config").unwrap();

        assert_eq!(settings.threshold_percent, 5.0);
        assert_eq!(settings.check_interval_minutes, 5);
        assert_eq!(settings.market_open_time, "09:15");
        assert_eq!(settings.market_close_time, "15:30");
        assert_eq!(settings.alert_cooldown_minutes, 30);
        assert!(settings.stock_thresholds.is_empty());
    }

    #[test]
    fn test_valid_settings_convert() {
        let config = MonitorConfig::from_settings(base_settings()).unwrap();

        assert_eq!(config.check_interval, Duration::from_secs(300));
        assert_eq!(config.alert_cooldown, Duration::from_secs(1800));
        assert_eq!(config.market_open, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert_eq!(config.market_close, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let mut settings = base_settings();
        settings.threshold_percent = 0.0;

        let result = MonitorConfig::from_settings(settings);
        assert!(matches!(result, Err(MonitorError::Validation(_))));
    }

    #[test]
    fn test_rejects_zero_check_interval() {
        let mut settings = base_settings();
        settings.check_interval_minutes = 0;

        let result = MonitorConfig::from_settings(settings);
        assert!(matches!(result, Err(MonitorError::Validation(_))));
    }

    #[test]
    fn test_rejects_non_positive_override() {
        let mut settings = base_settings();
        settings
            .stock_thresholds
            .insert("TCS.NS".to_string(), -1.0);

        let result = MonitorConfig::from_settings(settings);
        assert!(matches!(result, Err(MonitorError::Validation(_))));
    }

    #[test]
    fn test_rejects_malformed_wall_clock() {
        let mut settings = base_settings();
        settings.market_open_time = "9am".to_string();

        let result = MonitorConfig::from_settings(settings);
        assert!(matches!(result, Err(MonitorError::ClockConfig(_))));
    }
}
