//! Engine configuration.
//!
//! Thresholds and intervals are deliberately configuration, not constants:
//! the over-utilization warning band in particular varies per organization.
//! Values load from the environment with sane defaults.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default number of days before expiry that a license enters the warning
/// window.
pub const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 30;

/// Default utilization fraction at which a license is flagged over-utilized.
pub const DEFAULT_OVER_UTILIZATION_THRESHOLD: f64 = 0.90;

/// Default utilization fraction at which a license enters the softer
/// warning band.
pub const DEFAULT_UTILIZATION_WARNING_THRESHOLD: f64 = 0.70;

/// Default interval between recurring compliance scans (6 hours).
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 21_600;

/// Default bound on any single store interaction.
pub const DEFAULT_STORE_OP_TIMEOUT_MS: u64 = 5_000;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that failed to parse or
    /// violated a bound.
    #[error("invalid configuration for {var}: {reason}")]
    Invalid {
        /// Variable name.
        var: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Days before `valid_until` at which a license counts as expiring.
    pub expiry_warning_days: i64,
    /// Utilization fraction in (0, 1] at which a license is over-utilized.
    pub over_utilization_threshold: f64,
    /// Softer warning band, strictly below the over-utilization threshold.
    pub utilization_warning_threshold: f64,
    /// Seconds between recurring compliance scans.
    pub scan_interval_secs: u64,
    /// Milliseconds before a store interaction fails with `Timeout`.
    pub store_op_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            expiry_warning_days: DEFAULT_EXPIRY_WARNING_DAYS,
            over_utilization_threshold: DEFAULT_OVER_UTILIZATION_THRESHOLD,
            utilization_warning_threshold: DEFAULT_UTILIZATION_WARNING_THRESHOLD,
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            store_op_timeout_ms: DEFAULT_STORE_OP_TIMEOUT_MS,
        }
    }
}

impl CoreConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            expiry_warning_days: parse_var(
                "SEATWISE_EXPIRY_WARNING_DAYS",
                DEFAULT_EXPIRY_WARNING_DAYS,
            )?,
            over_utilization_threshold: parse_var(
                "SEATWISE_OVER_UTILIZATION_THRESHOLD",
                DEFAULT_OVER_UTILIZATION_THRESHOLD,
            )?,
            utilization_warning_threshold: parse_var(
                "SEATWISE_UTILIZATION_WARNING_THRESHOLD",
                DEFAULT_UTILIZATION_WARNING_THRESHOLD,
            )?,
            scan_interval_secs: parse_var(
                "SEATWISE_SCAN_INTERVAL_SECS",
                DEFAULT_SCAN_INTERVAL_SECS,
            )?,
            store_op_timeout_ms: parse_var(
                "SEATWISE_STORE_OP_TIMEOUT_MS",
                DEFAULT_STORE_OP_TIMEOUT_MS,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiry_warning_days < 1 {
            return Err(invalid(
                "SEATWISE_EXPIRY_WARNING_DAYS",
                "must be at least 1",
            ));
        }
        if !(self.over_utilization_threshold > 0.0 && self.over_utilization_threshold <= 1.0) {
            return Err(invalid(
                "SEATWISE_OVER_UTILIZATION_THRESHOLD",
                "must be in (0, 1]",
            ));
        }
        if !(self.utilization_warning_threshold > 0.0
            && self.utilization_warning_threshold < self.over_utilization_threshold)
        {
            return Err(invalid(
                "SEATWISE_UTILIZATION_WARNING_THRESHOLD",
                "must be in (0, over_utilization_threshold)",
            ));
        }
        if self.scan_interval_secs == 0 {
            return Err(invalid("SEATWISE_SCAN_INTERVAL_SECS", "must be non-zero"));
        }
        if self.store_op_timeout_ms == 0 {
            return Err(invalid("SEATWISE_STORE_OP_TIMEOUT_MS", "must be non-zero"));
        }
        Ok(())
    }

    /// Store timeout as a [`Duration`].
    #[must_use]
    pub fn store_op_timeout(&self) -> Duration {
        Duration::from_millis(self.store_op_timeout_ms)
    }

    /// Scan interval as a [`Duration`].
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
