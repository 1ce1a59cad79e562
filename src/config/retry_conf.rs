use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

pub const MAX_ATTEMPTS_CEILING: u32 = 10;

/// Attempt ceilings for the optimistic write paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Party identifier assignments tried before falling back to a clock-derived id
    pub party_id_attempts: u32,
    /// Follow-up writes tried before reporting a conflict
    pub follow_up_attempts: u32,
    /// Quotation inserts re-planned after a `(party, version)` collision
    pub quotation_attempts: u32,
}

impl RetryConfig {
    /// Load retry configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PARTY_ID_MAX_ATTEMPTS: identifier assignment attempts (defaults to 5)
    /// - FOLLOW_UP_MAX_ATTEMPTS: follow-up write attempts (defaults to 5)
    /// - QUOTATION_MAX_ATTEMPTS: quotation version attempts (defaults to 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading retry configuration from environment variables");
        let config = RetryConfig {
            party_id_attempts: Self::attempts_from_env("PARTY_ID_MAX_ATTEMPTS")?,
            follow_up_attempts: Self::attempts_from_env("FOLLOW_UP_MAX_ATTEMPTS")?,
            quotation_attempts: Self::attempts_from_env("QUOTATION_MAX_ATTEMPTS")?,
        };
        config.validate()?;
        debug!(?config, "Retry configuration loaded");
        Ok(config)
    }

    fn attempts_from_env(var: &str) -> Result<u32, ConfigError> {
        match env::var(var) {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| {
                error!("Invalid {} value: {}", var, raw);
                ConfigError::ParseError(format!("{} must be a positive integer, got {}", var, raw))
            }),
            Err(_) => {
                warn!("{} not set, using default: 5", var);
                Ok(5)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("party_id_attempts", self.party_id_attempts),
            ("follow_up_attempts", self.follow_up_attempts),
            ("quotation_attempts", self.quotation_attempts),
        ] {
            if value == 0 || value > MAX_ATTEMPTS_CEILING {
                error!("{} out of range: {}", name, value);
                return Err(ConfigError::ValidationError(format!(
                    "{} must be between 1 and {}",
                    name, MAX_ATTEMPTS_CEILING
                )));
            }
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            party_id_attempts: 5,
            follow_up_attempts: 5,
            quotation_attempts: 5,
        }
    }
}
