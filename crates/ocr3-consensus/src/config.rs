//! # Consensus Configuration
//!
//! Runtime parameters for the plugin and the request handler.
//!
//! All fields have defaults, so a partial config document deserializes:
//!
//! ```rust,ignore
//! let config: Ocr3Config = serde_json::from_str(r#"{ "batch_size": 50 }"#)?;
//! config.validate()?;
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Byte budgets the host runtime enforces on each round's messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    pub max_query_length_bytes: usize,
    pub max_observation_length_bytes: usize,
    pub max_outcome_length_bytes: usize,
    pub max_report_length_bytes: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_query_length_bytes: 1024 * 1024,
            max_observation_length_bytes: 1024 * 1024,
            max_outcome_length_bytes: 1024 * 1024,
            max_report_length_bytes: 1024 * 1024,
        }
    }
}

/// OCR3 consensus configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocr3Config {
    /// Maximum requests proposed per Query.
    pub batch_size: usize,
    /// Rounds a workflow may go unseen by F+1 oracles before its outcome is pruned.
    pub outcome_pruning_threshold: u64,
    /// Default lifetime of a request before it times out.
    pub request_timeout_secs: u64,
    /// How long a response without a matching request is kept.
    pub response_cache_expiry_secs: u64,
    /// Cadence of the request-expiry and cache-expiry sweeps.
    pub sweep_interval_ms: u64,
    pub limits: SizeLimits,
}

impl Default for Ocr3Config {
    fn default() -> Self {
        Self {
            batch_size: 20,
            outcome_pruning_threshold: 3600,
            request_timeout_secs: 20 * 60,
            response_cache_expiry_secs: 10 * 60,
            sweep_interval_ms: 1000,
            limits: SizeLimits::default(),
        }
    }
}

impl Ocr3Config {
    /// Rejects values that would make every round fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }
        let limits = [
            ("max_query_length_bytes", self.limits.max_query_length_bytes),
            ("max_observation_length_bytes", self.limits.max_observation_length_bytes),
            ("max_outcome_length_bytes", self.limits.max_outcome_length_bytes),
            ("max_report_length_bytes", self.limits.max_report_length_bytes),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::ZeroSizeLimit { name });
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn response_cache_expiry(&self) -> Duration {
        Duration::from_secs(self.response_cache_expiry_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
