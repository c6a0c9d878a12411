//! Configuration for the region ping subsystem
//!
//! # Examples
//!
//! ## Creating a default configuration
//!
//! ```
//! use braincloud_core::config::PingConfig;
//!
//! let config = PingConfig::default();
//! assert_eq!(config.parallelism, 2);
//! assert_eq!(config.samples_per_region, 4);
//! assert_eq!(config.max_ping_millis, 999);
//! ```
//!
//! ## Using the configuration builder
//!
//! ```
//! use braincloud_core::config::PingConfigBuilder;
//!
//! let config = PingConfigBuilder::new()
//!     .parallelism(4).unwrap()
//!     .samples_per_region(6).unwrap()
//!     .probe_timeout_ms(1_500).unwrap()
//!     .build();
//!
//! assert_eq!(config.parallelism, 4);
//! assert_eq!(config.probe_timeout().as_millis(), 1_500);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Sentinel latency reported for unreachable or slow regions
pub const MAX_PING_MILLIS: u32 = 999;

/// Default number of regions probed at the same time
pub const DEFAULT_PARALLELISM: usize = 2;

/// Default number of timed requests per region
pub const DEFAULT_SAMPLES_PER_REGION: usize = 4;

/// Default timeout of a single probe request in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

const MAX_PARALLELISM: usize = 16;
const MAX_SAMPLES_PER_REGION: usize = 16;
const MAX_PROBE_TIMEOUT_MS: u64 = 60_000;

/// Region ping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    /// Maximum number of probe workers running at once
    pub parallelism: usize,
    /// Timed requests per region; the slowest one is discarded
    pub samples_per_region: usize,
    /// Timeout of a single probe request in milliseconds
    pub probe_timeout_ms: u64,
    /// Upper bound for any reported latency
    pub max_ping_millis: u32,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            samples_per_region: DEFAULT_SAMPLES_PER_REGION,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            max_ping_millis: MAX_PING_MILLIS,
        }
    }
}

impl PingConfig {
    /// Timeout of a single probe request
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Parse and validate a JSON configuration document
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("Invalid ping configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<()> {
        check_parallelism(self.parallelism)?;
        check_samples(self.samples_per_region)?;
        check_timeout(self.probe_timeout_ms)?;
        check_max_ping(self.max_ping_millis)
    }
}

fn check_parallelism(parallelism: usize) -> Result<()> {
    if parallelism == 0 || parallelism > MAX_PARALLELISM {
        return Err(Error::configuration(format!(
            "Parallelism must be between 1 and {MAX_PARALLELISM}, got {parallelism}"
        ))
        .with_context("field", "parallelism"));
    }
    Ok(())
}

fn check_samples(samples: usize) -> Result<()> {
    if samples == 0 || samples > MAX_SAMPLES_PER_REGION {
        return Err(Error::configuration(format!(
            "Samples per region must be between 1 and {MAX_SAMPLES_PER_REGION}, got {samples}"
        ))
        .with_context("field", "samples_per_region"));
    }
    Ok(())
}

fn check_timeout(timeout_ms: u64) -> Result<()> {
    if timeout_ms == 0 {
        return Err(Error::configuration("Probe timeout cannot be zero")
            .with_context("field", "probe_timeout_ms"));
    }
    if timeout_ms > MAX_PROBE_TIMEOUT_MS {
        return Err(Error::configuration("Probe timeout cannot exceed 60 seconds")
            .with_context("field", "probe_timeout_ms"));
    }
    Ok(())
}

fn check_max_ping(max_ping_millis: u32) -> Result<()> {
    if max_ping_millis == 0 || max_ping_millis > MAX_PING_MILLIS {
        return Err(Error::configuration(format!(
            "Maximum ping must be between 1 and {MAX_PING_MILLIS}, got {max_ping_millis}"
        ))
        .with_context("field", "max_ping_millis"));
    }
    Ok(())
}

/// Configuration builder with validated setters
#[derive(Debug, Default)]
pub struct PingConfigBuilder {
    config: PingConfig,
}

impl PingConfigBuilder {
    /// Create a new configuration builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of concurrent probes
    pub fn parallelism(mut self, parallelism: usize) -> Result<Self> {
        check_parallelism(parallelism)?;
        self.config.parallelism = parallelism;
        Ok(self)
    }

    /// Set the number of timed requests per region
    pub fn samples_per_region(mut self, samples: usize) -> Result<Self> {
        check_samples(samples)?;
        self.config.samples_per_region = samples;
        Ok(self)
    }

    /// Set the timeout of a single probe request
    pub fn probe_timeout_ms(mut self, timeout_ms: u64) -> Result<Self> {
        check_timeout(timeout_ms)?;
        self.config.probe_timeout_ms = timeout_ms;
        Ok(self)
    }

    /// Set the latency reported for unreachable regions
    pub fn max_ping_millis(mut self, max_ping_millis: u32) -> Result<Self> {
        check_max_ping(max_ping_millis)?;
        self.config.max_ping_millis = max_ping_millis;
        Ok(self)
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> PingConfig {
        self.config
    }
}
