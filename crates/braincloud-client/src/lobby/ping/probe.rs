//! Latency probes
//!
//! A [`ProbeWorker`] times a fixed number of sequential requests against one
//! region and reduces them with [`trimmed_mean_with_cap`]. The request itself is behind
//! the [`Prober`] trait; [`HttpProber`] is the production implementation.

use std::time::{Duration, Instant};

use braincloud_core::config::{MAX_PING_MILLIS, PingConfig};
use braincloud_core::{ErrorExt, ErrorKind, Result};
use tracing::trace;

use super::registry::RegionDescriptor;

/// One timed request against a probe target
pub trait Prober: Send + Sync {
    /// Latency of a single request in milliseconds.
    ///
    /// Any failure is reported as [`MAX_PING_MILLIS`], never as an error.
    fn sample(&self, target_url: &str) -> u32;
}

impl<F> Prober for F
where
    F: Fn(&str) -> u32 + Send + Sync,
{
    fn sample(&self, target_url: &str) -> u32 {
        self(target_url)
    }
}

/// Reasons a single HTTP probe did not produce a timing
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Connection, TLS or timeout failure
    #[error("request to {url} failed: {source}")]
    Request {
        /// Probe target
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Target answered with something other than 200 OK
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Probe target
        url: String,
        /// HTTP status returned
        status: u16,
    },
}

/// Blocking HTTP GET prober
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::blocking::Client,
    max_ping_millis: u32,
}

impl HttpProber {
    /// Create a prober whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .with_sdk_error(ErrorKind::Transport, "Failed to build probe client")
            .map_err(|e| e.with_component("http_prober"))?;

        Ok(Self {
            client,
            max_ping_millis: MAX_PING_MILLIS,
        })
    }

    /// Create a prober from the ping configuration
    pub fn from_config(config: &PingConfig) -> Result<Self> {
        let mut prober = Self::new(config.probe_timeout())?;
        prober.max_ping_millis = config.max_ping_millis;
        Ok(prober)
    }

    /// Time one GET request, reporting why it failed if it did
    pub fn try_sample(&self, target_url: &str) -> std::result::Result<Duration, ProbeError> {
        let started = Instant::now();
        let response = self
            .client
            .get(target_url)
            .send()
            .map_err(|source| ProbeError::Request {
                url: target_url.to_string(),
                source,
            })?;
        let elapsed = started.elapsed();

        if response.status() != reqwest::StatusCode::OK {
            return Err(ProbeError::Status {
                url: target_url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(elapsed)
    }
}

impl Prober for HttpProber {
    fn sample(&self, target_url: &str) -> u32 {
        match self.try_sample(target_url) {
            Ok(elapsed) => duration_to_millis(elapsed, self.max_ping_millis),
            Err(err) => {
                trace!(error = %err, "probe sample failed");
                self.max_ping_millis
            }
        }
    }
}

fn duration_to_millis(elapsed: Duration, cap: u32) -> u32 {
    u32::try_from(elapsed.as_millis()).map_or(cap, |ms| ms.min(cap))
}

/// Latency measured for one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Region identifier
    pub region_name: String,
    /// Trimmed-mean latency in milliseconds
    pub latency_millis: u32,
}

/// Measures latency to a single region
#[derive(Debug, Clone)]
pub struct ProbeWorker {
    region: RegionDescriptor,
    samples: usize,
    max_ping_millis: u32,
}

impl ProbeWorker {
    /// Create a worker for `region` using the sample count and cap from `config`
    pub fn new(region: RegionDescriptor, config: &PingConfig) -> Self {
        Self {
            region,
            samples: config.samples_per_region,
            max_ping_millis: config.max_ping_millis,
        }
    }

    /// Region this worker probes
    pub fn region(&self) -> &RegionDescriptor {
        &self.region
    }

    /// Take every sample in sequence and aggregate them
    pub fn run(&self, prober: &dyn Prober) -> ProbeResult {
        let samples: Vec<u32> = (0..self.samples)
            .map(|_| {
                prober
                    .sample(&self.region.target_url)
                    .min(self.max_ping_millis)
            })
            .collect();

        let latency_millis = trimmed_mean_with_cap(&samples, self.max_ping_millis);
        trace!(region = %self.region.name, ?samples, latency_millis, "region probed");

        ProbeResult {
            region_name: self.region.name.clone(),
            latency_millis,
        }
    }
}

/// Mean of `samples` after discarding the single largest one
///
/// The integer mean is floored and capped at [`MAX_PING_MILLIS`]. A single
/// sample is returned as is; an empty slice counts as unreachable.
///
/// ```
/// use braincloud_client::lobby::ping::trimmed_mean;
///
/// assert_eq!(trimmed_mean(&[10, 20, 30, 999]), 20);
/// assert_eq!(trimmed_mean(&[]), 999);
/// ```
pub fn trimmed_mean(samples: &[u32]) -> u32 {
    trimmed_mean_with_cap(samples, MAX_PING_MILLIS)
}

/// [`trimmed_mean`] against a configured sentinel instead of [`MAX_PING_MILLIS`]
///
/// `cap` is both the upper bound of the result and the value of an empty slice.
///
/// ```
/// use braincloud_client::lobby::ping::trimmed_mean_with_cap;
///
/// assert_eq!(trimmed_mean_with_cap(&[10, 20, 500, 500], 500), 176);
/// assert_eq!(trimmed_mean_with_cap(&[], 500), 500);
/// ```
pub fn trimmed_mean_with_cap(samples: &[u32], cap: u32) -> u32 {
    match samples.len() {
        0 => cap,
        1 => samples[0].min(cap),
        len => {
            let mut sorted = samples.to_vec();
            sorted.sort_unstable();
            let kept = &sorted[..len - 1];
            let sum: u64 = kept.iter().map(|&s| u64::from(s)).sum();
            let mean = sum / kept.len() as u64;
            u32::try_from(mean).map_or(cap, |m| m.min(cap))
        }
    }
}
