//! Worker configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Upper bound for one segmentation attempt
    pub job_timeout: Duration,
    /// Retries after the first attempt (transient failures only)
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_base_delay: Duration,
    /// Cap on the backoff delay
    pub retry_max_delay: Duration,
    /// Prometheus exporter listen address; metrics are not exported when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(3600), // 1 hour
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_u64 = |key: &str| lookup(key).and_then(|s| s.parse::<u64>().ok());

        Self {
            job_timeout: parse_u64("VSEG_JOB_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            max_retries: lookup("VSEG_MAX_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: parse_u64("VSEG_RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            retry_max_delay: parse_u64("VSEG_RETRY_MAX_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_max_delay),
            metrics_addr: lookup("VSEG_METRICS_ADDR").and_then(|s| s.parse().ok()),
        }
    }
}
