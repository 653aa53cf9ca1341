//! Pipeline configuration from TOML (`[pipeline]` section)

use chanconf_application::PipelineParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw pipeline configuration from TOML
///
/// # Example
///
/// ```toml
/// [pipeline]
/// collection_deadline_secs = 300   # signature collection window
/// submit_timeout_secs = 30         # bound on one broadcast round trip
/// max_stale_retries = 3            # rebuilds after STALE_VERSION
/// max_unavailable_attempts = 5     # broadcasts while UNAVAILABLE
/// backoff_initial_ms = 500
/// backoff_max_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    pub collection_deadline_secs: u64,
    pub submit_timeout_secs: u64,
    pub max_stale_retries: usize,
    pub max_unavailable_attempts: usize,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    /// How often abandoned updates are swept
    pub sweep_interval_secs: u64,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let params = PipelineParams::default();
        Self {
            collection_deadline_secs: params.collection_deadline.as_secs(),
            submit_timeout_secs: params.submit_timeout.as_secs(),
            max_stale_retries: params.max_stale_retries,
            max_unavailable_attempts: params.max_unavailable_attempts,
            backoff_initial_ms: params.backoff_initial.as_millis() as u64,
            backoff_max_ms: params.backoff_max.as_millis() as u64,
            sweep_interval_secs: 30,
        }
    }
}

impl FilePipelineConfig {
    /// Convert to application-layer pipeline parameters
    pub fn to_params(&self) -> PipelineParams {
        PipelineParams::default()
            .with_collection_deadline(Duration::from_secs(self.collection_deadline_secs))
            .with_submit_timeout(Duration::from_secs(self.submit_timeout_secs))
            .with_max_stale_retries(self.max_stale_retries)
            .with_max_unavailable_attempts(self.max_unavailable_attempts)
            .with_backoff(
                Duration::from_millis(self.backoff_initial_ms),
                Duration::from_millis(self.backoff_max_ms),
            )
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
