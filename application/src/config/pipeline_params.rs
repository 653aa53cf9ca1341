//! Pipeline parameters: update loop control.
//!
//! [`PipelineParams`] groups the static parameters that bound the update
//! pipeline in [`ProposeConfigUpdateUseCase`](crate::use_cases::propose_update::ProposeConfigUpdateUseCase):
//! how long signatures are collected, how long a submission may take, and
//! how often stale or unavailable outcomes are retried.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update pipeline control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineParams {
    /// How long an update collects signatures before it expires.
    pub collection_deadline: Duration,
    /// Bound on a single broadcast round trip; exceeding it counts as unavailable.
    pub submit_timeout: Duration,
    /// Rebuild attempts after a stale-version rejection.
    pub max_stale_retries: usize,
    /// Total broadcast attempts while the ordering service is unavailable.
    pub max_unavailable_attempts: usize,
    /// First backoff delay between unavailable attempts.
    pub backoff_initial: Duration,
    /// Upper bound on the backoff delay.
    pub backoff_max: Duration,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            collection_deadline: Duration::from_secs(300),
            submit_timeout: Duration::from_secs(30),
            max_stale_retries: 3,
            max_unavailable_attempts: 5,
            backoff_initial: Duration::from_millis(500),
            backoff_max: Duration::from_secs(10),
        }
    }
}

impl PipelineParams {
    // ==================== Builder Methods ====================

    pub fn with_collection_deadline(mut self, deadline: Duration) -> Self {
        self.collection_deadline = deadline;
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn with_max_stale_retries(mut self, max: usize) -> Self {
        self.max_stale_retries = max;
        self
    }

    pub fn with_max_unavailable_attempts(mut self, max: usize) -> Self {
        self.max_unavailable_attempts = max.max(1);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff_initial = initial;
        self.backoff_max = max.max(initial);
        self
    }

    /// Delay before broadcast attempt `attempt + 1`, doubling from
    /// `backoff_initial` up to `backoff_max`
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.backoff_initial
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.backoff_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = PipelineParams::default();
        assert_eq!(params.collection_deadline, Duration::from_secs(300));
        assert_eq!(params.max_stale_retries, 3);
        assert_eq!(params.max_unavailable_attempts, 5);
    }

    #[test]
    fn test_builder() {
        let params = PipelineParams::default()
            .with_submit_timeout(Duration::from_secs(5))
            .with_max_stale_retries(1)
            .with_max_unavailable_attempts(0);

        assert_eq!(params.submit_timeout, Duration::from_secs(5));
        assert_eq!(params.max_stale_retries, 1);
        // At least one attempt is always made
        assert_eq!(params.max_unavailable_attempts, 1);
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let params = PipelineParams::default()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(350));

        assert_eq!(params.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(params.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(params.backoff_delay(3), Duration::from_millis(350));
        assert_eq!(params.backoff_delay(40), Duration::from_millis(350));
    }
}
