//! Submission coordination
//!
//! Broadcasts a signed envelope, bounding each round trip by the configured
//! timeout and retrying while the ordering service is unavailable. Version
//! and policy outcomes are returned to the caller untouched.

use crate::config::PipelineParams;
use crate::ports::ordering_service::{OrderingError, OrderingService};
use chanconf_domain::{ConfigEnvelope, OrdererResponse, RejectReason};
use std::sync::Arc;
use tracing::{debug, warn};

/// Submits envelopes to the ordering service
pub struct SubmissionCoordinator<O: OrderingService + 'static> {
    orderer: Arc<O>,
    params: PipelineParams,
}

impl<O: OrderingService + 'static> SubmissionCoordinator<O> {
    pub fn new(orderer: Arc<O>, params: PipelineParams) -> Self {
        Self { orderer, params }
    }

    /// Broadcast `envelope` and return the final response
    ///
    /// Timeouts and transport errors are reported as
    /// [`RejectReason::Unavailable`]. Unavailable outcomes are retried with
    /// exponential backoff up to `max_unavailable_attempts` attempts in total;
    /// the last one is returned when all fail.
    pub async fn submit(&self, envelope: &ConfigEnvelope) -> OrdererResponse {
        let attempts = self.params.max_unavailable_attempts.max(1);
        let mut attempt = 1;
        loop {
            let response = self.submit_once(envelope).await;
            if response.reject_reason() != Some(RejectReason::Unavailable) || attempt >= attempts {
                return response;
            }

            let delay = self.params.backoff_delay(attempt);
            warn!(
                "Ordering service unavailable (attempt {}/{}), retrying in {:?}",
                attempt, attempts, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn submit_once(&self, envelope: &ConfigEnvelope) -> OrdererResponse {
        let broadcast = self.orderer.broadcast(envelope);
        match tokio::time::timeout(self.params.submit_timeout, broadcast).await {
            Ok(Ok(response)) => {
                debug!("Ordering service responded: {:?}", response);
                response
            }
            Ok(Err(e)) => unavailable(e),
            Err(_) => unavailable(OrderingError::Timeout),
        }
    }
}

fn unavailable(error: OrderingError) -> OrdererResponse {
    OrdererResponse::rejected(RejectReason::Unavailable, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chanconf_domain::{ChannelConfig, ChannelId, ConfigUpdateDelta};
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays a scripted sequence of broadcast outcomes
    struct ScriptedOrderer {
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<usize>,
    }

    enum Scripted {
        Respond(OrdererResponse),
        Fail,
        Hang,
    }

    impl ScriptedOrderer {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl OrderingService for ScriptedOrderer {
        async fn fetch_config(&self, channel: &ChannelId) -> Result<ChannelConfig, OrderingError> {
            Err(OrderingError::ChannelNotFound(channel.clone()))
        }

        async fn broadcast(&self, _envelope: &ConfigEnvelope) -> Result<OrdererResponse, OrderingError> {
            *self.calls.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail) | None => {
                    Err(OrderingError::Connection("refused".to_string()))
                }
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(OrdererResponse::Accepted { sequence: 0 })
                }
            }
        }
    }

    fn envelope() -> ConfigEnvelope {
        ConfigEnvelope::new(
            ConfigUpdateDelta {
                channel: ChannelId::new("mychannel"),
                read_set: BTreeMap::new(),
                write_set: BTreeMap::new(),
            },
            &BTreeMap::new(),
        )
    }

    fn params() -> PipelineParams {
        PipelineParams::default()
            .with_submit_timeout(Duration::from_secs(5))
            .with_max_unavailable_attempts(3)
            .with_backoff(Duration::from_millis(100), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_first_try() {
        let orderer = Arc::new(ScriptedOrderer::new(vec![Scripted::Respond(
            OrdererResponse::Accepted { sequence: 1 },
        )]));
        let coordinator = SubmissionCoordinator::new(Arc::clone(&orderer), params());

        assert!(coordinator.submit(&envelope()).await.is_accepted());
        assert_eq!(orderer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_retried_then_accepted() {
        let orderer = Arc::new(ScriptedOrderer::new(vec![
            Scripted::Fail,
            Scripted::Respond(OrdererResponse::rejected(RejectReason::Unavailable, "busy")),
            Scripted::Respond(OrdererResponse::Accepted { sequence: 2 }),
        ]));
        let coordinator = SubmissionCoordinator::new(Arc::clone(&orderer), params());

        let started = tokio::time::Instant::now();
        let response = coordinator.submit(&envelope()).await;

        assert_eq!(response, OrdererResponse::Accepted { sequence: 2 });
        assert_eq!(orderer.calls(), 3);
        // 100ms + 200ms of backoff
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_surfaces_after_bounded_attempts() {
        let orderer = Arc::new(ScriptedOrderer::new(vec![]));
        let coordinator = SubmissionCoordinator::new(Arc::clone(&orderer), params());

        let response = coordinator.submit(&envelope()).await;
        assert_eq!(response.reject_reason(), Some(RejectReason::Unavailable));
        assert_eq!(orderer.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_unavailable() {
        let orderer = Arc::new(ScriptedOrderer::new(vec![
            Scripted::Hang,
            Scripted::Respond(OrdererResponse::Accepted { sequence: 1 }),
        ]));
        let coordinator = SubmissionCoordinator::new(Arc::clone(&orderer), params());

        assert!(coordinator.submit(&envelope()).await.is_accepted());
        assert_eq!(orderer.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_version_is_not_retried_here() {
        let orderer = Arc::new(ScriptedOrderer::new(vec![Scripted::Respond(
            OrdererResponse::rejected(RejectReason::StaleVersion, "Channel/Application moved"),
        )]));
        let coordinator = SubmissionCoordinator::new(Arc::clone(&orderer), params());

        let response = coordinator.submit(&envelope()).await;
        assert_eq!(response.reject_reason(), Some(RejectReason::StaleVersion));
        assert_eq!(orderer.calls(), 1);
    }
}
