//! In-process ordering service
//!
//! Holds the committed configuration of each channel and validates envelopes
//! the way a real ordering service does before committing them:
//!
//! 1. Every read-set version matches the committed tree (else `STALE_VERSION`)
//! 2. Write versions and structure are well formed (else `MALFORMED`)
//! 3. Verified member signatures satisfy every modified group's `mod_policy`
//!    under the committed policies (else `POLICY_UNSATISFIED`)
//!
//! Fault hooks let callers simulate an unavailable service and concurrent
//! updates landing from other administrators.

use async_trait::async_trait;
use chanconf_application::{OrderingError, OrderingService};
use chanconf_domain::{
    ChannelConfig, ChannelId, ConfigEnvelope, DeltaBuilder, DomainError, OrdererResponse,
    ProposalKind, QuorumPolicyEvaluator, RejectReason, apply_delta, join_orgs,
};
use chanconf_domain::delta::{check_write_versions, orphaned_writes};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Ordering service keeping channel configurations in memory
#[derive(Default)]
pub struct InMemoryOrderingService {
    channels: Mutex<HashMap<ChannelId, ChannelConfig>>,
    /// Proposals committed without signatures just before the next broadcast
    interleaved: Mutex<VecDeque<(ChannelId, ProposalKind)>>,
    unavailable: AtomicUsize,
    fetches: AtomicUsize,
    broadcasts: AtomicUsize,
}

impl InMemoryOrderingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(channels: impl IntoIterator<Item = ChannelConfig>) -> Self {
        let channels = channels
            .into_iter()
            .map(|config| (config.channel.clone(), config))
            .collect();
        Self {
            channels: Mutex::new(channels),
            ..Self::default()
        }
    }

    /// Install or replace a channel's configuration
    pub async fn insert_channel(&self, config: ChannelConfig) {
        self.channels
            .lock()
            .await
            .insert(config.channel.clone(), config);
    }

    pub async fn channel_ids(&self) -> Vec<ChannelId> {
        let mut ids: Vec<_> = self.channels.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Commit `proposal` without collecting signatures, as if another
    /// administrator's update had just been ordered
    pub async fn commit_unchecked(
        &self,
        channel: &ChannelId,
        proposal: &ProposalKind,
    ) -> Result<u64, DomainError> {
        let mut channels = self.channels.lock().await;
        let config = channels
            .get_mut(channel)
            .ok_or_else(|| DomainError::InvalidDelta(format!("unknown channel {}", channel)))?;
        Self::commit_direct(config, proposal)
    }

    /// Commit `proposal` right before the next broadcast is validated
    pub async fn interleave(&self, channel: impl Into<ChannelId>, proposal: ProposalKind) {
        self.interleaved
            .lock()
            .await
            .push_back((channel.into(), proposal));
    }

    /// Answer the next `count` broadcasts with `UNAVAILABLE`
    pub fn fail_next(&self, count: usize) {
        self.unavailable.fetch_add(count, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    fn commit_direct(config: &mut ChannelConfig, proposal: &ProposalKind) -> Result<u64, DomainError> {
        let delta = DeltaBuilder::build(config, proposal)?;
        config.root = apply_delta(&config.root, &delta)?;
        config.sequence += 1;
        Ok(config.sequence)
    }

    fn take_one_unavailable(&self) -> bool {
        self.unavailable
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Validate `envelope` against `config` and commit it on success
    fn validate_and_commit(config: &mut ChannelConfig, envelope: &ConfigEnvelope) -> OrdererResponse {
        let delta = &envelope.delta;

        let conflicts = delta.read_conflicts(&config.root);
        if !conflicts.is_empty() {
            let info = conflicts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return OrdererResponse::rejected(RejectReason::StaleVersion, info);
        }

        if let Err(e) = check_write_versions(&config.root, delta) {
            return OrdererResponse::rejected(RejectReason::Malformed, e.to_string());
        }
        let orphans = orphaned_writes(&config.root, delta);
        if !orphans.is_empty() {
            let paths = orphans.iter().map(ToString::to_string).collect::<Vec<_>>();
            return OrdererResponse::rejected(
                RejectReason::Malformed,
                format!("writes without a parent: {}", paths.join(", ")),
            );
        }

        let requirement = match QuorumPolicyEvaluator::evaluate(config, delta) {
            Ok(requirement) => requirement,
            Err(e @ DomainError::UnsatisfiablePolicy { .. }) => {
                return OrdererResponse::rejected(RejectReason::PolicyUnsatisfied, e.to_string());
            }
            Err(e) => return OrdererResponse::rejected(RejectReason::Malformed, e.to_string()),
        };

        let signers = match envelope.verified_signers(&requirement) {
            Ok(signers) => signers,
            Err(e) => return OrdererResponse::rejected(RejectReason::Malformed, e.to_string()),
        };
        if !requirement.is_satisfied(&signers) {
            return OrdererResponse::rejected(
                RejectReason::PolicyUnsatisfied,
                format!(
                    "missing signatures from [{}]",
                    join_orgs(&requirement.outstanding(&signers))
                ),
            );
        }

        match apply_delta(&config.root, delta) {
            Ok(root) => {
                config.root = root;
                config.sequence += 1;
                OrdererResponse::Accepted {
                    sequence: config.sequence,
                }
            }
            Err(e) => OrdererResponse::rejected(RejectReason::Malformed, e.to_string()),
        }
    }
}

#[async_trait]
impl OrderingService for InMemoryOrderingService {
    async fn fetch_config(&self, channel: &ChannelId) -> Result<ChannelConfig, OrderingError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.channels
            .lock()
            .await
            .get(channel)
            .cloned()
            .ok_or_else(|| OrderingError::ChannelNotFound(channel.clone()))
    }

    async fn broadcast(&self, envelope: &ConfigEnvelope) -> Result<OrdererResponse, OrderingError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);

        if self.take_one_unavailable() {
            debug!("Injected UNAVAILABLE for channel {}", envelope.delta.channel);
            return Ok(OrdererResponse::rejected(
                RejectReason::Unavailable,
                "ordering service unavailable",
            ));
        }

        let mut channels = self.channels.lock().await;

        let pending: Vec<_> = self.interleaved.lock().await.drain(..).collect();
        for (channel, proposal) in pending {
            match channels.get_mut(&channel) {
                Some(config) => match Self::commit_direct(config, &proposal) {
                    Ok(sequence) => info!(
                        "Interleaved update committed on {} at sequence {}: {}",
                        channel, sequence, proposal
                    ),
                    Err(e) => warn!("Interleaved update on {} skipped: {}", channel, e),
                },
                None => warn!("Interleaved update for unknown channel {}", channel),
            }
        }

        let channel = &envelope.delta.channel;
        let config = channels
            .get_mut(channel)
            .ok_or_else(|| OrderingError::ChannelNotFound(channel.clone()))?;

        let response = Self::validate_and_commit(config, envelope);
        match &response {
            OrdererResponse::Accepted { sequence } => {
                debug!("Channel {} advanced to sequence {}", channel, sequence)
            }
            OrdererResponse::Rejected { reason, info } => {
                debug!("Channel {} rejected envelope: {} ({})", channel, reason, info)
            }
        }
        Ok(response)
    }
}
