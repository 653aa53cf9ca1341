//! Propose Config Update use case
//!
//! Drives one proposal through the whole pipeline:
//!
//! ```text
//! fetch snapshot ──> build delta ──> evaluate quorum ──> collect signatures
//!       ▲                                                      │
//!       │ STALE_VERSION (bounded)                              ▼
//!       └──────────────── interpret response <──────── submit envelope
//! ```
//!
//! A stale-version rejection restarts from the snapshot with the original
//! proposal, so signatures are always computed against the delta that is
//! actually submitted. Every other rejection is terminal.

mod types;

pub use types::{CommittedUpdate, PipelineError};
use types::SignerFailure;

use crate::config::PipelineParams;
use crate::ports::audit_log::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::credentials::CredentialProvider;
use crate::ports::ordering_service::OrderingService;
use crate::ports::progress::{NoProgress, PipelineProgress};
use crate::use_cases::signature_collector::SignatureCollector;
use crate::use_cases::snapshot_store::ConfigSnapshotStore;
use crate::use_cases::submission::SubmissionCoordinator;
use chanconf_domain::{
    BatchParamsChange, ChannelConfig, ChannelId, DeltaBuilder, OrdererResponse, OrgId, OrgSpec,
    PendingUpdate, ProposalKind, QuorumPolicyEvaluator, RejectReason, SignatureBytes,
    SignatureOutcome, UpdateId, UpdateState, join_orgs,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// How one pipeline attempt ended
enum AttemptOutcome {
    Committed(CommittedUpdate),
    Stale,
}

/// Use case for proposing and committing channel configuration updates
pub struct ProposeConfigUpdateUseCase<O, C>
where
    O: OrderingService + 'static,
    C: CredentialProvider + 'static,
{
    snapshots: Arc<ConfigSnapshotStore<O>>,
    submission: SubmissionCoordinator<O>,
    collector: Arc<SignatureCollector>,
    credentials: Arc<C>,
    params: PipelineParams,
    audit: Arc<dyn AuditLogger>,
    default_channel: Option<ChannelId>,
}

impl<O, C> ProposeConfigUpdateUseCase<O, C>
where
    O: OrderingService + 'static,
    C: CredentialProvider + 'static,
{
    pub fn new(orderer: Arc<O>, credentials: Arc<C>, params: PipelineParams) -> Self {
        Self {
            snapshots: Arc::new(ConfigSnapshotStore::new(Arc::clone(&orderer))),
            submission: SubmissionCoordinator::new(orderer, params.clone()),
            collector: Arc::new(SignatureCollector::new()),
            credentials,
            params,
            audit: Arc::new(NoAuditLogger),
            default_channel: None,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Channel used by remove and batch proposals when the caller names none
    pub fn with_default_channel(mut self, channel: impl Into<ChannelId>) -> Self {
        self.default_channel = Some(channel.into());
        self
    }

    /// Share a collector, e.g. with a background sweeper
    pub fn with_collector(mut self, collector: Arc<SignatureCollector>) -> Self {
        self.collector = collector;
        self
    }

    pub fn collector(&self) -> &Arc<SignatureCollector> {
        &self.collector
    }

    pub fn snapshots(&self) -> &Arc<ConfigSnapshotStore<O>> {
        &self.snapshots
    }

    // ==================== Operations ====================

    pub async fn propose_add_organization(
        &self,
        channel: &ChannelId,
        org: OrgSpec,
    ) -> Result<CommittedUpdate, PipelineError> {
        self.execute(channel, ProposalKind::AddOrganization(org))
            .await
    }

    pub async fn propose_remove_organization(
        &self,
        channel: Option<&ChannelId>,
        org: OrgId,
    ) -> Result<CommittedUpdate, PipelineError> {
        let channel = self.resolve_channel(channel)?;
        self.execute(&channel, ProposalKind::RemoveOrganization { org_id: org })
            .await
    }

    pub async fn propose_batch_change(
        &self,
        channel: Option<&ChannelId>,
        change: BatchParamsChange,
    ) -> Result<CommittedUpdate, PipelineError> {
        let channel = self.resolve_channel(channel)?;
        self.execute(&channel, ProposalKind::ChangeBatchParams(change))
            .await
    }

    /// Record a signature delivered out of band for a pending update
    pub async fn submit_signature(
        &self,
        update: UpdateId,
        org: &OrgId,
        signature: SignatureBytes,
    ) -> Result<SignatureOutcome, PipelineError> {
        Ok(self
            .collector
            .submit_signature(update, org, signature)
            .await?)
    }

    /// Latest configuration of `channel`
    pub async fn current_config(
        &self,
        channel: Option<&ChannelId>,
    ) -> Result<Arc<ChannelConfig>, PipelineError> {
        let channel = self.resolve_channel(channel)?;
        Ok(self.snapshots.fetch_current(&channel).await?)
    }

    /// Execute with default (no-op) progress
    pub async fn execute(
        &self,
        channel: &ChannelId,
        proposal: ProposalKind,
    ) -> Result<CommittedUpdate, PipelineError> {
        self.execute_with_progress(channel, proposal, &NoProgress)
            .await
    }

    /// Execute with progress callbacks
    pub async fn execute_with_progress(
        &self,
        channel: &ChannelId,
        proposal: ProposalKind,
        progress: &dyn PipelineProgress,
    ) -> Result<CommittedUpdate, PipelineError> {
        let result = self.run(channel, &proposal, progress).await;
        if let Err(e) = &result {
            progress.on_failed(e);
        }
        result
    }

    /// `channel`, or the default channel when none is given
    pub fn resolve_channel(&self, channel: Option<&ChannelId>) -> Result<ChannelId, PipelineError> {
        channel
            .or(self.default_channel.as_ref())
            .cloned()
            .ok_or(PipelineError::NoChannel)
    }

    async fn run(
        &self,
        channel: &ChannelId,
        proposal: &ProposalKind,
        progress: &dyn PipelineProgress,
    ) -> Result<CommittedUpdate, PipelineError> {
        info!("Proposing on channel {}: {}", channel, proposal);

        let max_attempts = self.params.max_stale_retries + 1;
        for attempt in 1..=max_attempts {
            progress.on_attempt_start(proposal, attempt);
            match self.attempt(channel, proposal, attempt, progress).await? {
                AttemptOutcome::Committed(committed) => return Ok(committed),
                AttemptOutcome::Stale => {
                    warn!(
                        "Stale read-set on channel {} (attempt {}/{})",
                        channel, attempt, max_attempts
                    );
                }
            }
        }

        Err(PipelineError::StaleVersion {
            attempts: max_attempts,
        })
    }

    /// One pass: fetch, build, evaluate, collect, submit
    async fn attempt(
        &self,
        channel: &ChannelId,
        proposal: &ProposalKind,
        attempt: usize,
        progress: &dyn PipelineProgress,
    ) -> Result<AttemptOutcome, PipelineError> {
        let current = self.snapshots.fetch_current(channel).await?;

        let delta = DeltaBuilder::build(&current, proposal)?;
        let requirement = QuorumPolicyEvaluator::evaluate(&current, &delta)?;
        debug!(
            "Delta writes {} group(s); required signers [{}]",
            delta.write_set.len(),
            join_orgs(&requirement.required_signers())
        );
        progress.on_delta_built(&delta, &requirement);
        let mut built = json!({
            "channel": channel,
            "attempt": attempt,
            "proposal": proposal,
            "read_set": &delta.read_set,
            "modified": delta.modified_paths().collect::<Vec<_>>(),
            "created": delta.created_paths().collect::<Vec<_>>(),
            "required_signers": requirement.required_signers(),
        });

        let id = self.collector.open(
            proposal.clone(),
            delta,
            requirement,
            self.params.collection_deadline,
        )?;
        built["update"] = json!(id);
        self.audit.log(AuditEvent::new("delta_built", built));

        let update = match self.collect(id, progress).await {
            Ok(update) => update,
            Err(e) => {
                self.collector.abandon(id).await;
                if let PipelineError::CollectionExpired { outstanding } = &e {
                    self.audit.log(AuditEvent::new(
                        "collection_expired",
                        json!({ "update": id, "channel": channel, "outstanding": outstanding }),
                    ));
                }
                return Err(e);
            }
        };

        self.submit(channel, update, attempt, progress).await
    }

    /// Solicit every required signer and wait for the quorum hand-off
    async fn collect(
        &self,
        id: UpdateId,
        progress: &dyn PipelineProgress,
    ) -> Result<PendingUpdate, PipelineError> {
        let pending = self.collector.snapshot(id).await?;
        let message = Arc::new(pending.signing_bytes().to_vec());

        let mut join_set = JoinSet::new();
        for org in pending.requirement.required_signers() {
            let credentials = Arc::clone(&self.credentials);
            let collector = Arc::clone(&self.collector);
            let message = Arc::clone(&message);

            join_set.spawn(async move {
                let result = Self::sign_as(&credentials, &collector, id, &org, &message).await;
                (org, result)
            });
        }

        let quorum = self.collector.wait_for_quorum(id);
        tokio::pin!(quorum);

        loop {
            tokio::select! {
                result = &mut quorum => {
                    result?;
                    break;
                }
                Some(joined) = join_set.join_next() => match joined {
                    Ok((org, Ok(_))) => progress.on_signature(id, &org, true),
                    Ok((org, Err(e))) => {
                        warn!("{}: no signature from {}: {}", id, org, e);
                        progress.on_signature(id, &org, false);
                    }
                    Err(e) => warn!("Signer task join error: {}", e),
                },
            }
        }

        // Signers still running past the quorum are not needed
        join_set.abort_all();

        let update = self.collector.take(id).await?;
        info!(
            "{}: quorum met with [{}]",
            id,
            join_orgs(&update.signed_orgs())
        );
        self.audit.log(AuditEvent::new(
            "quorum_met",
            json!({ "update": id, "signers": update.signed_orgs() }),
        ));
        Ok(update)
    }

    async fn sign_as(
        credentials: &C,
        collector: &SignatureCollector,
        id: UpdateId,
        org: &OrgId,
        message: &[u8],
    ) -> Result<SignatureOutcome, SignerFailure> {
        let signer = credentials.signer(org).await?;
        let signature = signer.sign(message).await?;
        Ok(collector.submit_signature(id, org, signature).await?)
    }

    /// Submit a quorum-complete update and interpret the response
    async fn submit(
        &self,
        channel: &ChannelId,
        mut update: PendingUpdate,
        attempt: usize,
        progress: &dyn PipelineProgress,
    ) -> Result<AttemptOutcome, PipelineError> {
        update.transition(UpdateState::Submitted)?;
        let envelope = update.envelope();

        progress.on_submit(update.id);
        self.audit.log(AuditEvent::new(
            "envelope_submitted",
            json!({
                "update": update.id,
                "channel": channel,
                "signers": update.signed_orgs(),
            }),
        ));

        let response = self.submission.submit(&envelope).await;
        progress.on_response(update.id, &response);

        let (reason, info) = match response {
            OrdererResponse::Accepted { sequence } => {
                update.transition(UpdateState::Committed)?;
                self.snapshots.invalidate(channel).await;
                return Ok(AttemptOutcome::Committed(
                    self.committed(channel, update, sequence, attempt),
                ));
            }
            OrdererResponse::Rejected { reason, info } => (reason, info),
        };

        update.transition(UpdateState::Rejected)?;
        warn!("{} rejected: {} ({})", update.id, reason, info);
        self.audit.log(AuditEvent::new(
            "update_rejected",
            json!({ "update": update.id, "channel": channel, "reason": reason, "info": &info }),
        ));

        match reason {
            RejectReason::StaleVersion => {
                self.snapshots.invalidate(channel).await;
                Ok(AttemptOutcome::Stale)
            }
            RejectReason::PolicyUnsatisfied => {
                self.snapshots.invalidate(channel).await;
                let outstanding = self.outstanding_now(channel, &update).await;
                Err(PipelineError::PolicyUnsatisfied {
                    outstanding,
                    reason: info,
                })
            }
            RejectReason::Malformed => Err(PipelineError::Malformed(info)),
            RejectReason::Unavailable => Err(PipelineError::Unavailable(info)),
        }
    }

    /// Signers still missing under the ordering service's current policies
    ///
    /// Falls back to the requirement the update was collected against when
    /// the fresh configuration cannot be evaluated.
    async fn outstanding_now(&self, channel: &ChannelId, update: &PendingUpdate) -> BTreeSet<OrgId> {
        let signed = update.signed_orgs();
        let fresh = match self.snapshots.fetch_current(channel).await {
            Ok(config) => QuorumPolicyEvaluator::evaluate(&config, &update.delta).ok(),
            Err(_) => None,
        };
        match fresh {
            Some(requirement) => requirement.outstanding(&signed),
            None => update.outstanding(),
        }
    }

    fn committed(
        &self,
        channel: &ChannelId,
        update: PendingUpdate,
        sequence: u64,
        attempts: usize,
    ) -> CommittedUpdate {
        info!(
            "{} committed on channel {} at sequence {}",
            update.id, channel, sequence
        );
        if let ProposalKind::ChangeBatchParams(change) = &update.proposal {
            for field in change.changed_fields() {
                info!("{} changed", field);
            }
        }
        self.audit.log(AuditEvent::new(
            "update_committed",
            json!({
                "update": update.id,
                "channel": channel,
                "sequence": sequence,
                "attempts": attempts,
                "signers": update.signed_orgs(),
            }),
        ));

        CommittedUpdate {
            update: update.id,
            channel: channel.clone(),
            signers: update.signed_orgs(),
            proposal: update.proposal,
            sequence,
            attempts,
            delta: update.delta,
        }
    }
}
