//! Signature collection
//!
//! Pending updates live in an arena keyed by [`UpdateId`]. Every entry has its
//! own lock, so signatures for one update are applied one at a time while
//! different updates proceed in parallel.
//!
//! # Quorum hand-off
//!
//! Each entry holds the sending half of a oneshot channel. The signature
//! that completes the quorum takes the sender while holding the entry lock,
//! so the hand-off to [`SignatureCollector::wait_for_quorum`] fires exactly
//! once no matter how many signers race.

use chanconf_domain::{
    ConfigUpdateDelta, DomainError, OrgId, PendingUpdate, ProposalKind, QuorumRequirement,
    SignatureBytes, SignatureOutcome, SignatureRejection, UpdateId, UpdateState, join_orgs,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Roughly 30 years, used when a collection window overflows `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(window: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(window).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Errors from signature submission and quorum waits
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectError {
    #[error("Unknown update: {0}")]
    UnknownUpdate(UpdateId),

    #[error("'{org}' is not a required signer of {update}")]
    UnauthorizedSigner { update: UpdateId, org: OrgId },

    #[error("'{org}' already signed {update}")]
    DuplicateSignature { update: UpdateId, org: OrgId },

    #[error("Signature from '{org}' does not verify for {update}")]
    InvalidSignature { update: UpdateId, org: OrgId },

    #[error("Collection for {update} expired; outstanding: {}", join_orgs(.outstanding))]
    CollectionExpired {
        update: UpdateId,
        outstanding: BTreeSet<OrgId>,
    },

    #[error("{update} no longer accepts signatures ({state})")]
    UpdateClosed { update: UpdateId, state: UpdateState },
}

struct CollectorEntry {
    update: PendingUpdate,
    deadline: Instant,
    quorum_tx: Option<oneshot::Sender<()>>,
    quorum_rx: Option<oneshot::Receiver<()>>,
}

impl CollectorEntry {
    fn expire(&mut self) -> CollectError {
        if self.update.state() == UpdateState::Collecting {
            // Collecting -> Expired is always allowed
            let _ = self.update.transition(UpdateState::Expired);
        }
        self.quorum_tx = None;
        CollectError::CollectionExpired {
            update: self.update.id,
            outstanding: self.update.outstanding(),
        }
    }
}

/// Arena of pending updates awaiting signatures
pub struct SignatureCollector {
    entries: RwLock<HashMap<UpdateId, Arc<Mutex<CollectorEntry>>>>,
    next_id: AtomicU64,
}

impl Default for SignatureCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureCollector {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn entry(&self, id: UpdateId) -> Result<Arc<Mutex<CollectorEntry>>, CollectError> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(CollectError::UnknownUpdate(id))
    }

    fn remove(&self, id: UpdateId) -> Option<Arc<Mutex<CollectorEntry>>> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
    }

    /// Number of updates currently held
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start collecting signatures for `delta`; the update expires after `window`
    pub fn open(
        &self,
        proposal: ProposalKind,
        delta: ConfigUpdateDelta,
        requirement: QuorumRequirement,
        window: Duration,
    ) -> Result<UpdateId, DomainError> {
        let id = UpdateId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let update = PendingUpdate::new(
            id,
            proposal,
            delta,
            requirement,
            u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
        )?;
        let (quorum_tx, quorum_rx) = oneshot::channel();

        debug!(
            "Opened {} requiring signers [{}]",
            id,
            join_orgs(&update.requirement.required_signers())
        );

        let entry = CollectorEntry {
            update,
            deadline: deadline_after(window),
            quorum_tx: Some(quorum_tx),
            quorum_rx: Some(quorum_rx),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(Mutex::new(entry)));
        Ok(id)
    }

    /// Bytes signers must sign for `id`
    pub async fn signing_bytes(&self, id: UpdateId) -> Result<Vec<u8>, CollectError> {
        let entry = self.entry(id)?;
        let entry = entry.lock().await;
        Ok(entry.update.signing_bytes().to_vec())
    }

    /// Verify and record `org`'s signature for update `id`
    pub async fn submit_signature(
        &self,
        id: UpdateId,
        org: &OrgId,
        signature: SignatureBytes,
    ) -> Result<SignatureOutcome, CollectError> {
        let entry = self.entry(id)?;
        let mut entry = entry.lock().await;

        let state = entry.update.state();
        if state == UpdateState::Expired
            || (state == UpdateState::Collecting && Instant::now() >= entry.deadline)
        {
            return Err(entry.expire());
        }

        match entry.update.record_signature(org, signature) {
            Ok(SignatureOutcome::QuorumReached) => {
                info!("{}: quorum met with signature from {}", id, org);
                if let Some(tx) = entry.quorum_tx.take() {
                    let _ = tx.send(());
                }
                Ok(SignatureOutcome::QuorumReached)
            }
            Ok(SignatureOutcome::Recorded) => {
                debug!("{}: recorded signature from {}", id, org);
                Ok(SignatureOutcome::Recorded)
            }
            Err(SignatureRejection::Unauthorized) => Err(CollectError::UnauthorizedSigner {
                update: id,
                org: org.clone(),
            }),
            Err(SignatureRejection::Duplicate) => Err(CollectError::DuplicateSignature {
                update: id,
                org: org.clone(),
            }),
            Err(SignatureRejection::Invalid) => {
                warn!("{}: signature from {} failed verification", id, org);
                Err(CollectError::InvalidSignature {
                    update: id,
                    org: org.clone(),
                })
            }
            Err(SignatureRejection::NotCollecting(state)) => {
                Err(CollectError::UpdateClosed { update: id, state })
            }
        }
    }

    /// Wait until the quorum is met or the deadline passes
    ///
    /// The hand-off can be awaited once per update.
    pub async fn wait_for_quorum(&self, id: UpdateId) -> Result<(), CollectError> {
        let entry = self.entry(id)?;
        let (rx, deadline) = {
            let mut guard = entry.lock().await;
            let rx = guard.quorum_rx.take().ok_or(CollectError::UpdateClosed {
                update: id,
                state: guard.update.state(),
            })?;
            (rx, guard.deadline)
        };

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(())) => Ok(()),
            // Sender dropped: the update was swept or abandoned
            Ok(Err(_)) => Err(entry.lock().await.expire()),
            Err(_) => {
                let mut guard = entry.lock().await;
                if guard.update.state() == UpdateState::QuorumMet {
                    return Ok(());
                }
                warn!(
                    "{}: collection deadline passed; outstanding [{}]",
                    id,
                    join_orgs(&guard.update.outstanding())
                );
                Err(guard.expire())
            }
        }
    }

    /// Remove update `id` from the arena, handing it to the caller
    pub async fn take(&self, id: UpdateId) -> Result<PendingUpdate, CollectError> {
        let entry = self.remove(id).ok_or(CollectError::UnknownUpdate(id))?;
        let entry = entry.lock().await;
        Ok(entry.update.clone())
    }

    /// Drop update `id`, expiring it if it was still collecting
    pub async fn abandon(&self, id: UpdateId) -> Option<PendingUpdate> {
        let entry = self.remove(id)?;
        let mut entry = entry.lock().await;
        if !entry.update.state().is_terminal() {
            let _ = entry.update.transition(UpdateState::Expired);
        }
        debug!("Abandoned {} in state {}", id, entry.update.state());
        Some(entry.update.clone())
    }

    /// Current view of update `id`
    pub async fn snapshot(&self, id: UpdateId) -> Result<PendingUpdate, CollectError> {
        let entry = self.entry(id)?;
        let entry = entry.lock().await;
        Ok(entry.update.clone())
    }

    /// Remove every update whose deadline has passed without reaching quorum
    ///
    /// Returns the removed update ids.
    pub async fn sweep_expired(&self) -> Vec<UpdateId> {
        let now = Instant::now();
        let candidates: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect();

        let mut swept = Vec::new();
        for (id, entry) in candidates {
            let mut guard = entry.lock().await;
            let stale = matches!(
                guard.update.state(),
                UpdateState::Collecting | UpdateState::Expired
            );
            if stale && now >= guard.deadline {
                guard.expire();
                drop(guard);
                self.remove(id);
                swept.push(id);
            }
        }

        if !swept.is_empty() {
            info!("Swept {} expired update(s)", swept.len());
        }
        swept
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` until
    /// `cancel` fires
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let collector = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Signature sweeper stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        collector.sweep_expired().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanconf_domain::{
        ChannelConfig, ChannelTemplate, DeltaBuilder, OrgKind, OrgSpec, PublicCredential,
        QuorumPolicyEvaluator,
    };
    use ed25519_dalek::{Signer, SigningKey};

    fn key(n: u8) -> SigningKey {
        SigningKey::from_bytes(&[n; 32])
    }

    fn org(name: &str, n: u8) -> OrgSpec {
        OrgSpec::new(
            name,
            format!("{}MSP", name),
            OrgKind::Application,
            PublicCredential::from_verifying_key(&key(n).verifying_key()),
        )
    }

    fn channel() -> ChannelConfig {
        ChannelTemplate::new()
            .with_org(org("Org1", 1))
            .with_org(org("Org2", 2))
            .with_org(org("Org3", 3))
            .with_org(org("Org4", 4))
            .build("mychannel")
    }

    /// Adding Org5 needs 3 of Org1..Org4
    fn open(collector: &SignatureCollector, window: Duration) -> UpdateId {
        let config = channel();
        let proposal = ProposalKind::AddOrganization(org("Org5", 5));
        let delta = DeltaBuilder::build(&config, &proposal).unwrap();
        let requirement = QuorumPolicyEvaluator::evaluate(&config, &delta).unwrap();
        collector.open(proposal, delta, requirement, window).unwrap()
    }

    async fn sign(collector: &SignatureCollector, id: UpdateId, n: u8) -> SignatureBytes {
        let bytes = collector.signing_bytes(id).await.unwrap();
        SignatureBytes::from(key(n).sign(&bytes))
    }

    fn org_id(n: u8) -> OrgId {
        OrgId::new(format!("Org{}", n))
    }

    #[tokio::test]
    async fn test_quorum_hand_off() {
        let collector = SignatureCollector::new();
        let id = open(&collector, Duration::from_secs(60));

        for n in [1, 2, 3] {
            let sig = sign(&collector, id, n).await;
            collector.submit_signature(id, &org_id(n), sig).await.unwrap();
        }

        collector.wait_for_quorum(id).await.unwrap();
        let update = collector.take(id).await.unwrap();
        assert_eq!(update.state(), UpdateState::QuorumMet);
        assert!(collector.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_signers_reach_quorum_once() {
        let collector = Arc::new(SignatureCollector::new());
        let id = open(&collector, Duration::from_secs(60));

        let mut handles = Vec::new();
        for n in [1, 2, 3, 4] {
            let collector = Arc::clone(&collector);
            handles.push(tokio::spawn(async move {
                let sig = sign(&collector, id, n).await;
                collector.submit_signature(id, &org_id(n), sig).await
            }));
        }

        let mut reached = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == SignatureOutcome::QuorumReached {
                reached += 1;
            }
        }

        assert_eq!(reached, 1);
        collector.wait_for_quorum(id).await.unwrap();
        assert_eq!(collector.snapshot(id).await.unwrap().signed_orgs().len(), 4);
    }

    #[tokio::test]
    async fn test_non_member_signature_changes_nothing() {
        let collector = SignatureCollector::new();
        let id = open(&collector, Duration::from_secs(60));

        let sig = sign(&collector, id, 5).await;
        let err = collector.submit_signature(id, &org_id(5), sig).await.unwrap_err();
        assert!(matches!(err, CollectError::UnauthorizedSigner { .. }));

        let update = collector.snapshot(id).await.unwrap();
        assert_eq!(update.state(), UpdateState::Collecting);
        assert!(update.signed_orgs().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_signatures() {
        let collector = SignatureCollector::new();
        let id = open(&collector, Duration::from_secs(60));

        let forged = sign(&collector, id, 9).await;
        assert!(matches!(
            collector.submit_signature(id, &org_id(1), forged).await,
            Err(CollectError::InvalidSignature { .. })
        ));

        let sig = sign(&collector, id, 1).await;
        collector
            .submit_signature(id, &org_id(1), sig.clone())
            .await
            .unwrap();
        assert!(matches!(
            collector.submit_signature(id, &org_id(1), sig).await,
            Err(CollectError::DuplicateSignature { .. })
        ));
        assert_eq!(
            collector.snapshot(id).await.unwrap().state(),
            UpdateState::Collecting
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires_collection() {
        let collector = SignatureCollector::new();
        let id = open(&collector, Duration::from_secs(30));

        let sig = sign(&collector, id, 1).await;
        collector.submit_signature(id, &org_id(1), sig).await.unwrap();

        let err = collector.wait_for_quorum(id).await.unwrap_err();
        match err {
            CollectError::CollectionExpired { outstanding, .. } => {
                assert_eq!(outstanding, BTreeSet::from([org_id(2), org_id(3), org_id(4)]));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Late signatures are refused
        let sig = sign(&collector, id, 2).await;
        assert!(matches!(
            collector.submit_signature(id, &org_id(2), sig).await,
            Err(CollectError::CollectionExpired { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let collector = SignatureCollector::new();
        let short = open(&collector, Duration::from_secs(10));
        let long = open(&collector, Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(11)).await;
        let swept = collector.sweep_expired().await;

        assert_eq!(swept, vec![short]);
        assert!(matches!(
            collector.snapshot(short).await,
            Err(CollectError::UnknownUpdate(_))
        ));
        assert!(collector.snapshot(long).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper_stops_on_cancel() {
        let collector = Arc::new(SignatureCollector::new());
        let id = open(&collector, Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let handle = collector.spawn_sweeper(Duration::from_secs(1), cancel.clone());

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(matches!(
            collector.snapshot(id).await,
            Err(CollectError::UnknownUpdate(_))
        ));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unbounded_window_does_not_overflow() {
        let collector = SignatureCollector::new();
        let id = open(&collector, Duration::from_secs(u64::MAX));

        for n in [1, 2, 3] {
            let sig = sign(&collector, id, n).await;
            collector.submit_signature(id, &org_id(n), sig).await.unwrap();
        }
        collector.wait_for_quorum(id).await.unwrap();

        let update = collector.take(id).await.unwrap();
        assert_eq!(update.state(), UpdateState::QuorumMet);
        assert!(update.deadline_ms >= update.created_at_ms);
    }

    #[tokio::test]
    async fn test_abandon_expires_collecting_update() {
        let collector = SignatureCollector::new();
        let id = open(&collector, Duration::from_secs(60));

        let update = collector.abandon(id).await.unwrap();
        assert_eq!(update.state(), UpdateState::Expired);
        assert!(collector.abandon(id).await.is_none());
    }
}
