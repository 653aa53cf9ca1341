//! Pending update state machine
//!
//! # State Transitions
//!
//! ```text
//! Collecting ──> QuorumMet ──> Submitted ──> Committed
//!     │              │                  └──> Rejected
//!     └──────────────┴──> Expired
//! ```
//!
//! Signatures are accepted while `Collecting` or `QuorumMet`; the transition
//! to `QuorumMet` happens at most once.

use crate::core::error::DomainError;
use crate::core::ids::OrgId;
use crate::delta::ConfigUpdateDelta;
use crate::proposal::ProposalKind;
use crate::quorum::QuorumRequirement;
use crate::signature::{ConfigEnvelope, SignatureBytes};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifier of a pending update, unique within one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpdateId(u64);

impl UpdateId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "update-{}", self.0)
    }
}

/// Lifecycle state of a pending update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    Collecting,
    QuorumMet,
    Submitted,
    Committed,
    Rejected,
    Expired,
}

impl UpdateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateState::Collecting => "collecting",
            UpdateState::QuorumMet => "quorum_met",
            UpdateState::Submitted => "submitted",
            UpdateState::Committed => "committed",
            UpdateState::Rejected => "rejected",
            UpdateState::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UpdateState::Committed | UpdateState::Rejected | UpdateState::Expired
        )
    }

    /// Whether new signatures may still be recorded
    pub fn accepts_signatures(&self) -> bool {
        matches!(self, UpdateState::Collecting | UpdateState::QuorumMet)
    }

    pub fn can_transition_to(&self, next: UpdateState) -> bool {
        use UpdateState::*;
        matches!(
            (self, next),
            (Collecting, QuorumMet)
                | (Collecting, Expired)
                | (QuorumMet, Submitted)
                | (QuorumMet, Expired)
                | (Submitted, Committed)
                | (Submitted, Rejected)
        )
    }
}

impl std::fmt::Display for UpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Successful outcome of recording a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureOutcome {
    /// Recorded; the quorum state did not change
    Recorded,
    /// Recorded, and this signature completed the quorum
    QuorumReached,
}

/// Why a signature was not recorded; the update is left unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRejection {
    /// The signer is not a member of any governing policy
    Unauthorized,
    /// The signer already signed
    Duplicate,
    /// The signature does not verify against the signer's credential
    Invalid,
    /// The update no longer accepts signatures
    NotCollecting(UpdateState),
}

/// A configuration update awaiting signatures and submission
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub id: UpdateId,
    pub proposal: ProposalKind,
    pub delta: ConfigUpdateDelta,
    pub requirement: QuorumRequirement,
    /// Bytes every signer signs
    signing_bytes: Vec<u8>,
    collected: BTreeMap<OrgId, SignatureBytes>,
    pub created_at_ms: u64,
    pub deadline_ms: u64,
    state: UpdateState,
}

impl PendingUpdate {
    /// Open a new update in `Collecting`, due `window_ms` from now
    pub fn new(
        id: UpdateId,
        proposal: ProposalKind,
        delta: ConfigUpdateDelta,
        requirement: QuorumRequirement,
        window_ms: u64,
    ) -> Result<Self, DomainError> {
        let signing_bytes = delta.canonical_bytes()?;
        let created_at_ms = current_timestamp();
        Ok(Self {
            id,
            proposal,
            delta,
            requirement,
            signing_bytes,
            collected: BTreeMap::new(),
            created_at_ms,
            deadline_ms: created_at_ms.saturating_add(window_ms),
            state: UpdateState::Collecting,
        })
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn signing_bytes(&self) -> &[u8] {
        &self.signing_bytes
    }

    /// Verify and record `org`'s signature
    pub fn record_signature(
        &mut self,
        org: &OrgId,
        signature: SignatureBytes,
    ) -> Result<SignatureOutcome, SignatureRejection> {
        if !self.state.accepts_signatures() {
            return Err(SignatureRejection::NotCollecting(self.state));
        }
        let Some(credential) = self.requirement.credential(org) else {
            return Err(SignatureRejection::Unauthorized);
        };
        if self.collected.contains_key(org) {
            return Err(SignatureRejection::Duplicate);
        }
        if !credential.verify(&self.signing_bytes, &signature) {
            return Err(SignatureRejection::Invalid);
        }

        self.collected.insert(org.clone(), signature);

        if self.state == UpdateState::Collecting && self.requirement.is_satisfied(&self.signed_orgs()) {
            self.state = UpdateState::QuorumMet;
            return Ok(SignatureOutcome::QuorumReached);
        }
        Ok(SignatureOutcome::Recorded)
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: UpdateState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn signed_orgs(&self) -> BTreeSet<OrgId> {
        self.collected.keys().cloned().collect()
    }

    /// Required signers that have not signed yet
    pub fn outstanding(&self) -> BTreeSet<OrgId> {
        self.requirement.outstanding(&self.signed_orgs())
    }

    pub fn is_quorum_met(&self) -> bool {
        self.requirement.is_satisfied(&self.signed_orgs())
    }

    /// The signed envelope submitted to the ordering service
    pub fn envelope(&self) -> ConfigEnvelope {
        ConfigEnvelope::new(self.delta.clone(), &self.collected)
    }
}

/// Get current timestamp in milliseconds.
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelTemplate;
    use crate::delta::DeltaBuilder;
    use crate::proposal::{OrgKind, OrgSpec};
    use crate::quorum::QuorumPolicyEvaluator;
    use crate::signature::PublicCredential;
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

    /// Four application orgs, majority (3 of 4) to add a fifth
    fn pending() -> PendingUpdate {
        let config = ChannelTemplate::new()
            .with_org(org("Org1", 1))
            .with_org(org("Org2", 2))
            .with_org(org("Org3", 3))
            .with_org(org("Org4", 4))
            .build("mychannel");
        let proposal = ProposalKind::AddOrganization(org("Org5", 5));
        let delta = DeltaBuilder::build(&config, &proposal).unwrap();
        let requirement = QuorumPolicyEvaluator::evaluate(&config, &delta).unwrap();
        PendingUpdate::new(UpdateId::new(1), proposal, delta, requirement, 60_000).unwrap()
    }

    fn sign(update: &PendingUpdate, n: u8) -> SignatureBytes {
        SignatureBytes::from(key(n).sign(update.signing_bytes()))
    }

    #[test]
    fn test_new_is_collecting() {
        let update = pending();
        assert_eq!(update.state(), UpdateState::Collecting);
        assert_eq!(update.outstanding().len(), 4);
        assert!(update.deadline_ms >= update.created_at_ms);
        assert_eq!(update.id.to_string(), "update-1");
    }

    #[test]
    fn test_quorum_reached_exactly_once() {
        let mut update = pending();

        let sig = sign(&update, 1);
        assert_eq!(
            update.record_signature(&OrgId::new("Org1"), sig),
            Ok(SignatureOutcome::Recorded)
        );
        let sig = sign(&update, 2);
        assert_eq!(
            update.record_signature(&OrgId::new("Org2"), sig),
            Ok(SignatureOutcome::Recorded)
        );
        let sig = sign(&update, 3);
        assert_eq!(
            update.record_signature(&OrgId::new("Org3"), sig),
            Ok(SignatureOutcome::QuorumReached)
        );
        assert_eq!(update.state(), UpdateState::QuorumMet);

        // A late signature is still recorded but does not re-fire
        let sig = sign(&update, 4);
        assert_eq!(
            update.record_signature(&OrgId::new("Org4"), sig),
            Ok(SignatureOutcome::Recorded)
        );
        assert_eq!(update.state(), UpdateState::QuorumMet);
        assert!(update.outstanding().is_empty());
    }

    #[test]
    fn test_rejections_leave_state_unchanged() {
        let mut update = pending();

        // The org being added is not a signer for its own admission
        let sig = sign(&update, 5);
        assert_eq!(
            update.record_signature(&OrgId::new("Org5"), sig),
            Err(SignatureRejection::Unauthorized)
        );

        // Org1 signing with Org2's key
        let forged = sign(&update, 2);
        assert_eq!(
            update.record_signature(&OrgId::new("Org1"), forged),
            Err(SignatureRejection::Invalid)
        );

        let sig = sign(&update, 1);
        update.record_signature(&OrgId::new("Org1"), sig.clone()).unwrap();
        assert_eq!(
            update.record_signature(&OrgId::new("Org1"), sig),
            Err(SignatureRejection::Duplicate)
        );

        assert_eq!(update.state(), UpdateState::Collecting);
        assert_eq!(update.signed_orgs().len(), 1);
    }

    #[test]
    fn test_expired_update_rejects_signatures() {
        let mut update = pending();
        update.transition(UpdateState::Expired).unwrap();

        let sig = sign(&update, 1);
        assert_eq!(
            update.record_signature(&OrgId::new("Org1"), sig),
            Err(SignatureRejection::NotCollecting(UpdateState::Expired))
        );
    }

    #[test]
    fn test_transitions() {
        let mut update = pending();
        assert!(update.transition(UpdateState::Submitted).is_err());

        for n in [1, 2, 3] {
            let sig = sign(&update, n);
            update
                .record_signature(&OrgId::new(format!("Org{}", n)), sig)
                .unwrap();
        }
        update.transition(UpdateState::Submitted).unwrap();
        update.transition(UpdateState::Committed).unwrap();
        assert!(update.state().is_terminal());
        assert!(matches!(
            update.transition(UpdateState::Rejected),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_envelope_carries_sorted_signatures() {
        let mut update = pending();
        for n in [3, 1, 2] {
            let sig = sign(&update, n);
            update
                .record_signature(&OrgId::new(format!("Org{}", n)), sig)
                .unwrap();
        }

        let envelope = update.envelope();
        let orgs: Vec<_> = envelope.signatures.iter().map(|s| s.org.as_str()).collect();
        assert_eq!(orgs, vec!["Org1", "Org2", "Org3"]);
        assert_eq!(
            envelope.verified_signers(&update.requirement).unwrap().len(),
            3
        );
    }
}
