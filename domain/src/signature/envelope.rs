//! Signed configuration update envelopes

use super::credential::{OrgSignature, SignatureBytes};
use crate::core::error::DomainError;
use crate::core::ids::OrgId;
use crate::delta::ConfigUpdateDelta;
use crate::quorum::QuorumRequirement;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A delta together with the organization signatures endorsing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEnvelope {
    pub delta: ConfigUpdateDelta,
    /// Sorted by organization id
    pub signatures: Vec<OrgSignature>,
}

impl ConfigEnvelope {
    pub fn new(delta: ConfigUpdateDelta, signatures: &BTreeMap<OrgId, SignatureBytes>) -> Self {
        Self {
            delta,
            signatures: signatures
                .iter()
                .map(|(org, signature)| OrgSignature {
                    org: org.clone(),
                    signature: signature.clone(),
                })
                .collect(),
        }
    }

    /// Organizations whose signatures are policy members and verify against
    /// the delta; each organization counts once
    pub fn verified_signers(
        &self,
        requirement: &QuorumRequirement,
    ) -> Result<BTreeSet<OrgId>, DomainError> {
        let message = self.delta.canonical_bytes()?;
        Ok(self
            .signatures
            .iter()
            .filter(|s| {
                requirement
                    .credential(&s.org)
                    .is_some_and(|credential| credential.verify(&message, &s.signature))
            })
            .map(|s| s.org.clone())
            .collect())
    }
}
