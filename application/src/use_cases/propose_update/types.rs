//! Type definitions for the ProposeConfigUpdate use case.

use crate::ports::credentials::CredentialError;
use crate::ports::ordering_service::OrderingError;
use crate::use_cases::signature_collector::CollectError;
use chanconf_domain::{
    ChannelId, ConfigUpdateDelta, DomainError, OrgId, ProposalKind, UpdateId, join_orgs,
};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that end an update pipeline run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Proposal produces no configuration change")]
    NoChange,

    #[error("Organization '{0}' is not a member of the channel")]
    UnknownOrganization(OrgId),

    #[error("Organization '{0}' already exists with different configuration")]
    OrganizationExists(OrgId),

    #[error("'{0}' is not a required signer")]
    UnauthorizedSigner(OrgId),

    #[error("'{0}' already signed")]
    DuplicateSignature(OrgId),

    #[error("Signature from '{0}' does not verify")]
    InvalidSignature(OrgId),

    #[error("Read-set still stale after {attempts} attempts")]
    StaleVersion { attempts: usize },

    #[error("Policy unsatisfied: {reason}; outstanding: [{}]", join_orgs(.outstanding))]
    PolicyUnsatisfied {
        outstanding: BTreeSet<OrgId>,
        reason: String,
    },

    #[error("Malformed update: {0}")]
    Malformed(String),

    #[error("Ordering service unavailable: {0}")]
    Unavailable(String),

    #[error("Signature collection expired; outstanding: [{}]", join_orgs(.outstanding))]
    CollectionExpired { outstanding: BTreeSet<OrgId> },

    #[error("No channel given and no default channel configured")]
    NoChannel,
}

impl PipelineError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NoChange => "NO_CHANGE",
            PipelineError::UnknownOrganization(_) => "UNKNOWN_ORGANIZATION",
            PipelineError::OrganizationExists(_) => "ORGANIZATION_EXISTS",
            PipelineError::UnauthorizedSigner(_) => "UNAUTHORIZED_SIGNER",
            PipelineError::DuplicateSignature(_) => "DUPLICATE_SIGNATURE",
            PipelineError::InvalidSignature(_) => "INVALID_SIGNATURE",
            PipelineError::StaleVersion { .. } => "STALE_VERSION",
            PipelineError::PolicyUnsatisfied { .. } => "POLICY_UNSATISFIED",
            PipelineError::Malformed(_) => "MALFORMED",
            PipelineError::Unavailable(_) => "UNAVAILABLE",
            PipelineError::CollectionExpired { .. } => "COLLECTION_EXPIRED",
            PipelineError::NoChannel => "NO_CHANNEL",
        }
    }

    /// Organizations whose signatures were still missing, for quorum failures
    pub fn outstanding(&self) -> Option<&BTreeSet<OrgId>> {
        match self {
            PipelineError::PolicyUnsatisfied { outstanding, .. }
            | PipelineError::CollectionExpired { outstanding } => Some(outstanding),
            _ => None,
        }
    }
}

impl From<DomainError> for PipelineError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NoChange => PipelineError::NoChange,
            DomainError::UnknownOrganization(org) => PipelineError::UnknownOrganization(org),
            DomainError::OrganizationExists(org) => PipelineError::OrganizationExists(org),
            e @ DomainError::UnsatisfiablePolicy { .. } => PipelineError::PolicyUnsatisfied {
                outstanding: BTreeSet::new(),
                reason: e.to_string(),
            },
            other => PipelineError::Malformed(other.to_string()),
        }
    }
}

impl From<CollectError> for PipelineError {
    fn from(e: CollectError) -> Self {
        match e {
            CollectError::UnauthorizedSigner { org, .. } => PipelineError::UnauthorizedSigner(org),
            CollectError::DuplicateSignature { org, .. } => PipelineError::DuplicateSignature(org),
            CollectError::InvalidSignature { org, .. } => PipelineError::InvalidSignature(org),
            CollectError::CollectionExpired { outstanding, .. } => {
                PipelineError::CollectionExpired { outstanding }
            }
            other @ (CollectError::UnknownUpdate(_) | CollectError::UpdateClosed { .. }) => {
                PipelineError::Malformed(other.to_string())
            }
        }
    }
}

impl From<OrderingError> for PipelineError {
    fn from(e: OrderingError) -> Self {
        PipelineError::Unavailable(e.to_string())
    }
}

/// Why a solicited signer did not contribute a signature
#[derive(Error, Debug)]
pub(super) enum SignerFailure {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Rejected(#[from] CollectError),
}

/// A configuration update accepted by the ordering service
#[derive(Debug, Clone, Serialize)]
pub struct CommittedUpdate {
    pub update: UpdateId,
    pub channel: ChannelId,
    pub proposal: ProposalKind,
    /// Configuration sequence assigned by the ordering service
    pub sequence: u64,
    /// Pipeline attempts, counting stale-version restarts
    pub attempts: usize,
    pub delta: ConfigUpdateDelta,
    pub signers: BTreeSet<OrgId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanconf_domain::GroupPath;

    #[test]
    fn test_domain_errors_map_to_pipeline_kinds() {
        assert_eq!(PipelineError::from(DomainError::NoChange).kind(), "NO_CHANGE");
        assert_eq!(
            PipelineError::from(DomainError::UnknownOrganization(OrgId::new("X"))).kind(),
            "UNKNOWN_ORGANIZATION"
        );
        assert_eq!(
            PipelineError::from(DomainError::PolicyNotFound {
                path: GroupPath::application(),
                policy: "/Channel/Nope/Admins".to_string(),
            })
            .kind(),
            "MALFORMED"
        );
        assert_eq!(
            PipelineError::from(DomainError::UnsatisfiablePolicy {
                path: GroupPath::orderer(),
                policy: "Admins".to_string(),
                required: 1,
                members: 0,
            })
            .kind(),
            "POLICY_UNSATISFIED"
        );
    }

    #[test]
    fn test_outstanding_reported_in_message() {
        let err = PipelineError::CollectionExpired {
            outstanding: BTreeSet::from([OrgId::new("OrdC")]),
        };
        assert_eq!(err.kind(), "COLLECTION_EXPIRED");
        assert!(err.to_string().contains("OrdC"));
        assert_eq!(err.outstanding().unwrap().len(), 1);
        assert!(PipelineError::NoChange.outstanding().is_none());
    }
}
