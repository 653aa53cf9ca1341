//! Domain error types

use crate::config::path::GroupPath;
use crate::core::ids::OrgId;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Proposal produces no configuration change")]
    NoChange,

    #[error("Organization '{0}' is not a member of the channel")]
    UnknownOrganization(OrgId),

    #[error("Organization '{0}' already exists with different configuration")]
    OrganizationExists(OrgId),

    #[error("Config group not found: {0}")]
    GroupNotFound(GroupPath),

    #[error("Policy '{policy}' referenced by {path} not found")]
    PolicyNotFound { path: GroupPath, policy: String },

    #[error("Policy '{policy}' names organization '{org}' which has no MSP definition")]
    UnknownPolicyMember { policy: String, org: OrgId },

    #[error("Policy '{policy}' for {path} needs {required} signatures but has {members} members")]
    UnsatisfiablePolicy {
        path: GroupPath,
        policy: String,
        required: usize,
        members: usize,
    },

    #[error("Invalid update state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid delta: {0}")]
    InvalidDelta(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl DomainError {
    /// Check if this error means the proposal was a no-op
    pub fn is_no_change(&self) -> bool {
        matches!(self, DomainError::NoChange)
    }
}
