//! Ordering service responses

use serde::{Deserialize, Serialize};

/// Why the ordering service refused an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// A read-set version no longer matches the committed configuration
    StaleVersion,
    /// Verified signatures do not satisfy the governing policies
    PolicyUnsatisfied,
    /// The envelope is structurally invalid
    Malformed,
    /// The service could not process the envelope right now
    Unavailable,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::StaleVersion => "STALE_VERSION",
            RejectReason::PolicyUnsatisfied => "POLICY_UNSATISFIED",
            RejectReason::Malformed => "MALFORMED",
            RejectReason::Unavailable => "UNAVAILABLE",
        }
    }

    /// Whether resubmitting the same envelope may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, RejectReason::Unavailable)
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of broadcasting an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrdererResponse {
    /// Committed as configuration `sequence`
    Accepted { sequence: u64 },
    Rejected { reason: RejectReason, info: String },
}

impl OrdererResponse {
    pub fn rejected(reason: RejectReason, info: impl Into<String>) -> Self {
        OrdererResponse::Rejected {
            reason,
            info: info.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, OrdererResponse::Accepted { .. })
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            OrdererResponse::Accepted { .. } => None,
            OrdererResponse::Rejected { reason, .. } => Some(*reason),
        }
    }
}
