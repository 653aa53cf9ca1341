//! Quorum policy domain
//!
//! A configuration group names, through its `mod_policy`, the policy that
//! must be satisfied to change it. This module resolves those policies into
//! concrete signer sets and thresholds.
//!
//! # Architecture
//!
//! ```text
//! ConfigUpdateDelta ──> QuorumPolicyEvaluator ──> QuorumRequirement
//!   (write-set)           (current tree only)      ├─ GroupRequirement (Channel/Application)
//!                                                  │    members + threshold
//!                                                  └─ GroupRequirement (...)
//! ```
//!
//! The requirement is satisfied when *every* modified group's threshold is
//! met by distinct member signatures.

pub mod evaluator;
pub mod policy;
pub mod rule;

// Re-export main types
pub use evaluator::{GroupRequirement, QuorumPolicyEvaluator, QuorumRequirement};
pub use policy::{ADMINS_POLICY, ENDORSEMENT_POLICY, Policy, READERS_POLICY, WRITERS_POLICY};
pub use rule::QuorumRule;
