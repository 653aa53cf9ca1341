//! Domain layer for chanconf
//!
//! This crate contains the channel configuration model and the pure logic of
//! the configuration update pipeline. It has no dependencies on I/O,
//! runtimes or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Configuration tree
//!
//! A channel's configuration is a tree of versioned [`ConfigGroup`]s rooted at
//! `Channel`. Each group names the policy (`mod_policy`) that must be
//! satisfied to change it.
//!
//! ## Update pipeline
//!
//! ```text
//! ProposalKind ──> DeltaBuilder ──> ConfigUpdateDelta ──> QuorumPolicyEvaluator
//!                                                              │
//!        OrdererResponse <── ConfigEnvelope <── PendingUpdate <─┘
//! ```
//!
//! - **Delta**: minimal read-set/write-set diff between current and target trees
//! - **Quorum**: which organizations must sign, and how many signatures suffice
//! - **Pending update**: signature collection state machine

pub mod config;
pub mod core;
pub mod delta;
pub mod orderer;
pub mod proposal;
pub mod quorum;
pub mod signature;
pub mod update;

// Re-export commonly used types
pub use config::{
    AnchorPeer, BatchSize, ChannelConfig, ChannelTemplate, ConfigGroup, ConfigValue, GroupPath,
    MspConfig,
};
pub use core::{
    error::DomainError,
    ids::{ChannelId, OrgId, join_orgs},
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use delta::{ConfigUpdateDelta, DeltaBuilder, GroupWrite, ReadConflict, apply_delta};
pub use orderer::{OrdererResponse, RejectReason};
pub use proposal::{BatchParamsChange, OrgKind, OrgSpec, ProposalKind};
pub use quorum::{GroupRequirement, Policy, QuorumPolicyEvaluator, QuorumRequirement, QuorumRule};
pub use signature::{ConfigEnvelope, OrgSignature, PublicCredential, SignatureBytes};
pub use update::{PendingUpdate, SignatureOutcome, SignatureRejection, UpdateId, UpdateState};
