//! Progress notification port
//!
//! Defines the interface for reporting progress through the update pipeline.

use crate::use_cases::propose_update::PipelineError;
use chanconf_domain::{ConfigUpdateDelta, OrgId, OrdererResponse, ProposalKind, QuorumRequirement, UpdateId};

/// Callbacks for pipeline progress
///
/// Implementations live in the presentation layer. Every method has a no-op
/// default so adapters only override what they display.
pub trait PipelineProgress: Send + Sync {
    /// Called at the start of each attempt (1-indexed)
    fn on_attempt_start(&self, _proposal: &ProposalKind, _attempt: usize) {}

    /// Called once the delta and its signature requirement are known
    fn on_delta_built(&self, _delta: &ConfigUpdateDelta, _requirement: &QuorumRequirement) {}

    /// Called for each signer as its signature is accepted or refused
    fn on_signature(&self, _update: UpdateId, _org: &OrgId, _accepted: bool) {}

    /// Called when the quorum is met and the envelope is submitted
    fn on_submit(&self, _update: UpdateId) {}

    /// Called with the ordering service's final response for an attempt
    fn on_response(&self, _update: UpdateId, _response: &OrdererResponse) {}

    /// Called when the pipeline ends with an error
    fn on_failed(&self, _error: &PipelineError) {}
}

/// No-op progress for when progress reporting is not needed
pub struct NoProgress;

impl PipelineProgress for NoProgress {}
