//! Application layer for chanconf
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::PipelineParams;
pub use ports::{
    audit_log::{AuditEvent, AuditLogger, NoAuditLogger},
    credentials::{CredentialError, CredentialProvider, SignerIdentity},
    ordering_service::{OrderingError, OrderingService},
    progress::{NoProgress, PipelineProgress},
};
pub use use_cases::propose_update::{CommittedUpdate, PipelineError, ProposeConfigUpdateUseCase};
pub use use_cases::signature_collector::{CollectError, SignatureCollector};
pub use use_cases::snapshot_store::ConfigSnapshotStore;
pub use use_cases::submission::SubmissionCoordinator;
