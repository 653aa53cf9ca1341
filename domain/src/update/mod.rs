//! Pending configuration updates

pub mod pending;

pub use pending::{PendingUpdate, SignatureOutcome, SignatureRejection, UpdateId, UpdateState};
