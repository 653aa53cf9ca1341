//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod propose_update;
pub mod signature_collector;
pub mod snapshot_store;
pub mod submission;
