//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod audit_log;
pub mod credentials;
pub mod ordering_service;
pub mod progress;
