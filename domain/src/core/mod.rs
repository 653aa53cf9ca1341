//! Core domain concepts shared across all subdomains.
//!
//! - [`ids::ChannelId`] / [`ids::OrgId`]: channel and organization identifiers
//! - [`error::DomainError`]: domain-level errors
//! - [`validation::ConfigIssue`]: structured configuration findings

pub mod error;
pub mod ids;
pub mod validation;
