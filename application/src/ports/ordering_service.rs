//! Ordering service port
//!
//! Defines how the pipeline reads the committed channel configuration and
//! submits signed update envelopes.

use async_trait::async_trait;
use chanconf_domain::{ChannelConfig, ChannelId, ConfigEnvelope, OrdererResponse};
use thiserror::Error;

/// Transport-level failures talking to the ordering service
///
/// Policy and version rejections are not errors at this level; they come
/// back as [`OrdererResponse::Rejected`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderingError {
    #[error("Channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout")]
    Timeout,
}

/// Gateway to the ordering service
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait OrderingService: Send + Sync {
    /// Fetch the latest committed configuration of `channel`
    async fn fetch_config(&self, channel: &ChannelId) -> Result<ChannelConfig, OrderingError>;

    /// Submit a signed configuration update
    async fn broadcast(&self, envelope: &ConfigEnvelope) -> Result<OrdererResponse, OrderingError>;
}
