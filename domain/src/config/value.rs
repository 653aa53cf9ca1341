//! Typed configuration values stored in config groups

use crate::signature::PublicCredential;
use serde::{Deserialize, Serialize};

/// Value key for an organization's MSP definition
pub const MSP_KEY: &str = "MSP";
/// Value key for an application organization's anchor peers
pub const ANCHOR_PEERS_KEY: &str = "AnchorPeers";
/// Value key for the orderer batch size limits
pub const BATCH_SIZE_KEY: &str = "BatchSize";
/// Value key for the orderer batch timeout
pub const BATCH_TIMEOUT_KEY: &str = "BatchTimeout";
/// Value key for the orderer consensus type
pub const CONSENSUS_TYPE_KEY: &str = "ConsensusType";

/// Default batch timeout for a fresh orderer group
pub const DEFAULT_BATCH_TIMEOUT: &str = "2s";

/// A typed value held by a config group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigValue {
    /// Organization identity material
    Msp(MspConfig),
    /// Gossip anchor peers of an application organization
    AnchorPeers { peers: Vec<AnchorPeer> },
    /// Block cutting limits
    BatchSize(BatchSize),
    /// Maximum time to wait before cutting a block (e.g. "2s")
    BatchTimeout { timeout: String },
    /// Ordering consensus implementation (e.g. "etcdraft")
    ConsensusType { kind: String },
}

/// MSP definition of an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MspConfig {
    /// MSP identifier (e.g. "Org1MSP")
    pub msp_id: String,
    /// Admin signing credential; signatures on config updates are verified against it
    pub admin_key: PublicCredential,
    /// PEM encoded root certificates, opaque to this crate
    #[serde(default)]
    pub root_certs: Vec<String>,
}

/// Host and port of an anchor peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorPeer {
    pub host: String,
    pub port: u16,
}

impl AnchorPeer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Orderer block cutting limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSize {
    pub max_message_count: u32,
    pub absolute_max_bytes: u32,
    pub preferred_max_bytes: u32,
}

impl Default for BatchSize {
    fn default() -> Self {
        Self {
            max_message_count: 500,
            absolute_max_bytes: 10 * 1024 * 1024,
            preferred_max_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ConfigValue {
    pub fn as_msp(&self) -> Option<&MspConfig> {
        match self {
            ConfigValue::Msp(msp) => Some(msp),
            _ => None,
        }
    }

    pub fn as_batch_size(&self) -> Option<&BatchSize> {
        match self {
            ConfigValue::BatchSize(size) => Some(size),
            _ => None,
        }
    }

    pub fn as_batch_timeout(&self) -> Option<&str> {
        match self {
            ConfigValue::BatchTimeout { timeout } => Some(timeout),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_default() {
        let size = BatchSize::default();
        assert_eq!(size.max_message_count, 500);
        assert_eq!(size.absolute_max_bytes, 10_485_760);
        assert_eq!(size.preferred_max_bytes, 2_097_152);
    }

    #[test]
    fn test_value_is_tagged() {
        let value = ConfigValue::BatchTimeout {
            timeout: "2s".to_string(),
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "batch_timeout");
        assert_eq!(value.as_batch_timeout(), Some("2s"));
        assert!(value.as_msp().is_none());
    }
}
