//! Channel configuration snapshots

use super::group::ConfigGroup;
use super::path::GroupPath;
use crate::core::ids::{ChannelId, OrgId};
use serde::{Deserialize, Serialize};

/// A channel's complete configuration as observed from the ordering service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel: ChannelId,
    /// Number of configuration updates committed on this channel
    pub sequence: u64,
    /// The `Channel` root group
    pub root: ConfigGroup,
}

impl ChannelConfig {
    pub fn new(channel: impl Into<ChannelId>, root: ConfigGroup) -> Self {
        Self {
            channel: channel.into(),
            sequence: 0,
            root,
        }
    }

    pub fn group(&self, path: &GroupPath) -> Option<&ConfigGroup> {
        self.root.group(path)
    }

    /// Path of an organization's group, if it is a channel member
    pub fn organization_path(&self, org: &OrgId) -> Option<GroupPath> {
        self.root.find_organization_path(&GroupPath::root(), org)
    }

    /// Version of the group at `path`
    pub fn version_of(&self, path: &GroupPath) -> Option<u64> {
        self.group(path).map(|g| g.version)
    }

    /// All member organizations across application and orderer groups
    pub fn organizations(&self) -> Vec<OrgId> {
        self.root
            .organizations()
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }
}
