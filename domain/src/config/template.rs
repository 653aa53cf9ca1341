//! Genesis configuration templates
//!
//! Builds the initial [`ChannelConfig`] of a channel from a list of member
//! organizations. Organization groups are produced by
//! [`OrgSpec::to_group`](crate::proposal::OrgSpec::to_group), so a genesis
//! member and an organization added later have identical structure.

use super::channel::ChannelConfig;
use super::group::ConfigGroup;
use super::path::{APPLICATION_GROUP, ORDERER_GROUP};
use super::value::{
    BATCH_SIZE_KEY, BATCH_TIMEOUT_KEY, BatchSize, CONSENSUS_TYPE_KEY, ConfigValue,
    DEFAULT_BATCH_TIMEOUT,
};
use crate::core::ids::ChannelId;
use crate::proposal::{OrgKind, OrgSpec};
use crate::quorum::{ADMINS_POLICY, Policy, QuorumRule, READERS_POLICY, WRITERS_POLICY};

/// Builder for a channel's genesis configuration
#[derive(Debug, Clone)]
pub struct ChannelTemplate {
    orgs: Vec<OrgSpec>,
    channel_admins: QuorumRule,
    application_admins: QuorumRule,
    orderer_admins: QuorumRule,
    batch_size: BatchSize,
    batch_timeout: String,
    consensus: String,
}

impl Default for ChannelTemplate {
    fn default() -> Self {
        Self {
            orgs: Vec::new(),
            channel_admins: QuorumRule::Majority,
            application_admins: QuorumRule::Majority,
            orderer_admins: QuorumRule::Majority,
            batch_size: BatchSize::default(),
            batch_timeout: DEFAULT_BATCH_TIMEOUT.to_string(),
            consensus: "etcdraft".to_string(),
        }
    }
}

impl ChannelTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org(mut self, org: OrgSpec) -> Self {
        self.orgs.push(org);
        self
    }

    pub fn with_channel_admins(mut self, rule: QuorumRule) -> Self {
        self.channel_admins = rule;
        self
    }

    pub fn with_application_admins(mut self, rule: QuorumRule) -> Self {
        self.application_admins = rule;
        self
    }

    pub fn with_orderer_admins(mut self, rule: QuorumRule) -> Self {
        self.orderer_admins = rule;
        self
    }

    pub fn with_batch_size(mut self, batch_size: BatchSize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.batch_timeout = timeout.into();
        self
    }

    pub fn with_consensus(mut self, consensus: impl Into<String>) -> Self {
        self.consensus = consensus.into();
        self
    }

    /// Build the genesis configuration (sequence 0, every group at version 0)
    pub fn build(&self, channel: impl Into<ChannelId>) -> ChannelConfig {
        let mut application = Self::container(self.application_admins);
        let mut orderer = Self::container(self.orderer_admins)
            .with_value(BATCH_SIZE_KEY, ConfigValue::BatchSize(self.batch_size))
            .with_value(
                BATCH_TIMEOUT_KEY,
                ConfigValue::BatchTimeout {
                    timeout: self.batch_timeout.clone(),
                },
            )
            .with_value(
                CONSENSUS_TYPE_KEY,
                ConfigValue::ConsensusType {
                    kind: self.consensus.clone(),
                },
            );

        for org in &self.orgs {
            let parent = match org.kind {
                OrgKind::Application => &mut application,
                OrgKind::Orderer => &mut orderer,
            };
            parent
                .children
                .insert(org.org_id.as_str().to_string(), org.to_group());
        }

        let root = Self::container(self.channel_admins)
            .with_child(APPLICATION_GROUP, application)
            .with_child(ORDERER_GROUP, orderer);

        ChannelConfig::new(channel, root)
    }

    fn container(admins: QuorumRule) -> ConfigGroup {
        ConfigGroup::new(ADMINS_POLICY)
            .with_policy(ADMINS_POLICY, Policy::implicit_meta(admins))
            .with_policy(READERS_POLICY, Policy::implicit_meta(QuorumRule::Any))
            .with_policy(WRITERS_POLICY, Policy::implicit_meta(QuorumRule::Any))
    }
}
