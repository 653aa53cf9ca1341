//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to domain types on demand.

mod logging;
mod network;
mod organizations;
mod output;
mod pipeline;

pub use logging::FileLoggingConfig;
pub use network::{FileChannelConfig, FileNetworkConfig};
pub use organizations::FileOrganization;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use pipeline::FilePipelineConfig;

use chanconf_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Timeouts, retry bounds and backoff
    pub pipeline: FilePipelineConfig,
    /// Channels and their genesis policies
    pub network: FileNetworkConfig,
    /// Organization identities and signing material
    pub organizations: Vec<FileOrganization>,
    /// Audit log settings
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    pub fn organization(&self, id: &str) -> Option<&FileOrganization> {
        self.organizations.iter().find(|o| o.id == id)
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// It checks:
    /// 1. Each organization entry (kind, seed, anchor peers)
    /// 2. Duplicate organization ids
    /// 3. Channel policy rules and references to undefined organizations
    /// 4. The default channel exists
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        // 1. Organization entries
        for org in &self.organizations {
            issues.extend(org.validate());
        }

        // 2. Duplicate ids
        let mut seen = BTreeSet::new();
        for org in &self.organizations {
            if !seen.insert(org.id.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateOrganization { org: org.id.clone() },
                    format!("organizations: '{}' is defined more than once", org.id),
                ));
            }
        }

        // 3. Channels
        for channel in &self.network.channels {
            issues.extend(channel.validate());
            for org in channel.org_ids() {
                if !seen.contains(org.as_str()) {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::UndefinedOrganization {
                            channel: channel.name.clone(),
                            org: org.clone(),
                        },
                        format!(
                            "network.channels.{}: organization '{}' has no [[organizations]] entry",
                            channel.name, org
                        ),
                    ));
                }
            }
        }

        // 4. Default channel
        if let Some(name) = &self.network.default_channel
            && self.network.channel(name).is_none()
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownDefaultChannel {
                    channel: name.clone(),
                },
                format!("network.default_channel: channel '{}' is not defined", name),
            ));
        }

        issues
    }
}
