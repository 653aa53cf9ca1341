//! Network configuration from TOML (`[network]` section)

use chanconf_domain::{BatchSize, ConfigIssue, ConfigIssueCode, QuorumRule};
use serde::{Deserialize, Serialize};

const VALID_RULES: &[&str] = &["any", "majority", "all", "atleast:N"];

/// Raw network configuration
///
/// # Example
///
/// ```toml
/// [network]
/// default_channel = "mychannel"
///
/// [[network.channels]]
/// name = "mychannel"
/// application_orgs = ["Org1", "Org2", "Org3"]
/// orderer_orgs = ["OrdererOrg"]
/// channel_admins = "majority"
/// application_admins = "majority"
/// orderer_admins = "all"
/// batch_timeout = "2s"
/// max_message_count = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNetworkConfig {
    /// Channel used when a command names none
    pub default_channel: Option<String>,
    pub channels: Vec<FileChannelConfig>,
}

impl FileNetworkConfig {
    pub fn channel(&self, name: &str) -> Option<&FileChannelConfig> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// The configured default channel, or the only channel when there is one
    pub fn resolved_default_channel(&self) -> Option<&str> {
        match (&self.default_channel, self.channels.as_slice()) {
            (Some(name), _) => Some(name.as_str()),
            (None, [only]) => Some(only.name.as_str()),
            _ => None,
        }
    }
}

/// Genesis definition of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChannelConfig {
    pub name: String,
    #[serde(default)]
    pub application_orgs: Vec<String>,
    #[serde(default)]
    pub orderer_orgs: Vec<String>,
    #[serde(default = "default_rule")]
    pub channel_admins: String,
    #[serde(default = "default_rule")]
    pub application_admins: String,
    #[serde(default = "default_rule")]
    pub orderer_admins: String,
    #[serde(default)]
    pub batch_timeout: Option<String>,
    #[serde(default)]
    pub max_message_count: Option<u32>,
    #[serde(default)]
    pub absolute_max_bytes: Option<u32>,
    #[serde(default)]
    pub preferred_max_bytes: Option<u32>,
    #[serde(default)]
    pub consensus: Option<String>,
}

fn default_rule() -> String {
    "majority".to_string()
}

impl FileChannelConfig {
    fn parse_rule(&self, field: &str, value: &str) -> (QuorumRule, Vec<ConfigIssue>) {
        match value.parse::<QuorumRule>() {
            Ok(rule) => (rule, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: format!("network.channels.{}.{}", self.name, field),
                        value: value.to_string(),
                        valid_values: VALID_RULES.iter().map(|s| s.to_string()).collect(),
                    },
                    format!(
                        "network.channels.{}.{}: unknown rule '{}', falling back to 'majority'",
                        self.name, field, value
                    ),
                );
                (QuorumRule::Majority, vec![issue])
            }
        }
    }

    pub fn parse_channel_admins(&self) -> (QuorumRule, Vec<ConfigIssue>) {
        self.parse_rule("channel_admins", &self.channel_admins)
    }

    pub fn parse_application_admins(&self) -> (QuorumRule, Vec<ConfigIssue>) {
        self.parse_rule("application_admins", &self.application_admins)
    }

    pub fn parse_orderer_admins(&self) -> (QuorumRule, Vec<ConfigIssue>) {
        self.parse_rule("orderer_admins", &self.orderer_admins)
    }

    /// Batch size with unset fields taken from the defaults
    pub fn batch_size(&self) -> BatchSize {
        let defaults = BatchSize::default();
        BatchSize {
            max_message_count: self.max_message_count.unwrap_or(defaults.max_message_count),
            absolute_max_bytes: self.absolute_max_bytes.unwrap_or(defaults.absolute_max_bytes),
            preferred_max_bytes: self
                .preferred_max_bytes
                .unwrap_or(defaults.preferred_max_bytes),
        }
    }

    /// Every organization listed on the channel
    pub fn org_ids(&self) -> impl Iterator<Item = &String> {
        self.application_orgs.iter().chain(&self.orderer_orgs)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.parse_channel_admins().1;
        issues.extend(self.parse_application_admins().1);
        issues.extend(self.parse_orderer_admins().1);
        issues
    }
}
