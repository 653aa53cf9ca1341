//! Genesis channel configurations built from the `[network]` section

use crate::config::{FileChannelConfig, FileConfig};
use chanconf_domain::{ChannelConfig, ChannelTemplate, ConfigIssue, ConfigIssueCode, OrgKind};
use tracing::debug;

/// Build the genesis configuration of every configured channel
///
/// Channels referencing organizations that cannot be built are skipped and
/// reported.
pub fn genesis_channels(config: &FileConfig) -> (Vec<ChannelConfig>, Vec<ConfigIssue>) {
    let mut channels = Vec::new();
    let mut issues = Vec::new();
    for channel in &config.network.channels {
        match genesis_channel(config, channel) {
            Ok(built) => channels.push(built),
            Err(mut found) => issues.append(&mut found),
        }
    }
    (channels, issues)
}

fn genesis_channel(
    config: &FileConfig,
    channel: &FileChannelConfig,
) -> Result<ChannelConfig, Vec<ConfigIssue>> {
    let mut issues = Vec::new();
    let mut template = ChannelTemplate::new()
        .with_channel_admins(channel.parse_channel_admins().0)
        .with_application_admins(channel.parse_application_admins().0)
        .with_orderer_admins(channel.parse_orderer_admins().0)
        .with_batch_size(channel.batch_size());
    if let Some(timeout) = &channel.batch_timeout {
        template = template.with_batch_timeout(timeout.clone());
    }
    if let Some(consensus) = &channel.consensus {
        template = template.with_consensus(consensus.clone());
    }

    let members = channel
        .application_orgs
        .iter()
        .map(|id| (id, OrgKind::Application))
        .chain(channel.orderer_orgs.iter().map(|id| (id, OrgKind::Orderer)));

    for (id, kind) in members {
        let Some(org) = config.organization(id) else {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UndefinedOrganization {
                    channel: channel.name.clone(),
                    org: id.clone(),
                },
                format!(
                    "network.channels.{}: organization '{}' has no [[organizations]] entry",
                    channel.name, id
                ),
            ));
            continue;
        };
        match org.to_spec() {
            Ok(mut spec) => {
                // The channel listing decides which side the org joins
                spec.kind = kind;
                template = template.with_org(spec);
            }
            Err(issue) => issues.push(issue),
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }
    debug!(
        "Genesis for channel {}: {} application org(s), {} orderer org(s)",
        channel.name,
        channel.application_orgs.len(),
        channel.orderer_orgs.len()
    );
    Ok(template.build(channel.name.as_str()))
}
