//! Console output formatter for pipeline results

use chanconf_application::{CommittedUpdate, PipelineError};
use chanconf_domain::{ChannelConfig, ConfigGroup, ConfigIssue, GroupPath, ProposalKind, Severity, join_orgs};
use colored::Colorize;
use serde_json::json;

/// Formats pipeline results and channel configurations for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Enable or disable ANSI colors for all subsequent output
    pub fn set_color(enabled: bool) {
        if !enabled {
            colored::control::set_override(false);
        }
    }

    /// Format a committed update
    pub fn format_committed(committed: &CommittedUpdate) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} on channel {} at sequence {}\n",
            "Committed".green().bold(),
            committed.update,
            committed.channel.as_str().cyan(),
            committed.sequence
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Change:".cyan().bold(),
            committed.proposal
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Signed by:".cyan().bold(),
            join_orgs(&committed.signers)
        ));

        let modified: Vec<String> = committed
            .delta
            .modified_paths()
            .map(ToString::to_string)
            .collect();
        let created: Vec<String> = committed
            .delta
            .created_paths()
            .map(ToString::to_string)
            .collect();
        if !modified.is_empty() {
            output.push_str(&format!("{} {}\n", "Modified:".cyan().bold(), modified.join(", ")));
        }
        if !created.is_empty() {
            output.push_str(&format!("{} {}\n", "Created:".cyan().bold(), created.join(", ")));
        }

        if let ProposalKind::ChangeBatchParams(change) = &committed.proposal {
            for field in change.changed_fields() {
                output.push_str(&format!("  * {} changed\n", field));
            }
        }

        if committed.attempts > 1 {
            output.push_str(&format!(
                "{}\n",
                format!("(rebuilt {} time(s) after stale reads)", committed.attempts - 1).dimmed()
            ));
        }

        output
    }

    /// Format a committed update as JSON
    pub fn format_committed_json(committed: &CommittedUpdate) -> String {
        let value = json!({
            "status": "committed",
            "update": committed.update,
            "channel": committed.channel,
            "sequence": committed.sequence,
            "attempts": committed.attempts,
            "proposal": committed.proposal,
            "signers": committed.signers,
            "modified": committed.delta.modified_paths().collect::<Vec<_>>(),
            "created": committed.delta.created_paths().collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format a pipeline failure
    pub fn format_error(error: &PipelineError) -> String {
        let mut output = format!("{} [{}] {}\n", "Failed".red().bold(), error.kind(), error);
        if let Some(outstanding) = error.outstanding()
            && !outstanding.is_empty()
        {
            output.push_str(&format!(
                "{} {}\n",
                "Still needed:".yellow().bold(),
                join_orgs(outstanding)
            ));
        }
        output
    }

    /// Format a pipeline failure as JSON
    pub fn format_error_json(error: &PipelineError) -> String {
        let value = json!({
            "status": "failed",
            "kind": error.kind(),
            "message": error.to_string(),
            "outstanding": error.outstanding(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format a channel configuration as an indented group tree
    pub fn format_config(config: &ChannelConfig) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(&format!(
            "Channel {} (sequence {})",
            config.channel, config.sequence
        )));
        Self::write_group(&mut output, &GroupPath::root(), &config.root, 0);
        output
    }

    /// Format a channel configuration as JSON
    pub fn format_config_json(config: &ChannelConfig) -> String {
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format configuration issues, errors first
    pub fn format_issues(issues: &[ConfigIssue]) -> String {
        let mut sorted: Vec<&ConfigIssue> = issues.iter().collect();
        sorted.sort_by_key(|issue| !issue.is_error());

        sorted
            .into_iter()
            .map(|issue| match issue.severity {
                Severity::Error => format!("{} {}\n", "error:".red().bold(), issue.message),
                Severity::Warning => format!("{} {}\n", "warning:".yellow().bold(), issue.message),
            })
            .collect()
    }

    fn write_group(output: &mut String, path: &GroupPath, group: &ConfigGroup, depth: usize) {
        let indent = "  ".repeat(depth);
        output.push_str(&format!(
            "{}{} {}\n",
            indent,
            path.name().yellow().bold(),
            format!("v{} mod_policy={}", group.version, group.mod_policy).dimmed()
        ));

        if let Some(msp) = group.msp() {
            output.push_str(&format!("{}  msp: {}\n", indent, msp.msp_id));
        }
        if let Some(size) = group.batch_size() {
            output.push_str(&format!(
                "{}  batch size: max_message_count={} absolute_max_bytes={} preferred_max_bytes={}\n",
                indent, size.max_message_count, size.absolute_max_bytes, size.preferred_max_bytes
            ));
        }
        if let Some(timeout) = group.batch_timeout() {
            output.push_str(&format!("{}  batch timeout: {}\n", indent, timeout));
        }
        for (name, policy) in &group.policies {
            output.push_str(&format!("{}  policy {}: {}\n", indent, name, policy));
        }

        for (name, child) in &group.children {
            Self::write_group(output, &path.child(name.clone()), child, depth + 1);
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{}\n{}\n", line.cyan(), title.bold(), line.cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanconf_domain::{
        ChannelTemplate, OrgId, OrgKind, OrgSpec, PublicCredential,
    };
    use std::collections::BTreeSet;

    fn config() -> ChannelConfig {
        ChannelTemplate::new()
            .with_org(OrgSpec::new(
                "Org1",
                "Org1MSP",
                OrgKind::Application,
                PublicCredential::from_bytes([7; 32]),
            ))
            .build("mychannel")
    }

    #[test]
    fn test_format_config_lists_groups() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format_config(&config());
        assert!(output.contains("Channel mychannel (sequence 0)"));
        assert!(output.contains("Application"));
        assert!(output.contains("msp: Org1MSP"));
        assert!(output.contains("batch timeout: 2s"));
    }

    #[test]
    fn test_format_error_shows_outstanding() {
        colored::control::set_override(false);
        let error = PipelineError::CollectionExpired {
            outstanding: BTreeSet::from([OrgId::new("OrgC")]),
        };
        let output = ConsoleFormatter::format_error(&error);
        assert!(output.contains("COLLECTION_EXPIRED"));
        assert!(output.contains("Still needed: OrgC"));

        let json: serde_json::Value =
            serde_json::from_str(&ConsoleFormatter::format_error_json(&error)).unwrap();
        assert_eq!(json["kind"], "COLLECTION_EXPIRED");
        assert_eq!(json["outstanding"][0], "OrgC");
    }

    #[test]
    fn test_format_config_json_round_trips() {
        let config = config();
        let json = ConsoleFormatter::format_config_json(&config);
        let parsed: ChannelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
