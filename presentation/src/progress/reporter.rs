//! Progress reporting for the update pipeline

use chanconf_application::{PipelineError, PipelineProgress};
use chanconf_domain::{
    ConfigUpdateDelta, OrdererResponse, OrgId, ProposalKind, QuorumRequirement, UpdateId,
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Reports progress with a spinner counting collected signatures
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::style());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgress for ProgressReporter {
    fn on_attempt_start(&self, proposal: &ProposalKind, attempt: usize) {
        let prefix = if attempt > 1 {
            format!("Attempt {}", attempt)
        } else {
            "Proposing".to_string()
        };
        self.bar.set_prefix(prefix);
        self.bar.set_position(0);
        self.bar.set_message(proposal.describe());
    }

    fn on_delta_built(&self, _delta: &ConfigUpdateDelta, requirement: &QuorumRequirement) {
        self.bar
            .set_length(requirement.required_signers().len() as u64);
        self.bar.set_message("collecting signatures");
    }

    fn on_signature(&self, _update: UpdateId, org: &OrgId, accepted: bool) {
        if accepted {
            self.bar.inc(1);
            self.bar.set_message(format!("{} {}", "v".green(), org));
        } else {
            self.bar.set_message(format!("{} {}", "x".red(), org));
        }
    }

    fn on_submit(&self, update: UpdateId) {
        self.bar.set_message(format!("submitting {}", update));
    }

    fn on_response(&self, _update: UpdateId, response: &OrdererResponse) {
        match response {
            OrdererResponse::Accepted { sequence } => self
                .bar
                .finish_with_message(format!("{} at sequence {}", "accepted".green(), sequence)),
            OrdererResponse::Rejected { reason, .. } => {
                self.bar.set_message(format!("{}", reason.as_str().yellow()))
            }
        }
    }

    fn on_failed(&self, error: &PipelineError) {
        self.bar
            .abandon_with_message(format!("{}", error.kind().red()));
    }
}

/// Line-based progress for non-interactive terminals
pub struct SimpleProgress;

impl PipelineProgress for SimpleProgress {
    fn on_attempt_start(&self, proposal: &ProposalKind, attempt: usize) {
        println!("{} {} (attempt {})", "->".cyan(), proposal.describe().bold(), attempt);
    }

    fn on_delta_built(&self, delta: &ConfigUpdateDelta, requirement: &QuorumRequirement) {
        println!(
            "  delta writes {} group(s); signers: {}",
            delta.write_set.len(),
            chanconf_domain::join_orgs(&requirement.required_signers())
        );
    }

    fn on_signature(&self, _update: UpdateId, org: &OrgId, accepted: bool) {
        if accepted {
            println!("  {} {}", "v".green(), org);
        } else {
            println!("  {} {} (no signature)", "x".red(), org);
        }
    }

    fn on_response(&self, update: UpdateId, response: &OrdererResponse) {
        match response {
            OrdererResponse::Accepted { sequence } => {
                println!("  {} {} at sequence {}", "accepted".green(), update, sequence)
            }
            OrdererResponse::Rejected { reason, info } => {
                println!("  {} {}: {}", reason.as_str().yellow(), update, info)
            }
        }
    }
}
