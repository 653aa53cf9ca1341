//! CLI command definitions

use chanconf_domain::{AnchorPeer, BatchParamsChange, OrgKind};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for chanconf
#[derive(Parser, Debug)]
#[command(name = "chanconf")]
#[command(author, version, about = "Quorum-signed channel configuration updates")]
#[command(long_about = r#"
chanconf proposes configuration changes to a permissioned ledger channel.

Each change is turned into a minimal read-set/write-set delta, signed by the
organizations whose policies govern the modified groups, and submitted to the
ordering service once a quorum of signatures is collected.

Configuration files are loaded from (in priority order):
1. CHANCONF_* environment variables
2. --config <path>     Explicit config file
3. ./chanconf.toml     Project-level config
4. ~/.config/chanconf/config.toml   Global config

Example:
  chanconf add-org Org4 --channel mychannel
  chanconf remove-org Org3
  chanconf batch --max-message-count 100 --timeout 1s
  chanconf show --output json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format (overrides [output] format)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add an organization to a channel
    AddOrg(AddOrgArgs),
    /// Remove an organization from a channel
    RemoveOrg(RemoveOrgArgs),
    /// Change the orderer batch parameters
    Batch(BatchArgs),
    /// Show a channel's current configuration
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct AddOrgArgs {
    /// Organization id (also its config group name)
    pub org_id: String,

    /// Channel to join
    #[arg(long)]
    pub channel: String,

    /// MSP id; taken from [[organizations]] when omitted
    #[arg(long)]
    pub msp_id: Option<String>,

    /// Which side of the network the organization joins
    #[arg(long, value_parser = parse_org_kind)]
    pub kind: Option<OrgKind>,

    /// Hex-encoded ed25519 admin public key; taken from [[organizations]] when omitted
    #[arg(long, value_name = "HEX")]
    pub admin_key: Option<String>,

    /// Anchor peer as host:port (repeatable)
    #[arg(long = "anchor-peer", value_name = "HOST:PORT", value_parser = parse_anchor_peer)]
    pub anchor_peers: Vec<AnchorPeer>,

    /// Root certificate PEM file (repeatable)
    #[arg(long = "root-cert", value_name = "PATH")]
    pub root_certs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RemoveOrgArgs {
    /// Organization id
    pub org_id: String,

    /// Channel; defaults to [network] default_channel
    #[arg(long)]
    pub channel: Option<String>,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Channel; defaults to [network] default_channel
    #[arg(long)]
    pub channel: Option<String>,

    #[arg(long)]
    pub max_message_count: Option<u32>,

    #[arg(long)]
    pub absolute_max_bytes: Option<u32>,

    #[arg(long)]
    pub preferred_max_bytes: Option<u32>,

    /// Batch timeout, e.g. "2s"
    #[arg(long)]
    pub timeout: Option<String>,
}

impl BatchArgs {
    pub fn to_change(&self) -> BatchParamsChange {
        BatchParamsChange {
            max_message_count: self.max_message_count,
            absolute_max_bytes: self.absolute_max_bytes,
            preferred_max_bytes: self.preferred_max_bytes,
            timeout: self.timeout.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Channel; defaults to [network] default_channel
    #[arg(long)]
    pub channel: Option<String>,
}

fn parse_org_kind(s: &str) -> Result<OrgKind, String> {
    s.parse()
}

fn parse_anchor_peer(s: &str) -> Result<AnchorPeer, String> {
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("'{}' is not host:port", s))?;
    if host.is_empty() {
        return Err(format!("'{}' has an empty host", s));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("'{}' has an invalid port", s))?;
    Ok(AnchorPeer::new(host, port))
}
