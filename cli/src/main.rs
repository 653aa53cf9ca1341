//! CLI entrypoint for chanconf
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use chanconf_application::{
    CommittedUpdate, NoProgress, PipelineError, PipelineProgress, ProposeConfigUpdateUseCase,
    SignatureCollector,
};
use chanconf_domain::{ChannelId, OrgId, OrgKind, OrgSpec, ProposalKind, PublicCredential};
use chanconf_infrastructure::{
    ConfigLoader, FileConfig, FileOutputFormat, InMemoryOrderingService, JsonlAuditLogger,
    LocalKeyring, genesis_channels,
};
use chanconf_presentation::{AddOrgArgs, Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type UseCase = ProposeConfigUpdateUseCase<InMemoryOrderingService, LocalKeyring>;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let issues = config.validate();
    if !issues.is_empty() {
        eprint!("{}", ConsoleFormatter::format_issues(&issues));
    }
    if issues.iter().any(|issue| issue.is_error()) {
        bail!("Configuration has errors");
    }

    ConsoleFormatter::set_color(config.output.color);
    let format = cli.output.unwrap_or(match config.output.format {
        Some(FileOutputFormat::Json) => OutputFormat::Json,
        Some(FileOutputFormat::Text) | None => OutputFormat::Text,
    });

    let Some(command) = cli.command else {
        bail!("No command given. Run `chanconf --help` for usage.");
    };

    info!("Starting chanconf");

    // === Dependency Injection ===
    let (channels, genesis_issues) = genesis_channels(&config);
    for issue in &genesis_issues {
        debug!("Genesis skipped: {}", issue.message);
    }
    let orderer = Arc::new(InMemoryOrderingService::with_channels(channels));

    let (keyring, _) = LocalKeyring::from_config(&config);
    debug!("Loaded {} signing key(s)", keyring.len());
    let credentials = Arc::new(keyring);

    let collector = Arc::new(SignatureCollector::new());
    let cancel = CancellationToken::new();
    let sweeper = collector.spawn_sweeper(config.pipeline.sweep_interval(), cancel.clone());

    let mut use_case = ProposeConfigUpdateUseCase::new(
        orderer,
        credentials,
        config.pipeline.to_params(),
    )
    .with_collector(collector);

    if let Some(channel) = config.network.resolved_default_channel() {
        use_case = use_case.with_default_channel(channel);
    }

    if let Some(path) = config.logging.audit_log_path() {
        match JsonlAuditLogger::new(&path) {
            Some(logger) => {
                info!("Audit log: {}", logger.path().display());
                use_case = use_case.with_audit_logger(Arc::new(logger));
            }
            None => warn!("Audit logging disabled"),
        }
    }

    let progress: Box<dyn PipelineProgress> =
        if cli.quiet || format == OutputFormat::Json || !config.output.show_progress {
            Box::new(NoProgress)
        } else {
            Box::new(ProgressReporter::new())
        };

    let outcome = run(&use_case, &config, command, progress.as_ref(), format).await;

    cancel.cancel();
    let _ = sweeper.await;

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(RunError::Pipeline(e)) => {
            match format {
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_error_json(&e)),
                OutputFormat::Text => eprint!("{}", ConsoleFormatter::format_error(&e)),
            }
            Ok(ExitCode::FAILURE)
        }
        Err(RunError::Other(e)) => Err(e),
    }
}

enum RunError {
    Pipeline(PipelineError),
    Other(anyhow::Error),
}

impl From<PipelineError> for RunError {
    fn from(e: PipelineError) -> Self {
        RunError::Pipeline(e)
    }
}

impl From<anyhow::Error> for RunError {
    fn from(e: anyhow::Error) -> Self {
        RunError::Other(e)
    }
}

async fn run(
    use_case: &UseCase,
    config: &FileConfig,
    command: Command,
    progress: &dyn PipelineProgress,
    format: OutputFormat,
) -> Result<(), RunError> {
    let committed = match command {
        Command::Show(args) => {
            let channel = args.channel.map(ChannelId::new);
            let current = use_case.current_config(channel.as_ref()).await?;
            match format {
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_config_json(&current)),
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_config(&current)),
            }
            return Ok(());
        }
        Command::AddOrg(args) => {
            let spec = org_spec(&args, config)?;
            let channel = ChannelId::new(args.channel);
            use_case
                .execute_with_progress(&channel, ProposalKind::AddOrganization(spec), progress)
                .await?
        }
        Command::RemoveOrg(args) => {
            let channel = use_case.resolve_channel(args.channel.map(ChannelId::new).as_ref())?;
            let proposal = ProposalKind::RemoveOrganization {
                org_id: OrgId::new(args.org_id),
            };
            use_case
                .execute_with_progress(&channel, proposal, progress)
                .await?
        }
        Command::Batch(args) => {
            let channel = use_case.resolve_channel(args.channel.clone().map(ChannelId::new).as_ref())?;
            use_case
                .execute_with_progress(
                    &channel,
                    ProposalKind::ChangeBatchParams(args.to_change()),
                    progress,
                )
                .await?
        }
    };

    print_committed(&committed, format);
    Ok(())
}

fn print_committed(committed: &CommittedUpdate, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_committed_json(committed)),
        OutputFormat::Text => print!("{}", ConsoleFormatter::format_committed(committed)),
    }
}

/// Organization definition from the command line, starting from its
/// `[[organizations]]` entry when there is one
fn org_spec(args: &AddOrgArgs, config: &FileConfig) -> Result<OrgSpec> {
    let mut spec = match config.organization(&args.org_id) {
        Some(entry) => entry.to_spec().map_err(|issue| anyhow!(issue.message))?,
        None => {
            let msp_id = args
                .msp_id
                .clone()
                .context("--msp-id is required for an organization not in the configuration")?;
            let key = args
                .admin_key
                .as_deref()
                .context("--admin-key is required for an organization not in the configuration")?;
            OrgSpec::new(
                args.org_id.as_str(),
                msp_id,
                args.kind.unwrap_or(OrgKind::Application),
                PublicCredential::from_hex(key)?,
            )
        }
    };

    if let Some(msp_id) = &args.msp_id {
        spec.msp_id = msp_id.clone();
    }
    if let Some(kind) = args.kind {
        spec.kind = kind;
    }
    if let Some(key) = &args.admin_key {
        spec.admin_key = PublicCredential::from_hex(key)?;
    }
    if !args.anchor_peers.is_empty() {
        spec.anchor_peers = args.anchor_peers.clone();
    }
    for path in &args.root_certs {
        let pem = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read root certificate {}", path.display()))?;
        spec = spec.with_root_cert(pem);
    }

    Ok(spec)
}
