use anyhow::Result;
use azavset::azure::auth::Credentials;
use azavset::azure::client::AzureClient;
use azavset::azure::http::format_azure_error;
use azavset::config::Config;
use azavset::runner::{CleanupOutcome, ListScope, ProvisionPlan, Runner};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Provision, tag, list and tear down Azure availability sets
#[derive(Parser, Debug)]
#[command(name = "azavset", version, about, long_about = None)]
struct Args {
    /// Azure region to create resources in
    #[arg(short, long)]
    location: Option<String>,

    /// Prefix for the generated resource group name
    #[arg(long)]
    group_prefix: Option<String>,

    /// Availability zone the first VM is pinned to (empty to disable)
    #[arg(long)]
    zone: Option<String>,

    /// Where to enumerate availability sets
    #[arg(long, value_enum, default_value = "group")]
    list_scope: Scope,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Persist location, group prefix and zone to the config file
    #[arg(long)]
    save_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scope {
    Group,
    Subscription,
}

impl From<Scope> for ListScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Group => ListScope::Group,
            Scope::Subscription => ListScope::Subscription,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str().to_ascii_lowercase()));

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Cannot open log file {:?}: {}, logging to stderr", path, e);
                None
            }
        }
    });

    let guard = match file {
        Some(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            None
        }
    };

    tracing::info!("azavset {} started with log level: {:?}", azavset::VERSION, level);
    if let Some(path) = log_file {
        tracing::info!("Log file: {:?}", path);
    }

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_deref());

    let mut config = Config::load();
    if let Some(location) = &args.location {
        config.location = Some(location.clone());
    }
    if let Some(prefix) = &args.group_prefix {
        config.group_prefix = Some(prefix.clone());
    }
    if let Some(zone) = &args.zone {
        config.zone = Some(zone.clone());
    }

    if args.save_config {
        match config.save() {
            Ok(()) => tracing::info!("Configuration saved to {:?}", Config::config_path()),
            Err(e) => tracing::warn!("Failed to save configuration: {:#}", e),
        }
    }

    // Outcome is reported through logs only; the exit status stays zero
    if let Err(err) = run(&config, args.list_scope.into()).await {
        tracing::error!("{:#}", err);
        eprintln!("Error: {}", format_azure_error(&err));
    }

    Ok(())
}

async fn run(config: &Config, list_scope: ListScope) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let client = AzureClient::new(credentials, &config.endpoints()?, config.poll_settings())?;

    let mut plan = ProvisionPlan::from_config(config).with_list_scope(list_scope);
    if let Some(password) = std::env::var("VM_ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()) {
        plan = plan.with_admin_password(password);
    }

    tracing::info!(
        "Using location: {}, resource group: {}",
        plan.location,
        plan.group_name
    );

    let mut runner = Runner::new(client, plan);
    let report = runner.run().await?;

    let elapsed = report.finished_at - report.started_at;
    tracing::info!(
        "Run finished in {}s: {} resources created, {} availability sets listed",
        elapsed.num_seconds(),
        report.created.len(),
        report.listed.len()
    );
    if let CleanupOutcome::Failed(reason) = &report.cleanup {
        tracing::warn!(
            "Resource group '{}' may still exist: {}",
            report.group_name,
            reason
        );
    }

    Ok(())
}
