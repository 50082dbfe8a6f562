// # v6aliasd - IPv6 Prefix Alias Daemon
//
// Keeps one firewall alias in sync with the globally routable IPv6 prefix
// of a local interface. This binary is a thin integration layer; all
// reconciliation logic lives in v6alias-core.
//
// The daemon is responsible for:
// 1. Reading and validating the TOML configuration file
// 2. Initializing logging
// 3. Building the OPNsense client and the interface address source
// 4. Checking once that the firewall API is reachable
// 5. Running the scheduler until SIGTERM or SIGINT
//
// ## Usage
//
// ```bash
// v6aliasd --config /usr/local/etc/v6alias.toml
// V6ALIAS_CONFIG=/usr/local/etc/v6alias.toml v6aliasd
// ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::FmtSubscriber;
use v6alias_core::{AppConfig, LoggingConfig, Reconciler, ReconcilerSettings, Scheduler, SyncEvent};
use v6alias_core::traits::AliasClient;
use v6alias_firewall_opnsense::OpnsenseClient;
use v6alias_ip_command::CommandAddressSource;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    StartupError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep a firewall alias in sync with an interface's IPv6 prefix
#[derive(Debug, Parser)]
#[command(name = "v6aliasd", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "V6ALIAS_CONFIG", default_value = "v6alias.toml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::StartupError.into();
        }
    };

    // Held until exit so buffered file output is flushed
    let _log_guard = match init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return DaemonExitCode::StartupError.into();
        }
    };

    info!("Starting v6aliasd");
    info!(
        config = %cli.config.display(),
        alias = %config.sync.alias,
        interface = %config.sync.monitor_iface,
        "Configuration loaded"
    );

    // One cycle at a time, so a single thread is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let scheduler = match start(&config).await {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return DaemonExitCode::StartupError;
            }
        };

        match run_until_shutdown(scheduler).await {
            Ok(()) => {
                info!("Shutting down daemon");
                DaemonExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Build every component and verify the firewall API once
async fn start(config: &AppConfig) -> Result<Scheduler> {
    let client = OpnsenseClient::from_config(&config.firewall)
        .context("cannot create OPNsense client")?;

    info!(host = %config.firewall.host, "Checking firewall API");
    client
        .health_check()
        .await
        .context("initial health check against the firewall API failed")?;
    info!("Firewall API reachable");

    let source = CommandAddressSource::from_config(&config.sync);
    let settings = ReconcilerSettings::from_config(&config.sync);

    let (reconciler, events) = Reconciler::new(Box::new(source), Box::new(client), settings)
        .context("invalid reconciler settings")?;

    tokio::spawn(log_events(events));

    Ok(Scheduler::new(reconciler, config.sync.interval()))
}

/// Run the scheduler until a termination signal arrives
async fn run_until_shutdown(scheduler: Scheduler) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let signals = tokio::spawn(async move {
        let result = wait_for_shutdown().await;
        if let Ok(signal) = &result {
            info!("Received shutdown signal: {}", signal);
        }
        let _ = shutdown_tx.send(());
        result
    });

    scheduler.run_with_shutdown(Some(shutdown_rx)).await?;

    signals.await??;
    Ok(())
}

async fn log_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "Sync event");
    }
}

/// Install the global subscriber, writing to `logging.file` or stderr
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(level);

    match &logging.file {
        Some(path) => {
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .with_context(|| format!("invalid log file path: {}", path.display()))?;
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(&directory)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let subscriber = builder.with_ansi(false).with_writer(writer).finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(Some(guard))
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(None)
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
