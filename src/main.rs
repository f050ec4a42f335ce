//! SessionGate - account and session server

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sessiongate::{
    api::{ApiServer, AppState},
    auth::{AuthService, PasswordHasher, SessionManager, SqliteCredentialStore},
    config::ConfigManager,
    metrics::Metrics,
    shutdown::spawn_session_purger,
    ShutdownCoordinator,
};

/// CLI arguments for SessionGate
#[derive(Parser, Debug)]
#[command(name = "sessiongate")]
#[command(about = "SessionGate - account registration, login and session server")]
#[command(version)]
#[command(long_about = "
SessionGate - account registration, login and session server

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  SESSIONGATE_BIND_ADDR              - Bind address (e.g., 127.0.0.1:5000)
  SESSIONGATE_DATABASE               - SQLite database path (or :memory:)
  SESSIONGATE_SESSION_IDLE_TIMEOUT   - Session idle timeout (e.g., 30m)
  SESSIONGATE_HASH_MEMORY_KIB        - Argon2 memory cost in KiB
  SESSIONGATE_HASH_ITERATIONS        - Argon2 iteration count
  SESSIONGATE_CONCEAL_UNKNOWN_USERS  - Report unknown users as bad credentials
  SESSIONGATE_LOG_LEVEL              - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "sessiongate.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 127.0.0.1:5000)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Database path (overrides config file)
    #[arg(short, long, help = "SQLite database path")]
    pub database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level (defaults to monitoring.log_level)")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let config_from_file = args.config.exists();
    let mut config = if config_from_file {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    init_tracing(&args, &config.monitoring.log_level)?;

    info!("Starting SessionGate v{}", env!("CARGO_PKG_VERSION"));
    if config_from_file {
        info!("Configuration loaded from {}", args.config.display());
    } else {
        info!("Config file not found, using environment variables and defaults");
    }

    // Apply CLI argument overrides (highest priority)
    config.merge_with_cli_args(args.bind.as_deref(), args.port, args.database.as_deref());

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  Database: {}", config.storage.database_path.display());
        info!(
            "  Hashing: m={} KiB, t={}, p={}",
            config.hashing.memory_kib, config.hashing.iterations, config.hashing.parallelism
        );
        match config.sessions.idle_timeout {
            Some(timeout) => info!("  Session idle timeout: {:?}", timeout),
            None => info!("  Session idle timeout: none"),
        }
        info!(
            "  Conceal unknown users: {}",
            config.policy.conceal_unknown_users
        );
        return Ok(());
    }

    let store = SqliteCredentialStore::open(&config.storage.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.storage.database_path.display()
        )
    })?;
    let hasher = PasswordHasher::new(&config.hashing).context("Invalid hashing parameters")?;
    let sessions = Arc::new(SessionManager::new(config.sessions.idle_timeout));

    let auth = AuthService::new(
        Arc::new(store),
        hasher,
        Arc::clone(&sessions),
        config.policy.clone(),
    );
    let metrics = Arc::new(Metrics::new().context("Failed to create metrics registry")?);
    let state = AppState::new(auth, metrics, config.monitoring.metrics_enabled);

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let purger = config.sessions.idle_timeout.map(|_| {
        spawn_session_purger(
            &shutdown_coordinator,
            Arc::clone(&sessions),
            config.sessions.purge_interval,
        )
    });

    let server = ApiServer::new(config.server.bind_addr, state);
    let mut server_handle = tokio::spawn(server.start(shutdown_coordinator.signal()));

    info!("SessionGate started, press Ctrl+C or send SIGTERM to stop");

    tokio::select! {
        result = shutdown_coordinator.listen_for_signals() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
            }
        }
        result = &mut server_handle => {
            // Server exited on its own; make sure the rest stops too.
            shutdown_coordinator.trigger();
            return match result {
                Ok(inner) => inner,
                Err(e) => Err(anyhow::anyhow!("API server task failed: {}", e)),
            };
        }
    }

    info!("Initiating graceful shutdown...");
    let timeout = shutdown_coordinator.timeout();

    match tokio::time::timeout(timeout, &mut server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("API server error during shutdown: {}", e),
        Ok(Err(e)) => error!("API server task failed: {}", e),
        Err(_) => {
            error!("API server did not drain within {:?}, aborting", timeout);
            server_handle.abort();
        }
    }

    if let Some(purger) = purger {
        purger.join(timeout).await?;
    }

    shutdown_coordinator.close_sessions(&sessions);
    info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, configured_level: &str) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or(configured_level)
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
