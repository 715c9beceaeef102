//! caut - Coding Agent Usage Tracker
//!
//! Daemon entry point: wires credential discovery, the persisted config
//! store, the usage store, the refresh scheduler, and the loopback HTTP
//! service together, then runs until signalled to stop.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::process::ExitCode as ProcessExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use caut::core::config_store::ConfigStore;
use caut::core::http_service::HttpService;
use caut::core::scheduler::RefreshScheduler;
use caut::core::{credential_discovery, logging};
use caut::storage::paths::AppPaths;
use caut::storage::usage_store::UsageStore;
use caut::Result;

/// Preferred HTTP port tried before the fallback range.
const DEFAULT_HTTP_PORT: u16 = 5000;
/// Default interval between refresh ticks.
const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 5;

const HTTP_PORT_ENV: &str = "CAUT_HTTP_PORT";
const REFRESH_INTERVAL_ENV: &str = "CAUT_REFRESH_INTERVAL_MINUTES";

/// Background agent that tracks usage across AI coding services.
#[derive(Parser, Debug)]
#[command(name = "caut", version)]
struct Args {
    /// Raise log verbosity to debug.
    #[arg(long)]
    debug: bool,

    /// Override the scheduler's tick interval, in minutes.
    #[arg(long)]
    refresh_interval_minutes: Option<u64>,
}

#[tokio::main]
async fn main() -> ProcessExitCode {
    let args = Args::parse();

    let log_level = if args.debug {
        logging::LogLevel::Debug
    } else {
        logging::parse_log_level_from_env()
            .map(logging::LogLevel::from_tracing_level)
            .unwrap_or_default()
    };
    let log_format = logging::parse_log_format_from_env().unwrap_or_default();
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, args.debug);

    match run(args).await {
        Ok(()) => ProcessExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "caut exited with an error");
            eprintln!("caut: {e}");
            ProcessExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let paths = AppPaths::new();
    paths.ensure_dirs()?;

    let mut config_store = ConfigStore::load()?;
    if config_store.providers().is_empty() {
        config_store.replace_providers(credential_discovery::discover());
        config_store.save()?;
    }

    let store = Arc::new(UsageStore::open(&paths.history_db_file())?);
    for config in config_store.providers() {
        store.upsert_provider(config, &config.provider_id)?;
    }

    let interval_minutes = args
        .refresh_interval_minutes
        .or_else(|| {
            std::env::var(REFRESH_INTERVAL_ENV)
                .ok()
                .and_then(|v| v.trim().parse().ok())
        })
        .or(config_store
            .preferences()
            .refresh_interval_minutes
            .map(u64::from))
        .unwrap_or(DEFAULT_REFRESH_INTERVAL_MINUTES);
    let interval = Duration::from_secs(interval_minutes.saturating_mul(60).max(1));

    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::clone(&store),
        config_store.providers().to_vec(),
        interval,
    ));

    let preferred_port = std::env::var(HTTP_PORT_ENV)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_HTTP_PORT);

    let config_store = Arc::new(tokio::sync::Mutex::new(config_store));
    let http = Arc::new(HttpService::new(
        Arc::clone(&store),
        Arc::clone(&config_store),
        Arc::clone(&scheduler),
        args.debug,
    ));

    let bound = Arc::clone(&http).serve(preferred_port).await?;
    tracing::info!(addr = %bound.addr, "caut HTTP service bound");

    let scheduler_loop = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            scheduler.run().await;
        })
    };

    shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping scheduler");
    scheduler.stop();
    scheduler_loop.abort();

    Ok(())
}

/// Waits for Ctrl-C (and, on Unix, SIGTERM) so the daemon shuts down
/// cleanly when asked rather than being killed mid-write.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            signal.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
