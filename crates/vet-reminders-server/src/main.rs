use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use vet_reminders_core::engine::ReminderService;
use vet_reminders_core::mail::build_transport;
use vet_reminders_core::store::SharedDatabase;
use vet_reminders_server::config::ServerConfig;
use vet_reminders_server::state::AppState;
use vet_reminders_server::{build_router, scheduler};

#[derive(Parser)]
#[command(
    name = "vet-reminders",
    about = "Recurring health-reminder engine for pet clinics",
    version
)]
struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(long, env = "VET_REMINDERS_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, env = "VET_REMINDERS_DB")]
    db: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080 (overrides config)
    #[arg(long, env = "VET_REMINDERS_LISTEN")]
    listen: Option<String>,

    /// Serve manual triggers only; do not register cron jobs
    #[arg(long)]
    no_scheduler: bool,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database = db;
    }
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if cli.no_scheduler {
        config.scheduler_enabled = false;
    }

    let db = SharedDatabase::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.display()))?;
    let transport = build_transport(&config.mail)?;
    let service = Arc::new(ReminderService::new(
        Arc::new(db.clone()),
        transport,
        config.reminder_settings(),
    ));

    // Misconfigured mail is fatal: no cycle may run without a verified transport
    service
        .verify_transport()
        .await
        .context("mail transport verification failed")?;

    let mut jobs = if config.scheduler_enabled {
        Some(scheduler::start(&config, service.clone()).await?)
    } else {
        tracing::info!("scheduler disabled, manual triggers only");
        None
    };

    let app = build_router(AppState::new(db, service.clone()));
    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!("vet-reminders listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested");
        })
        .await?;

    if let Some(jobs) = jobs.as_mut() {
        if let Err(e) = jobs.shutdown().await {
            tracing::warn!(error = %e, "scheduler shutdown failed");
        }
    }
    service.shutdown().await;
    Ok(())
}
