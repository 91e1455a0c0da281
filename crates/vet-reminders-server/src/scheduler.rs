//! Cron jobs driving the engines on a fixed daily cadence.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use vet_reminders_core::engine::{ReminderService, TriggerSource};

use crate::config::ServerConfig;

/// Register one job per engine plus the pending pass, and start them.
pub async fn start(config: &ServerConfig, service: Arc<ReminderService>) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await.context("creating scheduler")?;

    for engine in &config.engines {
        let name = engine.name.clone();
        let service = service.clone();
        let job = Job::new_async(engine.cron.as_str(), move |_uuid, _l| {
            let name = name.clone();
            let service = service.clone();
            Box::pin(async move {
                if let Err(e) = service.run_engine(&name, TriggerSource::Scheduled).await {
                    error!(engine = %name, error = %e, "scheduled reminder cycle failed");
                }
            })
        })
        .with_context(|| format!("creating job for engine '{}' (cron {})", engine.name, engine.cron))?;
        sched.add(job).await.context("adding scheduler job")?;
        info!(engine = %engine.name, cron = %engine.cron, "engine scheduled");
    }

    let pending = service.clone();
    let job = Job::new_async(config.pending_cron.as_str(), move |_uuid, _l| {
        let service = pending.clone();
        Box::pin(async move {
            if let Err(e) = service.run_pending_pass(TriggerSource::Scheduled).await {
                error!(error = %e, "scheduled pending pass failed");
            }
        })
    })
    .with_context(|| format!("creating pending pass job (cron {})", config.pending_cron))?;
    sched.add(job).await.context("adding scheduler job")?;
    info!(cron = %config.pending_cron, "pending pass scheduled");

    sched.start().await.context("starting scheduler")?;
    Ok(sched)
}
