//! Entry points that start engine runs.
//!
//! Scheduled jobs and manual requests both go through [`ReminderService`],
//! which serializes runs on one lock and refuses to run until the mail
//! transport has been verified.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::cycle::{CycleRunner, CycleSummary, EngineScope};
use super::dispatcher::{Dispatcher, DEFAULT_DISPATCH_TIMEOUT};
use super::policy::EvaluationPolicy;
use super::prescheduler::{PendingPassSummary, PreScheduler};
use super::{EngineError, EngineResult};
use crate::mail::MailTransport;
use crate::models::{
    PendingSchedule, Template, TemplatePatch, VaccinationEvent, MAX_DAYS_OFFSET,
};
use crate::store::ReminderStore;

/// Who started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Scheduled,
    Manual,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Scheduled => "scheduled",
            TriggerSource::Manual => "manual",
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderSettings {
    pub dispatch_timeout: Duration,
    pub policy: EvaluationPolicy,
    pub engines: Vec<EngineScope>,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            policy: EvaluationPolicy::default(),
            engines: vec![
                EngineScope::new("dog", "dog", "deworming"),
                EngineScope::new("cat", "cat", "deworming"),
            ],
        }
    }
}

/// An engine that failed during a run of every engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineFailure {
    pub engine: String,
    pub error: String,
}

/// Result of running every configured engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAllSummary {
    pub dispatched: usize,
    pub runs: Vec<CycleSummary>,
    pub failures: Vec<EngineFailure>,
}

pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    transport: Arc<dyn MailTransport>,
    runner: CycleRunner,
    prescheduler: PreScheduler,
    engines: Vec<EngineScope>,
    run_lock: Mutex<()>,
    transport_ready: AtomicBool,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        transport: Arc<dyn MailTransport>,
        settings: ReminderSettings,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            transport.clone(),
            settings.dispatch_timeout,
            settings.policy.failed_attempts,
        ));

        Self {
            runner: CycleRunner::new(store.clone(), dispatcher.clone(), settings.policy),
            prescheduler: PreScheduler::new(store.clone(), dispatcher),
            store,
            transport,
            engines: settings.engines,
            run_lock: Mutex::new(()),
            transport_ready: AtomicBool::new(false),
        }
    }

    /// Check the mail transport. Runs are refused until this succeeds.
    pub async fn verify_transport(&self) -> EngineResult<()> {
        match self.transport.verify().await {
            Ok(()) => {
                self.transport_ready.store(true, Ordering::SeqCst);
                info!(transport = self.transport.name(), "mail transport verified");
                Ok(())
            }
            Err(e) => {
                self.transport_ready.store(false, Ordering::SeqCst);
                error!(transport = self.transport.name(), error = %e, "mail transport verification failed");
                Err(e.into())
            }
        }
    }

    pub fn is_transport_ready(&self) -> bool {
        self.transport_ready.load(Ordering::SeqCst)
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    pub fn engines(&self) -> &[EngineScope] {
        &self.engines
    }

    pub fn engine(&self, name: &str) -> Option<&EngineScope> {
        self.engines.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Run one engine now.
    pub async fn run_engine(&self, name: &str, source: TriggerSource) -> EngineResult<CycleSummary> {
        self.run_engine_at(name, source, Utc::now()).await
    }

    /// Run one engine, evaluating conditions as of `now`.
    pub async fn run_engine_at(
        &self,
        name: &str,
        source: TriggerSource,
        now: DateTime<Utc>,
    ) -> EngineResult<CycleSummary> {
        let scope = self
            .engine(name)
            .ok_or_else(|| EngineError::UnknownEngine(name.to_string()))?;
        self.ensure_ready()?;

        let _guard = self.run_lock.lock().await;
        info!(engine = %scope.name, source = source.as_str(), "starting reminder cycle");
        self.runner.run(scope, now).await
    }

    /// Run every configured engine in order. A failing engine does not stop the
    /// others; the first error is returned only when no engine completed.
    pub async fn run_all(&self, source: TriggerSource) -> EngineResult<RunAllSummary> {
        self.ensure_ready()?;

        let _guard = self.run_lock.lock().await;
        let now = Utc::now();
        let mut summary = RunAllSummary {
            dispatched: 0,
            runs: Vec::with_capacity(self.engines.len()),
            failures: Vec::new(),
        };
        let mut first_error = None;

        for scope in &self.engines {
            info!(engine = %scope.name, source = source.as_str(), "starting reminder cycle");
            match self.runner.run(scope, now).await {
                Ok(run) => {
                    summary.dispatched += run.dispatched;
                    summary.runs.push(run);
                }
                Err(e) => {
                    error!(engine = %scope.name, error = %e, "reminder cycle aborted");
                    summary.failures.push(EngineFailure {
                        engine: scope.name.clone(),
                        error: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if summary.runs.is_empty() => Err(e),
            _ => Ok(summary),
        }
    }

    /// Promote pending reminders due today.
    pub async fn run_pending_pass(&self, source: TriggerSource) -> EngineResult<PendingPassSummary> {
        self.run_pending_pass_on(Utc::now().date_naive(), source).await
    }

    pub async fn run_pending_pass_on(
        &self,
        today: NaiveDate,
        source: TriggerSource,
    ) -> EngineResult<PendingPassSummary> {
        self.ensure_ready()?;

        let _guard = self.run_lock.lock().await;
        info!(%today, source = source.as_str(), "starting pending pass");
        self.prescheduler.run_pending_pass(today).await
    }

    /// Schedule reminders for a recorded vaccination.
    pub fn record_vaccination(&self, event: &VaccinationEvent) -> EngineResult<Vec<PendingSchedule>> {
        self.prescheduler.on_vaccination(event)
    }

    /// Apply an admin edit. Waits for any running cycle so templates never
    /// change mid-run.
    pub async fn update_template(&self, id: i64, patch: &TemplatePatch) -> EngineResult<Template> {
        if patch.is_empty() {
            return Err(EngineError::InvalidInput("patch has no fields".into()));
        }
        if patch.subject.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(EngineError::InvalidInput("subject must not be empty".into()));
        }
        if let Some(days) = patch.days_offset {
            if !(0..=MAX_DAYS_OFFSET).contains(&days) {
                return Err(EngineError::InvalidInput(format!(
                    "days_offset must be between 0 and {}",
                    MAX_DAYS_OFFSET
                )));
            }
        }

        let _guard = self.run_lock.lock().await;
        let updated = self
            .store
            .update_template(id, patch)?
            .ok_or(EngineError::TemplateNotFound(id))?;
        info!(template_id = id, "template updated");
        Ok(updated)
    }

    /// Wait for any in-flight run, then release the transport.
    pub async fn shutdown(&self) {
        let _guard = self.run_lock.lock().await;
        self.transport_ready.store(false, Ordering::SeqCst);
        self.transport.shutdown().await;
        info!("reminder service stopped");
    }

    fn ensure_ready(&self) -> EngineResult<()> {
        if self.is_transport_ready() {
            return Ok(());
        }
        warn!("run refused: mail transport not verified");
        Err(EngineError::TransportNotReady)
    }
}
