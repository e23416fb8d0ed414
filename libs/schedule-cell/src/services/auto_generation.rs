use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;

use crate::services::schedule::ScheduleService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub poll_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: 3600,
        }
    }
}

impl From<&AppConfig> for SchedulerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            enabled: config.auto_generation_enabled,
            poll_interval_seconds: config.auto_generation_interval_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TickOutcome {
    Processed(usize),
    Failed(String),
    /// The previous tick was still running.
    Skipped,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub tick_in_progress: bool,
    pub poll_interval_seconds: u64,
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_processed: Option<usize>,
    pub last_error: Option<String>,
}

/// Background poller for due auto-generation settings.
///
/// Ticks once immediately on start and then every poll interval. A tick
/// runs in its own task, so an error or panic is logged and the loop keeps
/// going. Stopping cancels the wait between ticks; a tick already running
/// completes first.
pub struct AutoGenerationScheduler {
    service: Arc<ScheduleService>,
    config: SchedulerConfig,
    tick_guard: Mutex<()>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    status: RwLock<SchedulerStatus>,
}

impl AutoGenerationScheduler {
    pub fn new(service: Arc<ScheduleService>, config: SchedulerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        let status = SchedulerStatus {
            poll_interval_seconds: config.poll_interval_seconds,
            ..SchedulerStatus::default()
        };

        Self {
            service,
            config,
            tick_guard: Mutex::new(()),
            shutdown,
            handle: Mutex::new(None),
            status: RwLock::new(status),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Starts the polling loop. Returns `false` if it was already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Auto-generation scheduler already running");
            return false;
        }

        self.shutdown.send_replace(false);
        let shutdown_rx = self.shutdown.subscribe();
        let scheduler = Arc::clone(self);

        *handle = Some(tokio::spawn(async move {
            scheduler.run_loop(shutdown_rx).await;
        }));
        self.status.write().await.running = true;

        info!(
            "Auto-generation scheduler started (poll interval {}s)",
            self.config.poll_interval_seconds
        );
        true
    }

    /// Signals the loop to stop and waits for it. Returns `false` if it was
    /// not running.
    pub async fn stop(&self) -> bool {
        let handle = self.handle.lock().await.take();
        let Some(handle) = handle else {
            return false;
        };

        self.shutdown.send_replace(true);
        if let Err(e) = handle.await {
            error!("Auto-generation scheduler task ended abnormally: {}", e);
        }
        self.status.write().await.running = false;

        info!("Auto-generation scheduler stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn status(&self) -> SchedulerStatus {
        let mut status = self.status.read().await.clone();
        status.running = self.is_running().await;
        status
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = Duration::from_secs(self.config.poll_interval_seconds.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Auto-generation scheduler received shutdown signal");
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.run_once(Utc::now()).await;
                }
            }
        }
    }

    /// One poll at `now`, behind the single-flight guard.
    #[instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> TickOutcome {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            warn!("Previous auto-generation tick still running, skipping");
            self.status.write().await.skipped_ticks += 1;
            return TickOutcome::Skipped;
        };

        self.status.write().await.tick_in_progress = true;

        let service = Arc::clone(&self.service);
        let task = tokio::spawn(async move { service.process_due_generations(now).await });

        let outcome = match task.await {
            Ok(Ok(processed)) => {
                info!("Auto-generation tick processed {} setting(s)", processed);
                TickOutcome::Processed(processed)
            }
            Ok(Err(e)) => {
                error!("Auto-generation tick failed: {}", e);
                TickOutcome::Failed(e.to_string())
            }
            Err(e) => {
                error!("Auto-generation tick panicked: {}", e);
                TickOutcome::Failed(format!("tick task aborted: {}", e))
            }
        };

        let mut status = self.status.write().await;
        status.tick_in_progress = false;
        status.ticks += 1;
        status.last_run_at = Some(now);
        match &outcome {
            TickOutcome::Processed(processed) => {
                status.last_processed = Some(*processed);
                status.last_error = None;
            }
            TickOutcome::Failed(message) => {
                status.last_error = Some(message.clone());
            }
            TickOutcome::Skipped => {}
        }

        outcome
    }
}
