//! Evolution scheduler — a background loop that runs gated cycles.
//!
//! The loop wakes every `tick`, checks the stop flag, asks the [`CycleGate`]
//! whether a cycle may start, and runs it. Cycles are serialized by an
//! internal lock, so a forced cycle never overlaps a background one.

use autoforge_config::EvolutionConfig;
use autoforge_core::error::{SchedulerError, StoreError};
use autoforge_core::event::{DomainEvent, EventBus};
use autoforge_core::record::EvolutionCycle;
use autoforge_core::search::SearchProvider;
use autoforge_core::store::{EVOLUTION_CYCLES, RecordFilter, RecordStore};
use autoforge_pipeline::{ConstructionPipeline, History};
use autoforge_store::{DEFAULT_WRITE_TIMEOUT, InMemoryStore, append_within};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cycle::CycleRunner;
use crate::gate::{CycleGate, GateDecision};

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub total_cycles: usize,
    pub last_cycle: Option<Arc<EvolutionCycle>>,
    /// Until the gate would admit the next scheduled cycle; `None` while
    /// stopped.
    pub next_cycle_in: Option<Duration>,
}

pub struct EvolutionScheduler {
    runner: CycleRunner,
    gate: CycleGate,
    tick_interval: Duration,
    error_backoff: Duration,
    store: Arc<dyn RecordStore>,
    persist_timeout: Duration,
    events: Arc<EventBus>,
    history: History<EvolutionCycle>,
    running: AtomicBool,
    wake: Notify,
    cycle_lock: tokio::sync::Mutex<()>,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl EvolutionScheduler {
    pub fn new(
        pipeline: Arc<ConstructionPipeline>,
        search: Arc<dyn SearchProvider>,
        config: EvolutionConfig,
    ) -> Self {
        let gate = CycleGate::new(config.max_daily_cycles, config.interval());
        let tick_interval = config.tick();
        let error_backoff = config.error_backoff();
        let events = pipeline.events().clone();
        Self {
            runner: CycleRunner::new(pipeline, search, config),
            gate,
            tick_interval,
            error_backoff,
            store: Arc::new(InMemoryStore::new()),
            persist_timeout: DEFAULT_WRITE_TIMEOUT,
            events,
            history: History::new(),
            running: AtomicBool::new(false),
            wake: Notify::new(),
            cycle_lock: tokio::sync::Mutex::new(()),
            handle: std::sync::Mutex::new(None),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Bound on persisting each cycle; a slower store is skipped.
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Cycles kept in memory. Never fewer than the daily cap, which the
    /// gate counts from this history.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        let floor = self.gate.max_daily_cycles() as usize;
        self.history = History::with_capacity(capacity.max(floor));
        self
    }

    /// Spawn the background loop.
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_loop().await });
        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        info!(tick_secs = self.tick_interval.as_secs(), "Evolution scheduler started");
        Ok(())
    }

    /// Stop the loop and wait for it to exit. A cycle already in progress
    /// finishes first.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.wake.notify_one();

        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Evolution loop ended abnormally");
        }
        info!("Evolution scheduler stopped");
    }

    /// Run a cycle now, skipping the interval but not the daily cap.
    pub async fn force_cycle_now(&self) -> Result<Arc<EvolutionCycle>, SchedulerError> {
        let _guard = self.cycle_lock.lock().await;
        let starts = self.starts().await;
        if self.gate.check_cap(Utc::now(), &starts) == GateDecision::DailyCapReached {
            return Err(SchedulerError::DailyCapReached {
                cap: self.gate.max_daily_cycles(),
            });
        }
        Ok(self.run_cycle().await)
    }

    /// One pass of the loop body: run a cycle if the gate admits it.
    pub async fn tick(&self) -> Option<Arc<EvolutionCycle>> {
        let _guard = self.cycle_lock.lock().await;
        let starts = self.starts().await;
        match self.gate.check(Utc::now(), &starts) {
            GateDecision::Admit => Some(self.run_cycle().await),
            decision => {
                debug!(?decision, "Evolution cycle not due");
                None
            }
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        let is_running = self.running.load(Ordering::SeqCst);
        let starts = self.starts().await;
        SchedulerStatus {
            is_running,
            total_cycles: self.history.total(),
            last_cycle: self.history.last().await,
            next_cycle_in: if is_running {
                self.gate.next_admission(Utc::now(), &starts)
            } else {
                None
            },
        }
    }

    /// Seed the history from cycles persisted by earlier processes, so the
    /// daily cap and interval hold across restarts. Returns how many were
    /// loaded; unreadable entries are skipped.
    pub async fn load_history(&self) -> Result<usize, StoreError> {
        let filter = RecordFilter::all();
        let query = self.store.query(EVOLUTION_CYCLES, &filter);
        let stored = tokio::time::timeout(self.persist_timeout, query)
            .await
            .map_err(|_| StoreError::TimedOut {
                secs: self.persist_timeout.as_secs(),
            })??;
        let mut loaded = 0;
        for value in stored {
            match serde_json::from_value::<EvolutionCycle>(value) {
                Ok(cycle) => {
                    self.history.push(cycle).await;
                    loaded += 1;
                }
                Err(e) => warn!(error = %e, "Skipping unreadable evolution cycle"),
            }
        }
        debug!(loaded, "Evolution history loaded");
        Ok(loaded)
    }

    /// Retained cycles, oldest first.
    pub async fn history(&self) -> Vec<Arc<EvolutionCycle>> {
        self.history.snapshot().await
    }

    async fn run_loop(&self) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let pause = match self.tick().await {
                Some(cycle) if !cycle.errors.is_empty() => {
                    warn!(
                        cycle_id = %cycle.id,
                        errors = cycle.errors.len(),
                        backoff_secs = self.error_backoff.as_secs(),
                        "Evolution cycle had errors, backing off"
                    );
                    self.error_backoff
                }
                _ => self.tick_interval,
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.wake.notified() => {}
            }
        }
        debug!("Evolution loop exited");
    }

    /// Caller holds `cycle_lock`.
    async fn run_cycle(&self) -> Arc<EvolutionCycle> {
        let mut cycle = EvolutionCycle::begin(Utc::now());
        info!(cycle_id = %cycle.id, "Evolution cycle started");

        if let Err(panic) = AssertUnwindSafe(self.runner.run(&mut cycle))
            .catch_unwind()
            .await
        {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            cycle.errors.push(format!("panic: {message}"));
        }
        cycle.completed_at = Some(Utc::now());

        let cycle = self.history.push(cycle).await;

        match serde_json::to_value(cycle.as_ref()) {
            Ok(value) => {
                if let Err(e) =
                    append_within(self.store.as_ref(), EVOLUTION_CYCLES, value, self.persist_timeout).await
                {
                    warn!(cycle_id = %cycle.id, error = %e, "Failed to persist evolution cycle");
                }
            }
            Err(e) => warn!(cycle_id = %cycle.id, error = %e, "Failed to serialize evolution cycle"),
        }

        self.events.publish(DomainEvent::CycleCompleted {
            cycle_id: cycle.id.clone(),
            records: cycle.records.len(),
            errors: cycle.errors.len(),
            timestamp: Utc::now(),
        });

        info!(
            cycle_id = %cycle.id,
            records = cycle.records.len(),
            errors = cycle.errors.len(),
            "Evolution cycle completed"
        );
        cycle
    }

    async fn starts(&self) -> Vec<DateTime<Utc>> {
        self.history
            .snapshot()
            .await
            .iter()
            .map(|c| c.timestamp)
            .collect()
    }
}
