//! Job scheduler worker pool: drives cron/interval/event/manual triggers
//! against the registry, enforcing one in-flight run per job name and
//! retrying failed runs with exponential backoff (spec §4.3).
//!
//! `JobTrigger::Cron` here supports the `"HH:MM"` daily-time subset rather
//! than full cron syntax — the named jobs this system runs (daily/weekly/
//! monthly maintenance, the daily pipeline) only ever need a fixed
//! time-of-day trigger, so a full cron grammar isn't grounded in anything
//! this service actually does.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Timelike, Utc};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::domain::errors::SentinelResult;
use crate::domain::event::EventKind;
use crate::domain::repositories::JobRepository;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::observability::metrics::Metrics;

use super::registry::{JobDefinition, JobRegistry, JobTrigger};

pub struct JobScheduler {
    registry: Arc<JobRegistry>,
    jobs: Arc<dyn JobRepository>,
    events: Arc<EventBus>,
    metrics: Arc<Metrics>,
    concurrency: Arc<Semaphore>,
    last_fired: Mutex<HashMap<&'static str, Instant>>,
}

impl JobScheduler {
    pub fn new(
        registry: Arc<JobRegistry>,
        jobs: Arc<dyn JobRepository>,
        events: Arc<EventBus>,
        metrics: Arc<Metrics>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            registry,
            jobs,
            events,
            metrics,
            concurrency: Arc::new(Semaphore::new(max_concurrent)),
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Spawns the interval/cron ticker and the event-trigger listener. Both
    /// run until the returned handles are aborted at shutdown.
    pub fn start(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();
        handles.push(tokio::spawn(self.clone().run_ticker()));
        handles.push(tokio::spawn(self.clone().run_event_listener()));
        handles
    }

    async fn run_ticker(self: Arc<Self>) {
        let mut last_minute_fired: Option<(u32, u32)> = None;
        loop {
            sleep(StdDuration::from_secs(20)).await;
            let now = Utc::now();
            let minute_key = (now.hour(), now.minute());

            for def in self.registry.definitions.iter() {
                match &def.trigger {
                    JobTrigger::Interval(period) => {
                        let mut last_fired = self.last_fired.lock().await;
                        let due = match last_fired.get(def.name) {
                            Some(last) => last.elapsed() >= *period,
                            None => true,
                        };
                        if due {
                            last_fired.insert(def.name, Instant::now());
                            drop(last_fired);
                            self.dispatch(def.clone()).await;
                        }
                    }
                    JobTrigger::Cron(hhmm) => {
                        if let Some((h, m)) = parse_hhmm(hhmm) {
                            if (now.hour(), now.minute()) == (h, m) && last_minute_fired != Some(minute_key) {
                                self.dispatch(def.clone()).await;
                            }
                        }
                    }
                    JobTrigger::Event(_) | JobTrigger::Manual => {}
                }
            }
            last_minute_fired = Some(minute_key);
        }
    }

    async fn run_event_listener(self: Arc<Self>) {
        let mut sub = self.events.subscribe();
        while let Some(event) = sub.recv().await {
            let kind: EventKind = event.kind;
            for def in self.registry.triggered_by(kind) {
                self.dispatch(def.clone()).await;
            }
        }
    }

    /// Runs a named job immediately regardless of trigger, used by manual
    /// API-triggered jobs (spec §4.3 "manual" trigger kind).
    pub async fn trigger_manual(&self, name: &str) -> SentinelResult<()> {
        match self.registry.find(name) {
            Some(def) => {
                self.dispatch(def.clone()).await;
                Ok(())
            }
            None => Err(crate::domain::errors::SentinelError::not_found(format!(
                "no job named {name}"
            ))),
        }
    }

    async fn dispatch(&self, def: JobDefinition) {
        if self.jobs.has_in_flight(def.name).await.unwrap_or(false) {
            info!(job = def.name, "skipping dispatch, already in flight");
            return;
        }

        let permit = self.concurrency.clone().acquire_owned().await.unwrap();
        let jobs = self.jobs.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let record = match jobs.insert_queued(def.name, Utc::now()).await {
                Ok(r) => r,
                Err(err) => {
                    error!(job = def.name, error = %err, "failed to record job");
                    return;
                }
            };

            let _ = jobs.mark_running(record.id).await;

            let mut attempt = 0u32;
            loop {
                match def.handler.run().await {
                    Ok(()) => {
                        let _ = jobs.mark_finished(record.id, true, None).await;
                        metrics.jobs_succeeded.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        return;
                    }
                    Err(err) if attempt < def.max_retries && err.is_retryable() => {
                        attempt += 1;
                        let _ = jobs.increment_retry(record.id).await;
                        let backoff = def.backoff_base * 2u32.pow(attempt.min(6));
                        warn!(job = def.name, attempt, error = %err, "job failed, retrying");
                        sleep(backoff).await;
                    }
                    Err(err) => {
                        let _ = jobs.mark_finished(record.id, false, Some(err.to_string())).await;
                        metrics.jobs_failed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        error!(job = def.name, error = %err, "job failed permanently");
                        return;
                    }
                }
            }
        });
    }
}

fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    Some((h.parse().ok()?, m.parse().ok()?))
}
