use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::{
    error::{Result, SchedulerError},
    events::{EventSink, JobEvent},
    schedule::next_fire_time,
    store::JobStore,
    types::JobRecord,
};

/// Executes the work bound to a fired job.
///
/// `Ok` carries a short result for the `JobExecuted` event, `Err` the failure
/// reported through `JobError`.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &JobRecord) -> std::result::Result<String, String>;
}

/// Trigger engine over a [`JobStore`].
///
/// While started, a background loop polls the store and hands due jobs to the
/// runner on their own tasks. At most one execution per job id is live at a
/// time; distinct ids run concurrently.
pub struct SchedulerEngine {
    store: JobStore,
    runner: Arc<dyn JobRunner>,
    events: EventSink,
    poll_interval: Duration,
    /// Ids with a live execution. Outlives restarts, so a job abandoned by
    /// `shutdown(false)` still blocks a new fire of the same id.
    in_flight: Arc<Mutex<HashSet<String>>>,
    running: Mutex<Option<RunningEngine>>,
}

struct RunningEngine {
    dispatcher: Dispatcher,
    shutdown_tx: watch::Sender<bool>,
    loop_handle: JoinHandle<()>,
}

impl SchedulerEngine {
    pub fn new(store: JobStore, runner: Arc<dyn JobRunner>, events: EventSink) -> Self {
        Self {
            store,
            runner,
            events,
            poll_interval: Duration::from_secs(1),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            running: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.state().is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.state()
            .as_ref()
            .is_some_and(|r| r.dispatcher.paused.load(Ordering::SeqCst))
    }

    /// Start the tick loop. With `paused = true` the store is live for queries
    /// and edits but nothing fires until [`SchedulerEngine::resume_all`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, paused: bool) -> Result<()> {
        let mut state = self.state();
        if state.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let dispatcher = Dispatcher {
            store: self.store.clone(),
            runner: Arc::clone(&self.runner),
            events: self.events.clone(),
            paused: Arc::new(AtomicBool::new(paused)),
            in_flight: Arc::clone(&self.in_flight),
            tracker: TaskTracker::new(),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_handle = tokio::spawn(dispatcher.clone().run(self.poll_interval, shutdown_rx));

        *state = Some(RunningEngine {
            dispatcher,
            shutdown_tx,
            loop_handle,
        });
        info!(paused, "scheduler started");
        self.events.emit(JobEvent::SchedulerStarted { paused });
        Ok(())
    }

    /// Stop firing new jobs. Running jobs are not affected.
    pub fn pause_all(&self) -> Result<()> {
        let state = self.state();
        let running = state.as_ref().ok_or(SchedulerError::NotRunning)?;
        running.dispatcher.paused.store(true, Ordering::SeqCst);
        info!("scheduler paused");
        self.events.emit(JobEvent::SchedulerPaused);
        Ok(())
    }

    pub fn resume_all(&self) -> Result<()> {
        let state = self.state();
        let running = state.as_ref().ok_or(SchedulerError::NotRunning)?;
        running.dispatcher.paused.store(false, Ordering::SeqCst);
        info!("scheduler resumed");
        self.events.emit(JobEvent::SchedulerResumed);
        Ok(())
    }

    /// Stop the tick loop. With `wait = true` this returns only after every
    /// in-flight job has finished; otherwise running jobs are left behind
    /// without being waited on (their processes are not killed).
    pub async fn shutdown(&self, wait: bool) -> Result<()> {
        self.detach()?.finish(wait).await;
        Ok(())
    }

    /// Signal the tick loop to stop and hand back what is still running.
    ///
    /// The engine reads as stopped as soon as this returns and may be started
    /// again while the returned [`Detached`] is being waited on.
    pub fn detach(&self) -> Result<Detached> {
        let running = self.state().take().ok_or(SchedulerError::NotRunning)?;
        let _ = running.shutdown_tx.send(true);
        running.dispatcher.tracker.close();
        Ok(Detached {
            loop_handle: running.loop_handle,
            tracker: running.dispatcher.tracker,
            events: self.events.clone(),
        })
    }

    fn state(&self) -> MutexGuard<'_, Option<RunningEngine>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A stopped engine run whose loop and jobs may still be winding down.
pub struct Detached {
    loop_handle: JoinHandle<()>,
    tracker: TaskTracker,
    events: EventSink,
}

impl Detached {
    /// Jobs of this run still executing.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Join the tick loop, then wait for running jobs when `wait` is set.
    pub async fn finish(self, wait: bool) {
        if let Err(e) = self.loop_handle.await {
            error!("scheduler loop ended abnormally: {e}");
        }
        if wait {
            info!(in_flight = self.tracker.len(), "waiting for running jobs");
            self.tracker.wait().await;
        } else if !self.tracker.is_empty() {
            warn!(in_flight = self.tracker.len(), "shutting down without waiting for running jobs");
        }

        info!(wait, "scheduler shut down");
        self.events.emit(JobEvent::SchedulerShutdown);
    }
}

/// The part of the engine the tick loop and job tasks share.
#[derive(Clone)]
struct Dispatcher {
    store: JobStore,
    runner: Arc<dyn JobRunner>,
    events: EventSink,
    paused: Arc<AtomicBool>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    tracker: TaskTracker,
}

impl Dispatcher {
    async fn run(self, poll_interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()) {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Fire or skip every due job, then move each past this fire.
    fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        if self.paused.load(Ordering::SeqCst) {
            return Ok(());
        }

        for job in self.store.due(now)? {
            let Some(fire_at) = job.next_run_time else {
                continue;
            };
            let next = next_fire_time(&job.trigger, now);
            let late_secs = (now - fire_at).num_seconds();

            if late_secs > job.misfire_grace_secs as i64 {
                warn!(job_id = %job.id, late_secs, "run time of job was missed");
                self.events.emit(JobEvent::JobMissed {
                    job_id: job.id.clone(),
                    run_time: fire_at,
                });
            } else {
                self.submit(job.clone(), fire_at)?;
            }
            self.store.advance(&job.id, fire_at, next)?;
        }
        Ok(())
    }

    /// Spawn one execution of `job` unless the same id is still running.
    /// Only an accepted run is counted.
    fn submit(&self, job: JobRecord, run_time: DateTime<Utc>) -> Result<()> {
        if !self.in_flight().insert(job.id.clone()) {
            warn!(job_id = %job.id, "job still running; skipping this run");
            self.events.emit(JobEvent::JobMaxInstances {
                job_id: job.id,
                run_time,
            });
            return Ok(());
        }
        if let Err(e) = self.store.record_run(&job.id, Utc::now()) {
            self.in_flight().remove(&job.id);
            return Err(e);
        }

        info!(job_id = %job.id, name = %job.name, "running job");
        self.events.emit(JobEvent::JobSubmitted {
            job_id: job.id.clone(),
            run_time,
        });

        let this = self.clone();
        self.tracker.spawn(async move {
            let outcome = this.runner.run(&job).await;
            this.in_flight().remove(&job.id);
            match outcome {
                Ok(retval) => {
                    info!(job_id = %job.id, %retval, "job executed");
                    this.events.emit(JobEvent::JobExecuted {
                        job_id: job.id,
                        run_time,
                        retval,
                    });
                }
                Err(error) => {
                    error!(job_id = %job.id, %error, "job failed");
                    this.events.emit(JobEvent::JobError {
                        job_id: job.id,
                        run_time,
                        error,
                    });
                }
            }
        });
        Ok(())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
