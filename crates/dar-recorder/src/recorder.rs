use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dar_core::{ConfigCache, DarConfig};
use dar_scheduler::{EventSink, JobRecord, JobStatus, JobStore, SchedulerEngine};
use dar_streamer::{streamer_for, Verbosity};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::payload::CaptureRunner;
use crate::reconcile::{reconcile, Registrar, ReloadOptions, ReloadResult};

/// Lifecycle state, read through from the engine on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Shutdown,
    Started,
    Paused,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecorderState::Shutdown => "shutdown",
            RecorderState::Started => "started",
            RecorderState::Paused => "paused",
        };
        write!(f, "{s}")
    }
}

/// Where the recorder's config comes from and how captures are run.
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub config_path: PathBuf,
    pub profile: Option<String>,
    /// Streamer entry used for every registered program.
    pub streamer: String,
    pub verbose: Verbosity,
}

impl RecorderSettings {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            profile: None,
            streamer: "vlc".to_string(),
            verbose: Verbosity::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecorderInfo {
    pub state: RecorderState,
    pub streamer: String,
    pub profile: Option<String>,
    pub config_path: PathBuf,
    pub jobs: usize,
    pub queued: usize,
    pub suspended: usize,
}

/// The recorder: a lifecycle state machine over the scheduler engine, plus
/// program reconciliation and job queries.
///
/// Lifecycle calls never fail for being made in the wrong state; they report
/// `false` instead. Queries made while shut down start the engine paused
/// first, so a read never leaves jobs firing.
pub struct Recorder {
    engine: SchedulerEngine,
    cache: Arc<ConfigCache>,
    settings: RecorderSettings,
    /// Serialises state transitions.
    transition: Mutex<()>,
}

impl Recorder {
    pub fn new(engine: SchedulerEngine, cache: Arc<ConfigCache>, settings: RecorderSettings) -> Self {
        Self {
            engine,
            cache,
            settings,
            transition: Mutex::new(()),
        }
    }

    /// Load the config, open the job store it names and wire up the capture
    /// runner. The recorder starts out shut down.
    pub fn open(cache: Arc<ConfigCache>, settings: RecorderSettings, events: EventSink) -> Result<Self> {
        let config = cache.get(&settings.config_path, settings.profile.as_deref())?;
        let store = JobStore::open(&config.db_path(), events.clone())?;
        let runner = Arc::new(CaptureRunner::new(
            Arc::clone(&cache),
            settings.config_path.clone(),
        ));
        let engine = SchedulerEngine::new(store, runner, events)
            .with_poll_interval(Duration::from_millis(config.scheduler.poll_interval_ms.max(10)));
        info!(db = %config.db_path().display(), streamer = %settings.streamer, "recorder opened");
        Ok(Self::new(engine, cache, settings))
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Current config through the cache.
    pub fn config(&self) -> Result<Arc<DarConfig>> {
        Ok(self
            .cache
            .get(&self.settings.config_path, self.settings.profile.as_deref())?)
    }

    pub fn get_state(&self) -> RecorderState {
        if !self.engine.is_running() {
            RecorderState::Shutdown
        } else if self.engine.is_paused() {
            RecorderState::Paused
        } else {
            RecorderState::Started
        }
    }

    /// Shutdown or paused → started.
    pub async fn start(&self) -> Result<bool> {
        let _guard = self.transition.lock().await;
        match self.get_state() {
            RecorderState::Started => return Ok(false),
            RecorderState::Shutdown => self.engine.start(false)?,
            RecorderState::Paused => self.engine.resume_all()?,
        }
        info!(state = %self.get_state(), "recorder started");
        Ok(true)
    }

    /// Started → paused. Running captures continue.
    pub async fn pause(&self) -> Result<bool> {
        let _guard = self.transition.lock().await;
        if self.get_state() != RecorderState::Started {
            return Ok(false);
        }
        self.engine.pause_all()?;
        info!("recorder paused");
        Ok(true)
    }

    /// Paused → started.
    pub async fn resume(&self) -> Result<bool> {
        let _guard = self.transition.lock().await;
        if self.get_state() != RecorderState::Paused {
            return Ok(false);
        }
        self.engine.resume_all()?;
        info!("recorder resumed");
        Ok(true)
    }

    /// Any running state → shutdown. With `wait_for_jobs` this returns once
    /// in-flight captures have finished; otherwise they are abandoned (their
    /// processes keep running).
    ///
    /// Only the state change holds the transition lock. Queries and other
    /// transitions go ahead while the captures are waited on.
    pub async fn stop(&self, wait_for_jobs: bool) -> Result<bool> {
        let detached = {
            let _guard = self.transition.lock().await;
            if self.get_state() == RecorderState::Shutdown {
                return Ok(false);
            }
            self.engine.detach()?
        };
        detached.finish(wait_for_jobs).await;
        info!(wait_for_jobs, "recorder stopped");
        Ok(true)
    }

    /// Reload config and reconcile its programs into the job store.
    pub async fn reload(&self, opts: ReloadOptions) -> Result<ReloadResult> {
        let config = self
            .cache
            .reload(&self.settings.config_path, self.settings.profile.as_deref())?;
        streamer_for(&self.settings.streamer, &config)?;
        self.ensure_queryable().await?;

        let rec_path = config.rec_path()?;
        let registrar = Registrar {
            config: &config,
            streamer: &self.settings.streamer,
            profile: self.settings.profile.as_deref(),
            verbose: self.settings.verbose,
            rec_path: &rec_path,
        };
        let store = self.engine.store();
        let current = store.ids()?;
        let result = reconcile(store, &registrar, &config.programs, &current, opts)?;
        info!(
            created = result.created.len(),
            updated = result.updated.len(),
            paused = result.paused.len(),
            "programs reloaded"
        );
        Ok(result)
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        self.ensure_queryable().await?;
        Ok(self.engine.store().list()?)
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        self.ensure_queryable().await?;
        Ok(self.engine.store().get(id)?)
    }

    /// Suspend one job; it keeps its definition but will not fire.
    pub async fn pause_job(&self, id: &str) -> Result<JobRecord> {
        self.ensure_queryable().await?;
        Ok(self.engine.store().pause(id)?)
    }

    /// Requeue one job. `None` when its trigger has nothing left to fire and
    /// the job was removed.
    pub async fn resume_job(&self, id: &str) -> Result<Option<JobRecord>> {
        self.ensure_queryable().await?;
        Ok(self.engine.store().resume(id)?)
    }

    pub async fn get_info(&self) -> Result<RecorderInfo> {
        let jobs = self.list_jobs().await?;
        let queued = jobs
            .iter()
            .filter(|j| j.status() == JobStatus::Queued)
            .count();
        Ok(RecorderInfo {
            state: self.get_state(),
            streamer: self.settings.streamer.clone(),
            profile: self.settings.profile.clone(),
            config_path: self.settings.config_path.clone(),
            jobs: jobs.len(),
            queued,
            suspended: jobs.len() - queued,
        })
    }

    /// Start the engine paused if it is shut down.
    async fn ensure_queryable(&self) -> Result<()> {
        let _guard = self.transition.lock().await;
        if self.get_state() == RecorderState::Shutdown {
            self.engine.start(true)?;
            info!("scheduler started paused for query");
        }
        Ok(())
    }
}
