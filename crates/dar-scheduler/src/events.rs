use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Notifications published by the store and the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    SchedulerStarted { paused: bool },
    SchedulerPaused,
    SchedulerResumed,
    SchedulerShutdown,
    JobAdded { job_id: String },
    JobModified { job_id: String },
    JobPaused { job_id: String },
    JobResumed { job_id: String },
    JobRemoved { job_id: String },
    JobSubmitted { job_id: String, run_time: DateTime<Utc> },
    JobExecuted { job_id: String, run_time: DateTime<Utc>, retval: String },
    JobError { job_id: String, run_time: DateTime<Utc>, error: String },
    /// The fire came later than the job's misfire grace window and was skipped.
    JobMissed { job_id: String, run_time: DateTime<Utc> },
    /// The job was still running from an earlier fire; this one was skipped.
    JobMaxInstances { job_id: String, run_time: DateTime<Utc> },
}

impl JobEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, JobEvent::JobError { .. })
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobEvent::JobAdded { job_id }
            | JobEvent::JobModified { job_id }
            | JobEvent::JobPaused { job_id }
            | JobEvent::JobResumed { job_id }
            | JobEvent::JobRemoved { job_id }
            | JobEvent::JobSubmitted { job_id, .. }
            | JobEvent::JobExecuted { job_id, .. }
            | JobEvent::JobError { job_id, .. }
            | JobEvent::JobMissed { job_id, .. }
            | JobEvent::JobMaxInstances { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

/// Optional mpsc sender for [`JobEvent`]s.
///
/// Sends are non-blocking (`try_send`) so neither the store nor the tick loop
/// ever waits on a slow listener.
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<JobEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<JobEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: JobEvent) {
        if let Some(ref tx) = self.tx {
            if tx.try_send(event).is_err() {
                warn!("job event channel full or closed; event dropped");
            }
        }
    }
}
