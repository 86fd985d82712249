use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The trigger definition cannot be evaluated.
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    /// No job with the given ID exists in the store.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// A stored column could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler is not running")]
    NotRunning,
}

impl SchedulerError {
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::Database(_) => "DATABASE_ERROR",
            SchedulerError::InvalidTrigger(_) => "INVALID_TRIGGER",
            SchedulerError::JobNotFound { .. } => "JOB_NOT_FOUND",
            SchedulerError::Serialization(_) => "SERIALIZATION_ERROR",
            SchedulerError::AlreadyRunning => "ALREADY_RUNNING",
            SchedulerError::NotRunning => "NOT_RUNNING",
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(e: serde_json::Error) -> Self {
        SchedulerError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
