use dar_core::{DarError, ScheduleKind};
use dar_scheduler::SchedulerError;
use dar_streamer::StreamerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// Malformed or contradictory config, including schedule descriptors.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schedule type \"{0}\" not supported")]
    UnsupportedScheduleType(ScheduleKind),

    /// Non-ignored error text in a capture's diagnostic output.
    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Process launch error: {0}")]
    ProcessLaunch(String),

    #[error("Store error: {0}")]
    Store(#[from] SchedulerError),

    #[error("Streamer error: {0}")]
    Streamer(StreamerError),
}

impl RecorderError {
    /// Short error code string used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RecorderError::Config(_) => "CONFIG_ERROR",
            RecorderError::UnsupportedScheduleType(_) => "UNSUPPORTED_SCHEDULE_TYPE",
            RecorderError::Capture(_) => "CAPTURE_ERROR",
            RecorderError::ProcessLaunch(_) => "PROCESS_LAUNCH_ERROR",
            RecorderError::Store(SchedulerError::JobNotFound { .. }) => "JOB_NOT_FOUND",
            RecorderError::Store(_) => "STORE_ERROR",
            RecorderError::Streamer(e) => e.code(),
        }
    }
}

impl From<DarError> for RecorderError {
    fn from(e: DarError) -> Self {
        RecorderError::Config(e.to_string())
    }
}

impl From<StreamerError> for RecorderError {
    fn from(e: StreamerError) -> Self {
        match e {
            StreamerError::ProcessLaunch { .. } => RecorderError::ProcessLaunch(e.to_string()),
            other => RecorderError::Streamer(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
