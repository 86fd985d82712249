//! The capture arguments stored with each job, and the runner that executes
//! them when the job fires.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dar_core::ConfigCache;
use dar_scheduler::{JobRecord, JobRunner};
use dar_streamer::{streamer_for, CaptureOutcome, CaptureRequest, Verbosity};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecorderError, Result};

/// Positional capture arguments:
/// `(streamer_name, cfg_profile, url, media_type, filebase, duration, add_timestamp, verbose)`.
///
/// Serialized as a JSON array so stored jobs do not depend on field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturePayload(
    pub String,
    pub Option<String>,
    pub String,
    pub String,
    pub String,
    pub u64,
    pub bool,
    pub Verbosity,
);

impl CapturePayload {
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| RecorderError::Config(e.to_string()))
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| RecorderError::Config(format!("bad capture payload: {e}")))
    }

    pub fn into_request(self) -> CaptureRequest {
        let CapturePayload(streamer, profile, url, media_type, filebase, duration, add_ts, verbose) =
            self;
        CaptureRequest {
            cfg_profile: profile,
            add_timestamp: add_ts,
            verbose,
            ..CaptureRequest::new(streamer, url, media_type, filebase, duration)
        }
    }
}

/// Runs the capture stored in a fired job.
///
/// The streamer definition is read through the config cache at fire time, so
/// a reload picks up streamer changes for jobs already in the store.
pub struct CaptureRunner {
    cache: Arc<ConfigCache>,
    config_path: PathBuf,
}

impl CaptureRunner {
    pub fn new(cache: Arc<ConfigCache>, config_path: PathBuf) -> Self {
        Self { cache, config_path }
    }

    pub async fn capture(&self, payload: CapturePayload) -> Result<CaptureOutcome> {
        let config = self.cache.get(&self.config_path, payload.1.as_deref())?;
        let streamer = streamer_for(&payload.0, &config)?;
        let request = payload.into_request();
        debug!(streamer = %streamer.name(), url = %request.url, "capture starting");
        match streamer.save_stream(&request).await? {
            CaptureOutcome::Failed(msg) => Err(RecorderError::Capture(msg)),
            outcome => Ok(outcome),
        }
    }
}

#[async_trait]
impl JobRunner for CaptureRunner {
    async fn run(&self, job: &JobRecord) -> std::result::Result<String, String> {
        let payload = CapturePayload::from_value(&job.payload).map_err(|e| e.to_string())?;
        match self.capture(payload).await {
            Ok(CaptureOutcome::Artifact(path)) => Ok(path.display().to_string()),
            Ok(CaptureOutcome::DryRun(cmd)) => Ok(cmd),
            Ok(CaptureOutcome::Failed(msg)) | Err(RecorderError::Capture(msg)) => Err(msg),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> CapturePayload {
        CapturePayload(
            "vlc".into(),
            Some("test".into()),
            "http://s/x".into(),
            "audio/aacp".into(),
            "/rec/KQED/kqed".into(),
            3600,
            true,
            Verbosity::Flag(false),
        )
    }

    #[test]
    fn payload_is_a_positional_array() {
        let value = payload().to_value().unwrap();
        assert_eq!(
            value,
            json!(["vlc", "test", "http://s/x", "audio/aacp", "/rec/KQED/kqed", 3600, true, false])
        );
        assert_eq!(CapturePayload::from_value(&value).unwrap(), payload());
    }

    #[test]
    fn malformed_payload_is_a_config_error() {
        let err = CapturePayload::from_value(&json!({"url": "x"})).unwrap_err();
        assert!(matches!(err, RecorderError::Config(_)));
    }

    #[test]
    fn request_carries_every_position() {
        let req = payload().into_request();
        assert_eq!(req.streamer_name, "vlc");
        assert_eq!(req.cfg_profile.as_deref(), Some("test"));
        assert_eq!(req.filebase, "/rec/KQED/kqed");
        assert_eq!(req.duration, dar_core::DurationValue::Seconds(3600));
        assert!(req.add_timestamp);
        assert!(!req.force);
        assert!(!req.dryrun);
    }
}
