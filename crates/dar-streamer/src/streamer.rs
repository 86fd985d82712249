use async_trait::async_trait;
use chrono::{DateTime, Local};
use dar_core::{DarConfig, StreamerKind};

use crate::{
    error::{Result, StreamerError},
    types::{CaptureOutcome, CaptureRequest, Invocation},
    vlc::VlcStreamer,
};

/// An external program that captures a stream into a file.
#[async_trait]
pub trait Streamer: Send + Sync {
    /// Config name this streamer was obtained under.
    fn name(&self) -> &str;

    /// Build the capture command for `request` as of `now`.
    ///
    /// Pure: the same request and instant always give the same invocation.
    fn compose(&self, request: &CaptureRequest, now: DateTime<Local>) -> Result<Invocation>;

    /// Compose, run and classify one capture as of `now`. A dry run returns
    /// the command line without launching anything, and is deterministic for
    /// a given request and instant.
    async fn save_stream_at(
        &self,
        request: &CaptureRequest,
        now: DateTime<Local>,
    ) -> Result<CaptureOutcome>;

    /// [`Streamer::save_stream_at`] with the current local time. With
    /// `add_timestamp` set the output name follows the clock, so two dry runs
    /// either side of a minute boundary differ.
    async fn save_stream(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        self.save_stream_at(request, Local::now()).await
    }
}

/// Look up streamer `name` in `config` and build its implementation.
pub fn streamer_for(name: &str, config: &DarConfig) -> Result<Box<dyn Streamer>> {
    let entry = config
        .streamers
        .get(name)
        .ok_or_else(|| StreamerError::UnknownStreamer(name.to_string()))?;
    match entry.kind {
        StreamerKind::Vlc => Ok(Box::new(VlcStreamer::new(name, entry.clone()))),
    }
}
