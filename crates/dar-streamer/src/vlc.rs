//! VLC (`cvlc`) capture: stream → `#transcode` → `file` sink.
//!
//! VLC exits 0 on most stream-level failures, so the exit status alone is not
//! trusted. Success is decided by scanning stderr for lines of the form
//! `[<hex>] <category> error: <message>`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use dar_core::{timefmt, DurationValue, StreamerConfig};
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::{
    error::{Result, StreamerError},
    streamer::Streamer,
    types::{CaptureOutcome, CaptureRequest, Invocation},
};

/// Flags used unless the capture may overwrite an existing file.
pub const VLC_DEFAULT_FLAGS: [&str; 4] = [
    "--no-sout-all",
    "--sout-keep",
    "--no-sout-file-overwrite",
    "--play-and-exit",
];

/// Flags used for a forced (overwriting) capture.
pub const VLC_FORCE_FLAGS: [&str; 3] = ["--no-sout-all", "--sout-keep", "--play-and-exit"];

/// Suffix appended to the file base when a timestamp is requested.
pub const TIMESTAMP_FMT: &str = "%m%d%H%M";

const SECS_PER_DAY: u64 = 86_400;

fn error_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[[0-9a-f]+\] [\w ]+ error: (.+)$").expect("error line pattern is valid")
    })
}

pub struct VlcStreamer {
    name: String,
    config: StreamerConfig,
}

impl VlcStreamer {
    pub fn new(name: impl Into<String>, config: StreamerConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// First diagnostic error in `stderr` that is not on the ignore list.
    pub fn first_error(&self, stderr: &str) -> Option<String> {
        let mut errors = Vec::new();
        for line in stderr.lines() {
            let Some(caps) = error_line().captures(line) else {
                continue;
            };
            let msg = &caps[1];
            if self.config.ignore_errors.iter().any(|ignored| ignored == msg) {
                info!(streamer = %self.name, "ignoring error: \"{msg}\"");
            } else {
                errors.push(msg.to_string());
            }
        }
        if !errors.is_empty() {
            info!(streamer = %self.name, ?errors, "capture errors");
        }
        errors.into_iter().next()
    }
}

#[async_trait]
impl Streamer for VlcStreamer {
    fn name(&self) -> &str {
        &self.name
    }

    fn compose(&self, request: &CaptureRequest, now: DateTime<Local>) -> Result<Invocation> {
        let media = self
            .config
            .media_types
            .get(&request.media_type)
            .ok_or_else(|| StreamerError::UnknownMediaType {
                media_type: request.media_type.clone(),
                streamer: self.name.clone(),
            })?;

        let mut filebase = request.filebase.clone();
        if request.add_timestamp {
            filebase.push_str(&now.format(TIMESTAMP_FMT).to_string());
        }
        let output = PathBuf::from(format!("{filebase}.{}", media.file_type));
        let duration = duration_secs(&request.duration)?;

        let mut args = Vec::new();
        let verbosity = request.verbose.count();
        if verbosity > 0 {
            args.push(format!("-{}", "v".repeat(verbosity)));
        }
        args.push(request.url.clone());
        args.push(format!(
            "--sout=#transcode{{vcodec=none,scodec=none}}:file{{mux={},dst={}}}",
            media.muxer,
            output.display()
        ));
        args.push(format!("--run-time={duration}"));
        let flags: &[&str] = if request.force {
            &VLC_FORCE_FLAGS
        } else {
            &VLC_DEFAULT_FLAGS
        };
        args.extend(flags.iter().map(|f| f.to_string()));

        Ok(Invocation {
            program: self.config.command.clone(),
            args,
            output,
        })
    }

    async fn save_stream_at(
        &self,
        request: &CaptureRequest,
        now: DateTime<Local>,
    ) -> Result<CaptureOutcome> {
        let invocation = self.compose(request, now)?;
        if request.dryrun {
            return Ok(CaptureOutcome::DryRun(invocation.command_line()));
        }

        info!(streamer = %self.name, cmd = %invocation, "saving stream");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| StreamerError::ProcessLaunch {
                command: invocation.program.clone(),
                source,
            })?;

        let stderr = strip_text(&output.stderr);
        if let Some(msg) = self.first_error(&stderr) {
            error!(streamer = %self.name, url = %request.url, "capture failed: {msg}");
            debug!("full stderr:\n{}", stderr.trim_end());
            return Ok(CaptureOutcome::Failed(msg));
        }
        if !output.status.success() {
            let msg = format!("{} exited with {}", invocation.program, output.status);
            error!(streamer = %self.name, url = %request.url, "capture failed: {msg}");
            debug!("full stderr:\n{}", stderr.trim_end());
            return Ok(CaptureOutcome::Failed(msg));
        }

        info!(streamer = %self.name, file = %invocation.output.display(), "stream saved");
        Ok(CaptureOutcome::Artifact(invocation.output))
    }
}

/// Seconds in a capture duration; must be under a day.
fn duration_secs(duration: &DurationValue) -> Result<u64> {
    let secs = match duration {
        DurationValue::Seconds(n) => *n,
        DurationValue::Text(s) => {
            timefmt::parse_hms(s).map_err(|e| StreamerError::BadDuration(e.to_string()))?
        }
    };
    if secs >= SECS_PER_DAY {
        return Err(StreamerError::BadDuration(format!(
            "{secs} seconds is a day or longer"
        )));
    }
    Ok(secs)
}

fn strip_text(raw: &[u8]) -> String {
    let clean = strip_ansi_escapes::strip(raw);
    String::from_utf8_lossy(&clean).into_owned()
}
