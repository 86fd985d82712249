//! Shared data types for dar-streamer.

use std::fmt;
use std::path::PathBuf;

use dar_core::DurationValue;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Verbosity
// ---------------------------------------------------------------------------

/// Capture program verbosity: a flag (`true` = level 1) or a level 0-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Verbosity {
    Flag(bool),
    Level(u8),
}

impl Verbosity {
    pub const MAX_LEVEL: u8 = 3;

    /// Number of `v`s in the verbosity switch, clamped to [`Self::MAX_LEVEL`].
    pub fn count(self) -> usize {
        let level = match self {
            Verbosity::Flag(on) => u8::from(on),
            Verbosity::Level(n) => n,
        };
        usize::from(level.min(Self::MAX_LEVEL))
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Flag(false)
    }
}

impl From<bool> for Verbosity {
    fn from(on: bool) -> Self {
        Verbosity::Flag(on)
    }
}

impl From<u8> for Verbosity {
    fn from(n: u8) -> Self {
        Verbosity::Level(n)
    }
}

// ---------------------------------------------------------------------------
// CaptureRequest
// ---------------------------------------------------------------------------

/// Everything needed to capture one stream to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Streamer entry in the config.
    pub streamer_name: String,
    /// Config profile the streamer entry is read from.
    pub cfg_profile: Option<String>,
    pub url: String,
    pub media_type: String,
    /// Output path without the file type.
    pub filebase: String,
    /// Seconds, or `H:M:S` text.
    pub duration: DurationValue,
    /// Append a `%m%d%H%M` stamp to `filebase`.
    pub add_timestamp: bool,
    /// Overwrite an existing output file.
    pub force: bool,
    pub verbose: Verbosity,
    /// Compose the command line only; nothing is launched.
    pub dryrun: bool,
}

impl CaptureRequest {
    pub fn new(
        streamer_name: impl Into<String>,
        url: impl Into<String>,
        media_type: impl Into<String>,
        filebase: impl Into<String>,
        duration: impl Into<DurationValue>,
    ) -> Self {
        Self {
            streamer_name: streamer_name.into(),
            cfg_profile: None,
            url: url.into(),
            media_type: media_type.into(),
            filebase: filebase.into(),
            duration: duration.into(),
            add_timestamp: false,
            force: false,
            verbose: Verbosity::default(),
            dryrun: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation / CaptureOutcome
// ---------------------------------------------------------------------------

/// A fully composed capture command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// File the capture writes to.
    pub output: PathBuf,
}

impl Invocation {
    /// Space-joined command line, as printed by a dry run.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Result of one capture execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// The capture ran cleanly and wrote this file.
    Artifact(PathBuf),
    /// The first non-ignored diagnostic error, or the exit failure.
    Failed(String),
    /// Dry run: the command line that would have been launched.
    DryRun(String),
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, CaptureOutcome::Failed(_))
    }
}
