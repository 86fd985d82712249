use serde::{Deserialize, Serialize};
use std::fmt;

/// Recording schedule kinds accepted in program definitions.
///
/// `Daily` and `Monthly` are reserved: they parse, but nothing resolves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Immediate,
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleKind::Immediate => "immediate",
            ScheduleKind::Once => "once",
            ScheduleKind::Daily => "daily",
            ScheduleKind::Weekly => "weekly",
            ScheduleKind::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

/// A duration as written in config: either bare seconds or a string
/// (`"90"` or `"H:M:S"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    /// Zero and the empty string count as "not given".
    pub fn is_set(&self) -> bool {
        match self {
            DurationValue::Seconds(n) => *n > 0,
            DurationValue::Text(s) => !s.trim().is_empty(),
        }
    }
}

impl From<u64> for DurationValue {
    fn from(n: u64) -> Self {
        DurationValue::Seconds(n)
    }
}

impl From<&str> for DurationValue {
    fn from(s: &str) -> Self {
        DurationValue::Text(s.to_string())
    }
}

/// Declarative schedule of a program, exactly as it appears in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDescriptor {
    #[serde(rename = "type")]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration: Option<DurationValue>,
    /// Comma separated weekday tokens, e.g. `"mon,wed"` or `"mon-fri"`.
    #[serde(default)]
    pub days: Option<String>,
}

impl ScheduleDescriptor {
    pub fn new(kind: ScheduleKind) -> Self {
        Self {
            kind,
            date: None,
            start_time: None,
            end_time: None,
            duration: None,
            days: None,
        }
    }
}

/// An internet radio station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    pub stream_url: String,
    /// Stream content type (e.g. `audio/aacp`); selects the streamer's packaging profile.
    pub media_type: String,
}

/// A recurring (or one-off) recording of a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub station: String,
    pub schedule: ScheduleDescriptor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamerKind {
    #[default]
    Vlc,
}

/// Packaging profile for one media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTypeConfig {
    pub muxer: String,
    pub file_type: String,
}

/// An external stream capture program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerConfig {
    #[serde(default, alias = "subclass")]
    pub kind: StreamerKind,
    #[serde(default = "default_vlc_command")]
    pub command: String,
    #[serde(default)]
    pub media_types: std::collections::BTreeMap<String, MediaTypeConfig>,
    /// Diagnostic messages that do not fail a capture (exact match).
    #[serde(default)]
    pub ignore_errors: Vec<String>,
}

fn default_vlc_command() -> String {
    "cvlc".to_string()
}
