//! `dar-core` — configuration, shared config types and time parsing for the
//! digital audio recorder.

pub mod cache;
pub mod config;
pub mod error;
pub mod timefmt;
pub mod types;

pub use cache::ConfigCache;
pub use config::DarConfig;
pub use error::{DarError, Result};
pub use types::{
    DurationValue, MediaTypeConfig, ProgramConfig, ScheduleDescriptor, ScheduleKind,
    StationConfig, StreamerConfig, StreamerKind,
};
