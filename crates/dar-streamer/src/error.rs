//! Error types for the dar-streamer crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamerError {
    /// No streamer of this name in the config, or it names an unknown kind.
    #[error("streamer \"{0}\" not known")]
    UnknownStreamer(String),

    #[error("media type \"{media_type}\" not defined for streamer \"{streamer}\"")]
    UnknownMediaType { media_type: String, streamer: String },

    /// Duration text that does not parse, or a capture of a day or longer.
    #[error("bad capture duration: {0}")]
    BadDuration(String),

    /// The capture program could not be started at all.
    #[error("cannot launch \"{command}\": {source}")]
    ProcessLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl StreamerError {
    pub fn code(&self) -> &'static str {
        match self {
            StreamerError::UnknownStreamer(_) => "UNKNOWN_STREAMER",
            StreamerError::UnknownMediaType { .. } => "UNKNOWN_MEDIA_TYPE",
            StreamerError::BadDuration(_) => "BAD_DURATION",
            StreamerError::ProcessLaunch { .. } => "PROCESS_LAUNCH",
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamerError>;
