//! dar-streamer — stream capture through an external media player.
//!
//! A [`Streamer`] composes the player command for a [`CaptureRequest`],
//! launches it and classifies the result from the player's diagnostic output:
//!
//! ```rust,no_run
//! use dar_core::DarConfig;
//! use dar_streamer::{streamer_for, CaptureRequest};
//!
//! # async fn demo(config: DarConfig) -> dar_streamer::Result<()> {
//! let vlc = streamer_for("vlc", &config)?;
//! let request = CaptureRequest::new("vlc", "http://example/stream", "audio/aacp", "/rec/kqed", 3600u64);
//! println!("{:?}", vlc.save_stream(&request).await?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod streamer;
pub mod types;
pub mod vlc;

pub use error::{Result, StreamerError};
pub use streamer::{streamer_for, Streamer};
pub use types::{CaptureOutcome, CaptureRequest, Invocation, Verbosity};
pub use vlc::VlcStreamer;
