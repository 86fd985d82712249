//! `dar-recorder` — the digital audio recorder core.
//!
//! - [`resolve`]: schedule descriptor → trigger and capture duration
//! - [`reconcile`]: program config → job store (create / update / pause)
//! - [`payload`]: the positional capture arguments stored with each job and
//!   the runner that executes them
//! - [`recorder`]: the lifecycle state machine the CLI and HTTP layers drive

pub mod error;
pub mod payload;
pub mod reconcile;
pub mod recorder;
pub mod resolve;

pub use error::{RecorderError, Result};
pub use payload::{CapturePayload, CaptureRunner};
pub use reconcile::{reconcile, Registrar, ReloadOptions, ReloadResult};
pub use recorder::{Recorder, RecorderInfo, RecorderSettings, RecorderState};
pub use resolve::{resolve_duration, resolve_trigger};
