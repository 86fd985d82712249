//! `dar-scheduler` — persistent job store and trigger engine.
//!
//! # Overview
//!
//! Jobs live in the SQLite `dar_jobs` table managed by [`store::JobStore`].
//! The [`engine::SchedulerEngine`] polls the store, hands due jobs to a
//! [`engine::JobRunner`] and moves each job to its next fire time. A job with
//! no further fire is removed; a paused job has no next fire at all.
//!
//! # Triggers
//!
//! | Variant     | Behaviour                                             |
//! |-------------|-------------------------------------------------------|
//! | `Immediate` | Single fire on the next engine tick                   |
//! | `At`        | Single fire at a local wall-clock date-time           |
//! | `Cron`      | Repeating fire on listed weekdays at a local time     |

pub mod db;
pub mod engine;
pub mod error;
pub mod events;
pub mod schedule;
pub mod store;
pub mod types;

pub use engine::{Detached, JobRunner, SchedulerEngine};
pub use error::{Result, SchedulerError};
pub use events::{EventSink, JobEvent};
pub use store::JobStore;
pub use types::{parse_days, DayOfWeek, JobRecord, JobStatus, Trigger};
