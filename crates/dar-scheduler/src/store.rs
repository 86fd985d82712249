use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::{
    db::init_db,
    error::{Result, SchedulerError},
    events::{EventSink, JobEvent},
    schedule::{first_fire_time, next_fire_time, validate},
    types::{JobRecord, Trigger},
};

const SELECT_COLUMNS: &str = "SELECT id, name, trigger, payload, misfire_grace_secs, next_run,
                                     last_run, run_count, created_at, updated_at
                              FROM dar_jobs";

/// SQLite-backed job store keyed by job id.
///
/// Cheap to clone: clones share one connection behind a mutex, so the engine
/// loop, running jobs and API callers all see the same rows.
#[derive(Clone)]
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
    events: EventSink,
}

impl JobStore {
    pub fn new(conn: Connection, events: EventSink) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            events,
        })
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path, events: EventSink) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=3000;")?;
        debug!(path = %path.display(), "job store opened");
        Self::new(conn, events)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?, EventSink::none())
    }

    /// Insert a job, or replace the definition of the job with the same id.
    ///
    /// Replacing keeps run history (`last_run`, `run_count`, `created_at`) and
    /// recomputes the next run from the new trigger.
    pub fn add_or_replace(
        &self,
        id: &str,
        name: &str,
        trigger: &Trigger,
        payload: &serde_json::Value,
        misfire_grace_secs: u64,
    ) -> Result<JobRecord> {
        validate(trigger)?;
        let now = Utc::now();
        let now_str = ts(now);
        let next = first_fire_time(trigger, now).map(ts);
        let trigger_json = serde_json::to_string(trigger)?;
        let payload_json = serde_json::to_string(payload)?;

        let existed = {
            let conn = self.conn();
            let existed = conn
                .query_row("SELECT 1 FROM dar_jobs WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();
            conn.execute(
                "INSERT INTO dar_jobs
                 (id, name, trigger, payload, misfire_grace_secs, next_run, last_run,
                  run_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     trigger = excluded.trigger,
                     payload = excluded.payload,
                     misfire_grace_secs = excluded.misfire_grace_secs,
                     next_run = excluded.next_run,
                     updated_at = excluded.updated_at",
                rusqlite::params![
                    id,
                    name,
                    trigger_json,
                    payload_json,
                    misfire_grace_secs as i64,
                    next,
                    now_str
                ],
            )?;
            existed
        };

        if existed {
            info!(job_id = %id, %trigger, "job replaced");
            self.events.emit(JobEvent::JobModified { job_id: id.to_string() });
        } else {
            info!(job_id = %id, %trigger, "job added");
            self.events.emit(JobEvent::JobAdded { job_id: id.to_string() });
        }
        self.require(id)
    }

    pub fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        let conn = self.conn();
        let raw = conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], RawJob::from_row)
            .optional()?;
        raw.map(RawJob::decode).transpose()
    }

    /// All jobs: queued ones by next run time, then paused ones.
    pub fn list(&self) -> Result<Vec<JobRecord>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY next_run IS NULL, next_run, id"))?;
        let raws = stmt
            .query_map([], RawJob::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawJob::decode).collect()
    }

    pub fn ids(&self) -> Result<BTreeSet<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM dar_jobs")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(ids)
    }

    /// Suspend a job in place: the definition stays, the next run is cleared.
    pub fn pause(&self, id: &str) -> Result<JobRecord> {
        let n = self.conn().execute(
            "UPDATE dar_jobs SET next_run = NULL, updated_at = ?1 WHERE id = ?2",
            rusqlite::params![ts(Utc::now()), id],
        )?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, "job paused");
        self.events.emit(JobEvent::JobPaused { job_id: id.to_string() });
        self.require(id)
    }

    /// Requeue a paused job from its trigger. A job whose trigger has nothing
    /// left to fire is removed instead, and `None` is returned.
    pub fn resume(&self, id: &str) -> Result<Option<JobRecord>> {
        let job = self.require(id)?;
        let now = Utc::now();
        match next_fire_time(&job.trigger, now) {
            Some(next) => {
                self.conn().execute(
                    "UPDATE dar_jobs SET next_run = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![ts(next), ts(now), id],
                )?;
                info!(job_id = %id, next_run = %next, "job resumed");
                self.events.emit(JobEvent::JobResumed { job_id: id.to_string() });
                self.get(id)
            }
            None => {
                self.remove(id)?;
                Ok(None)
            }
        }
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let n = self.conn().execute("DELETE FROM dar_jobs WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id: id.to_string() });
        }
        info!(job_id = %id, "job removed");
        self.events.emit(JobEvent::JobRemoved { job_id: id.to_string() });
        Ok(())
    }

    /// Jobs whose next run is at or before `now`.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<JobRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "{SELECT_COLUMNS} WHERE next_run IS NOT NULL AND next_run <= ?1 ORDER BY next_run"
        ))?;
        let raws = stmt
            .query_map([ts(now)], RawJob::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawJob::decode).collect()
    }

    /// Move a job past the fire at `fired`: set its next run, or remove it when
    /// `next` is `None`.
    ///
    /// Only applies while the row still holds `fired` as its next run, so a
    /// replace or pause that landed in between wins. Returns whether a row changed.
    pub fn advance(
        &self,
        id: &str,
        fired: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let conn = self.conn();
        let n = match next {
            Some(next) => conn.execute(
                "UPDATE dar_jobs SET next_run = ?1 WHERE id = ?2 AND next_run = ?3",
                rusqlite::params![ts(next), id, ts(fired)],
            )?,
            None => conn.execute(
                "DELETE FROM dar_jobs WHERE id = ?1 AND next_run = ?2",
                rusqlite::params![id, ts(fired)],
            )?,
        };
        drop(conn);
        if n > 0 && next.is_none() {
            debug!(job_id = %id, "trigger exhausted");
            self.events.emit(JobEvent::JobRemoved { job_id: id.to_string() });
        }
        Ok(n > 0)
    }

    /// Note a run that started at `at`.
    pub fn record_run(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "UPDATE dar_jobs SET last_run = ?1, run_count = run_count + 1 WHERE id = ?2",
            rusqlite::params![ts(at), id],
        )?;
        Ok(())
    }

    fn require(&self, id: &str) -> Result<JobRecord> {
        self.get(id)?
            .ok_or_else(|| SchedulerError::JobNotFound { id: id.to_string() })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-width UTC timestamps so stored values compare correctly as text.
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SchedulerError::Serialization(format!("bad timestamp \"{s}\": {e}")))
}

/// Row as stored, before JSON and timestamp decoding.
struct RawJob {
    id: String,
    name: String,
    trigger: String,
    payload: String,
    misfire_grace_secs: i64,
    next_run: Option<String>,
    last_run: Option<String>,
    run_count: u32,
    created_at: String,
    updated_at: String,
}

impl RawJob {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            trigger: row.get(2)?,
            payload: row.get(3)?,
            misfire_grace_secs: row.get(4)?,
            next_run: row.get(5)?,
            last_run: row.get(6)?,
            run_count: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<JobRecord> {
        Ok(JobRecord {
            trigger: serde_json::from_str(&self.trigger)?,
            payload: serde_json::from_str(&self.payload)?,
            misfire_grace_secs: self.misfire_grace_secs.max(0) as u64,
            next_run_time: self.next_run.as_deref().map(parse_ts).transpose()?,
            last_run_time: self.last_run.as_deref().map(parse_ts).transpose()?,
            run_count: self.run_count,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            id: self.id,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_days;
    use chrono::{Duration, NaiveDate};
    use serde_json::json;

    fn weekly() -> Trigger {
        Trigger::Cron {
            days_of_week: parse_days("mon,wed").unwrap(),
            hour: 7,
            minute: 30,
            second: 0,
        }
    }

    #[test]
    fn add_then_replace_keeps_one_definition() {
        let store = JobStore::open_in_memory().unwrap();
        let job = store
            .add_or_replace("morning", "morning", &weekly(), &json!(["vlc", 1]), 300)
            .unwrap();
        assert!(!job.paused());
        assert_eq!(job.misfire_grace_secs, 300);
        assert_eq!(job.payload, json!(["vlc", 1]));

        let replaced = store
            .add_or_replace("morning", "morning", &weekly(), &json!(["vlc", 2]), 60)
            .unwrap();
        assert_eq!(replaced.payload, json!(["vlc", 2]));
        assert_eq!(replaced.created_at, job.created_at);
        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.ids().unwrap().into_iter().collect::<Vec<_>>(), vec!["morning"]);
    }

    #[test]
    fn pause_keeps_definition_and_resume_requeues() {
        let store = JobStore::open_in_memory().unwrap();
        store.add_or_replace("a", "a", &weekly(), &json!([]), 300).unwrap();

        let paused = store.pause("a").unwrap();
        assert!(paused.paused());
        assert_eq!(paused.trigger, weekly());
        assert!(store.due(Utc::now() + Duration::days(30)).unwrap().is_empty());

        let resumed = store.resume("a").unwrap().unwrap();
        assert!(!resumed.paused());
    }

    #[test]
    fn resume_of_spent_single_fire_removes_job() {
        let store = JobStore::open_in_memory().unwrap();
        let at = NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        store.add_or_replace("old", "old", &Trigger::At { at }, &json!([]), 300).unwrap();
        store.pause("old").unwrap();
        assert!(store.resume("old").unwrap().is_none());
        assert!(store.get("old").unwrap().is_none());
    }

    #[test]
    fn missing_job_errors() {
        let store = JobStore::open_in_memory().unwrap();
        assert!(matches!(store.pause("x"), Err(SchedulerError::JobNotFound { .. })));
        assert!(matches!(store.remove("x"), Err(SchedulerError::JobNotFound { .. })));
        assert!(store.get("x").unwrap().is_none());
    }

    #[test]
    fn advance_is_compare_and_set() {
        let store = JobStore::open_in_memory().unwrap();
        let job = store
            .add_or_replace("now", "now", &Trigger::Immediate, &json!([]), 300)
            .unwrap();
        let fired = job.next_run_time.unwrap();
        assert_eq!(store.due(fired).unwrap().len(), 1);

        // a stale fire time does not touch the row
        assert!(!store.advance("now", fired - Duration::seconds(5), None).unwrap());
        assert!(store.get("now").unwrap().is_some());

        assert!(store.advance("now", fired, None).unwrap());
        assert!(store.get("now").unwrap().is_none());
    }

    #[test]
    fn list_orders_paused_last() {
        let store = JobStore::open_in_memory().unwrap();
        store.add_or_replace("a", "a", &weekly(), &json!([]), 300).unwrap();
        store.add_or_replace("b", "b", &Trigger::Immediate, &json!([]), 300).unwrap();
        store.pause("b").unwrap();
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn record_run_counts() {
        let store = JobStore::open_in_memory().unwrap();
        store.add_or_replace("a", "a", &weekly(), &json!([]), 300).unwrap();
        let at = Utc::now();
        store.record_run("a", at).unwrap();
        let job = store.get("a").unwrap().unwrap();
        assert_eq!(job.run_count, 1);
        assert_eq!(job.last_run_time.map(|t| t.timestamp()), Some(at.timestamp()));
    }
}
