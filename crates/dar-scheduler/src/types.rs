use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Day of week as used by weekly triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "mon",
            DayOfWeek::Tue => "tue",
            DayOfWeek::Wed => "wed",
            DayOfWeek::Thu => "thu",
            DayOfWeek::Fri => "fri",
            DayOfWeek::Sat => "sat",
            DayOfWeek::Sun => "sun",
        }
    }

    /// Name understood by the cron expression parser.
    pub(crate) fn cron_name(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "Mon",
            DayOfWeek::Tue => "Tue",
            DayOfWeek::Wed => "Wed",
            DayOfWeek::Thu => "Thu",
            DayOfWeek::Fri => "Fri",
            DayOfWeek::Sat => "Sat",
            DayOfWeek::Sun => "Sun",
        }
    }

    fn full_name(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "monday",
            DayOfWeek::Tue => "tuesday",
            DayOfWeek::Wed => "wednesday",
            DayOfWeek::Thu => "thursday",
            DayOfWeek::Fri => "friday",
            DayOfWeek::Sat => "saturday",
            DayOfWeek::Sun => "sunday",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|d| lower == d.as_str() || lower == d.full_name())
            .ok_or_else(|| format!("unknown day of week: {s}"))
    }
}

/// Parse a weekday list such as `"mon,wed"`, `"Mon-Fri"`, `"sat, sun"` or `"*"`.
pub fn parse_days(spec: &str) -> std::result::Result<BTreeSet<DayOfWeek>, String> {
    let mut days = BTreeSet::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if token == "*" {
            days.extend(DayOfWeek::ALL);
        } else if let Some((from, to)) = token.split_once('-') {
            let (from, to): (DayOfWeek, DayOfWeek) = (from.parse()?, to.parse()?);
            if from > to {
                return Err(format!("day range runs backwards: {token}"));
            }
            days.extend(&DayOfWeek::ALL[from.index()..=to.index()]);
        } else {
            days.insert(token.parse()?);
        }
    }
    if days.is_empty() {
        return Err(format!("no days of week in \"{spec}\""));
    }
    Ok(days)
}

/// Defines when a job fires. Wall-clock fields are in local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire once, as soon as the job is added.
    Immediate,

    /// Fire once at the given local instant.
    At { at: NaiveDateTime },

    /// Fire on each listed weekday at `hour:minute:second`.
    Cron {
        days_of_week: BTreeSet<DayOfWeek>,
        hour: u32,
        minute: u32,
        second: u32,
    },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Immediate => write!(f, "date[now]"),
            Trigger::At { at } => write!(f, "date[{at}]"),
            Trigger::Cron {
                days_of_week,
                hour,
                minute,
                second,
            } => {
                let days: Vec<&str> = days_of_week.iter().map(DayOfWeek::as_str).collect();
                write!(
                    f,
                    "cron[day_of_week='{}', hour='{hour}', minute='{minute}', second='{second}']",
                    days.join(",")
                )
            }
        }
    }
}

/// Derived from `next_run_time`: a job without one is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Suspended,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "Queued",
            JobStatus::Suspended => "Suspended",
        };
        write!(f, "{s}")
    }
}

/// A persisted job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Caller-chosen key; at most one live definition per id.
    pub id: String,
    pub name: String,
    pub trigger: Trigger,
    /// Opaque JSON arguments handed to the job runner.
    pub payload: serde_json::Value,
    /// How late a fire may start and still run.
    pub misfire_grace_secs: u64,
    /// `None` while the job is paused.
    pub next_run_time: Option<DateTime<Utc>>,
    pub last_run_time: Option<DateTime<Utc>>,
    pub run_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn paused(&self) -> bool {
        self.next_run_time.is_none()
    }

    pub fn status(&self) -> JobStatus {
        if self.paused() {
            JobStatus::Suspended
        } else {
            JobStatus::Queued
        }
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.next_run_time {
            Some(next) => write!(
                f,
                "{} (trigger: {}, next run at: {})",
                self.name, self.trigger, next
            ),
            None => write!(f, "{} (trigger: {}, paused)", self.name, self.trigger),
        }
    }
}
