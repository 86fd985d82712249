use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::types::{DayOfWeek, Trigger};

/// Check that `trigger` can be evaluated.
pub fn validate(trigger: &Trigger) -> Result<()> {
    match trigger {
        Trigger::Immediate => Ok(()),
        Trigger::At { at } => local_to_utc(at)
            .map(|_| ())
            .ok_or_else(|| SchedulerError::InvalidTrigger(format!("{at} does not exist locally"))),
        Trigger::Cron { .. } => cron_schedule(trigger).map(|_| ()),
    }
}

/// Time of the first fire for a job added at `now`.
///
/// A single-fire instant that already passed is still returned; whether it
/// runs is decided by the misfire grace window at dispatch.
pub fn first_fire_time(trigger: &Trigger, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match trigger {
        Trigger::Immediate => Some(now),
        Trigger::At { at } => local_to_utc(at),
        Trigger::Cron { .. } => next_fire_time(trigger, now),
    }
}

/// Next fire strictly after `after`, or `None` once the trigger is exhausted.
pub fn next_fire_time(trigger: &Trigger, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match trigger {
        Trigger::Immediate => None,
        Trigger::At { at } => local_to_utc(at).filter(|t| *t > after),
        Trigger::Cron { .. } => {
            let schedule = match cron_schedule(trigger) {
                Ok(s) => s,
                Err(e) => {
                    warn!("cron trigger cannot be evaluated: {e}");
                    return None;
                }
            };
            schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|t| t.with_timezone(&Utc))
        }
    }
}

/// Six-field expression (`sec min hour dom month dow`) for a weekly trigger.
pub fn cron_expression(trigger: &Trigger) -> Option<String> {
    match trigger {
        Trigger::Cron {
            days_of_week,
            hour,
            minute,
            second,
        } => {
            let days: Vec<&str> = days_of_week.iter().map(DayOfWeek::cron_name).collect();
            Some(format!("{second} {minute} {hour} * * {}", days.join(",")))
        }
        _ => None,
    }
}

fn cron_schedule(trigger: &Trigger) -> Result<cron::Schedule> {
    if let Trigger::Cron {
        days_of_week,
        hour,
        minute,
        second,
    } = trigger
    {
        if days_of_week.is_empty() || *hour > 23 || *minute > 59 || *second > 59 {
            return Err(SchedulerError::InvalidTrigger(trigger.to_string()));
        }
    }
    let expr = cron_expression(trigger)
        .ok_or_else(|| SchedulerError::InvalidTrigger(trigger.to_string()))?;
    cron::Schedule::from_str(&expr)
        .map_err(|e| SchedulerError::InvalidTrigger(format!("{expr}: {e}")))
}

fn local_to_utc(at: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(at)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_days;
    use chrono::{Datelike, Duration, NaiveDate, Timelike, Weekday};

    fn weekly(days: &str, hour: u32, minute: u32) -> Trigger {
        Trigger::Cron {
            days_of_week: parse_days(days).unwrap(),
            hour,
            minute,
            second: 0,
        }
    }

    #[test]
    fn cron_expression_lists_days() {
        assert_eq!(
            cron_expression(&weekly("wed,mon", 7, 30)).as_deref(),
            Some("0 30 7 * * Mon,Wed")
        );
        assert!(cron_expression(&Trigger::Immediate).is_none());
    }

    #[test]
    fn weekly_next_fire_lands_on_listed_day_and_time() {
        let trigger = weekly("mon,wed", 7, 30);
        let now = Utc::now();
        let next = next_fire_time(&trigger, now).unwrap();
        assert!(next > now);
        assert!(next - now <= Duration::days(7));

        let local = next.with_timezone(&Local);
        assert!(matches!(local.weekday(), Weekday::Mon | Weekday::Wed));
        assert_eq!((local.hour(), local.minute(), local.second()), (7, 30, 0));

        let following = next_fire_time(&trigger, next).unwrap();
        assert!(following > next);
    }

    #[test]
    fn at_fires_once() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let trigger = Trigger::At { at };
        let fire = first_fire_time(&trigger, Utc::now()).unwrap();
        assert_eq!(fire.with_timezone(&Local).naive_local(), at);

        // before the instant the fire is still ahead, after it the trigger is spent
        assert_eq!(next_fire_time(&trigger, fire - Duration::seconds(1)), Some(fire));
        assert_eq!(next_fire_time(&trigger, fire), None);
    }

    #[test]
    fn immediate_fires_now_then_never() {
        let now = Utc::now();
        assert_eq!(first_fire_time(&Trigger::Immediate, now), Some(now));
        assert_eq!(next_fire_time(&Trigger::Immediate, now), None);
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        assert!(validate(&weekly("mon", 24, 0)).is_err());
        assert!(validate(&weekly("mon", 23, 59)).is_ok());
        let empty = Trigger::Cron {
            days_of_week: Default::default(),
            hour: 1,
            minute: 0,
            second: 0,
        };
        assert!(validate(&empty).is_err());
    }
}
