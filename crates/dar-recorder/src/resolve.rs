//! Schedule descriptor → trigger and capture duration. Pure functions.

use chrono::{NaiveTime, Timelike};
use dar_core::{timefmt, DurationValue, ScheduleDescriptor, ScheduleKind};
use dar_scheduler::{parse_days, Trigger};

use crate::error::{RecorderError, Result};

const SECS_PER_DAY: i64 = 86_400;

/// Trigger for a schedule.
///
/// `Immediate` needs a duration, `Once` a date and start time, `Weekly` days
/// and a start time. `Daily` and `Monthly` are reserved and rejected.
pub fn resolve_trigger(sched: &ScheduleDescriptor) -> Result<Trigger> {
    match sched.kind {
        ScheduleKind::Immediate => {
            if duration_given(sched).is_none() {
                return Err(config(format!("must specify duration for {} schedule", sched.kind)));
            }
            Ok(Trigger::Immediate)
        }
        ScheduleKind::Once => {
            let (Some(date), Some(start)) = (field(&sched.date), field(&sched.start_time)) else {
                return Err(config(format!(
                    "must specify date and start_time for {} schedule",
                    sched.kind
                )));
            };
            Ok(Trigger::At {
                at: timefmt::parse_date_time(date, start)?,
            })
        }
        ScheduleKind::Weekly => {
            let (Some(days), Some(start)) = (field(&sched.days), field(&sched.start_time)) else {
                return Err(config(format!(
                    "must specify days and start_time for {} schedule",
                    sched.kind
                )));
            };
            let days_of_week = parse_days(&days.to_lowercase()).map_err(config)?;
            let start = timefmt::parse_time_of_day(start)?;
            Ok(Trigger::Cron {
                days_of_week,
                hour: start.hour(),
                minute: start.minute(),
                second: start.second(),
            })
        }
        ScheduleKind::Daily | ScheduleKind::Monthly => {
            Err(RecorderError::UnsupportedScheduleType(sched.kind))
        }
    }
}

/// Capture length in seconds, from `duration` or from `end_time - start_time`.
///
/// An end time before the start time crosses midnight. The result is always
/// the seconds-of-day part of the difference, and the whole-day part must be
/// `0` or `-1`.
pub fn resolve_duration(sched: &ScheduleDescriptor) -> Result<u64> {
    let delta = match (duration_given(sched), field(&sched.end_time)) {
        (Some(_), Some(_)) => {
            return Err(config("may not specify both duration and end_time".into()));
        }
        (Some(DurationValue::Seconds(n)), None) => i64::try_from(*n)
            .map_err(|_| config(format!("duration {n} out of range")))?,
        (Some(DurationValue::Text(s)), None) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<i64>()
                    .map_err(|_| config(format!("duration \"{s}\" out of range")))?
            } else {
                let secs = timefmt::parse_hms(s)?;
                i64::try_from(secs).map_err(|_| config(format!("duration \"{s}\" out of range")))?
            }
        }
        (None, Some(end)) => {
            let Some(start) = field(&sched.start_time) else {
                return Err(config("must specify start_time if end_time specified".into()));
            };
            time_delta(timefmt::parse_time_of_day(start)?, timefmt::parse_time_of_day(end)?)
        }
        (None, None) => {
            return Err(config("must specify either duration or end_time".into()));
        }
    };

    let days = delta.div_euclid(SECS_PER_DAY);
    if days != 0 && days != -1 {
        return Err(config(format!(
            "duration of {delta} seconds does not fit in one day"
        )));
    }
    Ok(delta.rem_euclid(SECS_PER_DAY) as u64)
}

fn time_delta(start: NaiveTime, end: NaiveTime) -> i64 {
    (end - start).num_seconds()
}

fn duration_given(sched: &ScheduleDescriptor) -> Option<&DurationValue> {
    sched.duration.as_ref().filter(|d| d.is_set())
}

fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn config(msg: String) -> RecorderError {
    RecorderError::Config(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dar_scheduler::DayOfWeek;

    fn sched(kind: ScheduleKind) -> ScheduleDescriptor {
        ScheduleDescriptor::new(kind)
    }

    fn with_duration(d: impl Into<DurationValue>) -> ScheduleDescriptor {
        ScheduleDescriptor {
            duration: Some(d.into()),
            ..sched(ScheduleKind::Immediate)
        }
    }

    #[test]
    fn duration_from_number_or_text() {
        assert_eq!(resolve_duration(&with_duration(90u64)).unwrap(), 90);
        assert_eq!(resolve_duration(&with_duration("90")).unwrap(), 90);
        assert_eq!(resolve_duration(&with_duration("1:30:00")).unwrap(), 5400);
    }

    #[test]
    fn duration_from_end_time_crossing_midnight() {
        let s = ScheduleDescriptor {
            start_time: Some("23:00:00".into()),
            end_time: Some("01:00:00".into()),
            ..sched(ScheduleKind::Weekly)
        };
        assert_eq!(resolve_duration(&s).unwrap(), 7200);

        let s = ScheduleDescriptor {
            start_time: Some("07:00".into()),
            end_time: Some("09:30".into()),
            ..sched(ScheduleKind::Weekly)
        };
        assert_eq!(resolve_duration(&s).unwrap(), 9000);
    }

    #[test]
    fn duration_rejects_both_neither_or_orphan_end() {
        let both = ScheduleDescriptor {
            start_time: Some("07:00:00".into()),
            end_time: Some("08:00:00".into()),
            ..with_duration(60u64)
        };
        assert!(matches!(resolve_duration(&both), Err(RecorderError::Config(_))));
        assert!(matches!(
            resolve_duration(&sched(ScheduleKind::Once)),
            Err(RecorderError::Config(_))
        ));

        let orphan = ScheduleDescriptor {
            end_time: Some("08:00:00".into()),
            ..sched(ScheduleKind::Once)
        };
        assert!(matches!(resolve_duration(&orphan), Err(RecorderError::Config(_))));
    }

    #[test]
    fn zero_or_empty_duration_counts_as_missing() {
        assert!(resolve_duration(&with_duration(0u64)).is_err());
        assert!(resolve_duration(&with_duration("")).is_err());
        assert!(resolve_trigger(&with_duration(0u64)).is_err());
    }

    #[test]
    fn duration_of_a_day_or_more_is_rejected() {
        assert!(resolve_duration(&with_duration(86_399u64)).is_ok());
        assert!(resolve_duration(&with_duration(86_400u64)).is_err());
        assert!(resolve_duration(&with_duration("25:00:00")).is_err());
    }

    #[test]
    fn oversized_hms_duration_is_a_config_error() {
        assert!(matches!(
            resolve_duration(&with_duration("9999999999999999:00:00")),
            Err(RecorderError::Config(_))
        ));
    }

    #[test]
    fn once_resolves_to_single_fire() {
        let s = ScheduleDescriptor {
            date: Some("2024-01-01".into()),
            start_time: Some("09:00:00".into()),
            ..sched(ScheduleKind::Once)
        };
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(resolve_trigger(&s).unwrap(), Trigger::At { at: expected });

        let missing_date = ScheduleDescriptor {
            date: None,
            ..s
        };
        assert!(matches!(
            resolve_trigger(&missing_date),
            Err(RecorderError::Config(_))
        ));
    }

    #[test]
    fn weekly_resolves_to_cron() {
        let s = ScheduleDescriptor {
            days: Some("Mon,WED".into()),
            start_time: Some("07:30:00".into()),
            ..sched(ScheduleKind::Weekly)
        };
        assert_eq!(
            resolve_trigger(&s).unwrap(),
            Trigger::Cron {
                days_of_week: [DayOfWeek::Mon, DayOfWeek::Wed].into_iter().collect(),
                hour: 7,
                minute: 30,
                second: 0,
            }
        );
    }

    #[test]
    fn immediate_needs_duration() {
        assert_eq!(resolve_trigger(&with_duration(60u64)).unwrap(), Trigger::Immediate);
        assert!(matches!(
            resolve_trigger(&sched(ScheduleKind::Immediate)),
            Err(RecorderError::Config(_))
        ));
    }

    #[test]
    fn reserved_kinds_are_unsupported() {
        for kind in [ScheduleKind::Daily, ScheduleKind::Monthly] {
            assert!(matches!(
                resolve_trigger(&sched(kind)),
                Err(RecorderError::UnsupportedScheduleType(k)) if k == kind
            ));
        }
    }
}
