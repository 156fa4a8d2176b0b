//! Cron-style schedules and clocks
//!
//! Only the two cron shapes the maintenance jobs use are supported:
//! `M H * * *` (daily at a local time) and `*/N * * * *` (every N minutes,
//! aligned to the top of the hour).

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use std::fmt;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Daily { hour: u32, minute: u32 },
    EveryMinutes(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleError(String);

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ScheduleError {}

fn bounded(raw: &str, max: u32, what: &str) -> Result<u32, ScheduleError> {
    raw.parse::<u32>()
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| ScheduleError(format!("{what} must be a number between 0 and {max}")))
}

impl Schedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ScheduleError(format!(
                "expected 5 cron fields, got {} in '{expr}'",
                fields.len()
            )));
        }
        if fields[2..].iter().any(|f| *f != "*") {
            return Err(ScheduleError(
                "day-of-month, month and day-of-week must be '*'".to_string(),
            ));
        }

        if let Some(step) = fields[0].strip_prefix("*/") {
            if fields[1] != "*" {
                return Err(ScheduleError(
                    "minute steps require the hour field to be '*'".to_string(),
                ));
            }
            let step = step
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=59).contains(n))
                .ok_or_else(|| {
                    ScheduleError("minute step must be between 1 and 59".to_string())
                })?;
            return Ok(Schedule::EveryMinutes(step));
        }

        Ok(Schedule::Daily {
            minute: bounded(fields[0], 59, "minute")?,
            hour: bounded(fields[1], 23, "hour")?,
        })
    }

    /// First firing strictly after `now`, evaluated in the given local offset.
    pub fn next_after(&self, now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
        let local = now.with_timezone(&offset).naive_local();
        let next_local = match *self {
            Schedule::Daily { hour, minute } => {
                let today = local.date().and_hms_opt(hour, minute, 0).unwrap_or(local);
                if today > local {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Schedule::EveryMinutes(step) => {
                let mut candidate = truncate_to_minute(local) + Duration::minutes(1);
                while candidate.minute() % step != 0 {
                    candidate += Duration::minutes(1);
                }
                candidate
            }
        };
        to_utc(next_local, offset)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Daily { hour, minute } => write!(f, "{minute} {hour} * * *"),
            Schedule::EveryMinutes(step) => write!(f, "*/{step} * * * *"),
        }
    }
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    // A fixed offset maps every local time to exactly one instant.
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manila() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_supported_shapes() {
        assert_eq!(
            Schedule::parse("0 2 * * *").unwrap(),
            Schedule::Daily { hour: 2, minute: 0 }
        );
        assert_eq!(
            Schedule::parse("*/14 * * * *").unwrap(),
            Schedule::EveryMinutes(14)
        );
        assert!(Schedule::parse("0 2 * * 1").is_err());
        assert!(Schedule::parse("*/0 * * * *").is_err());
        assert!(Schedule::parse("*/5 3 * * *").is_err());
        assert!(Schedule::parse("61 2 * * *").is_err());
        assert!(Schedule::parse("0 2 *").is_err());
    }

    #[test]
    fn daily_fires_at_local_time() {
        let schedule = Schedule::Daily { hour: 2, minute: 0 };
        // 01:30 Manila -> 02:00 Manila the same day (18:00 UTC the day before)
        let now = utc("2024-03-09T17:30:00Z");
        assert_eq!(
            schedule.next_after(now, manila()),
            utc("2024-03-09T18:00:00Z")
        );
        // Exactly at the firing time -> next day
        let now = utc("2024-03-09T18:00:00Z");
        assert_eq!(
            schedule.next_after(now, manila()),
            utc("2024-03-10T18:00:00Z")
        );
    }

    #[test]
    fn every_minutes_aligns_to_hour() {
        let schedule = Schedule::EveryMinutes(14);
        assert_eq!(
            schedule.next_after(utc("2024-03-09T10:15:30Z"), manila()),
            utc("2024-03-09T10:28:00Z")
        );
        // */14 fires at :56 then wraps to :00
        assert_eq!(
            schedule.next_after(utc("2024-03-09T10:56:00Z"), manila()),
            utc("2024-03-09T11:00:00Z")
        );
    }

    #[test]
    fn display_round_trips_to_cron() {
        assert_eq!(Schedule::Daily { hour: 2, minute: 0 }.to_string(), "0 2 * * *");
        assert_eq!(Schedule::EveryMinutes(14).to_string(), "*/14 * * * *");
    }
}
