//! Reminder fire-time calculation.

use crate::model::parse_date_time;
use chrono::{DateTime, Duration, Utc};

/// How long before an appointment its reminder fires, in hours.
pub const REMINDER_LEAD_HOURS: i64 = 24;

/// [`REMINDER_LEAD_HOURS`] as a duration.
pub fn reminder_lead() -> Duration {
    Duration::hours(REMINDER_LEAD_HOURS)
}

/// Returns the instant a reminder for an appointment at `appointment_date_time`
/// should fire, or `None` when no reminder should exist.
///
/// `None` covers both an unparseable appointment time and a fire time at or
/// before `now` (the reminder has already been missed).
pub fn compute_trigger_instant(
    appointment_date_time: &str,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let appointment_at = parse_date_time(appointment_date_time)?;
    let trigger_at = appointment_at.checked_sub_signed(reminder_lead())?;
    (trigger_at > now).then_some(trigger_at)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn fires_one_day_before() {
        let now = at(2026, 3, 1, 0, 0);
        assert_eq!(
            compute_trigger_instant("2026-03-15T14:30:00", now),
            Some(at(2026, 3, 14, 14, 30))
        );
    }

    #[test]
    fn appointment_ten_hours_away_gets_no_reminder() {
        let now = Utc::now();
        let soon = (now + Duration::hours(10)).to_rfc3339();
        assert_eq!(compute_trigger_instant(&soon, now), None);
    }

    #[test]
    fn trigger_exactly_now_is_suppressed() {
        let now = at(2026, 3, 14, 14, 30);
        assert_eq!(compute_trigger_instant("2026-03-15T14:30:00Z", now), None);
        let just_before = now - Duration::seconds(1);
        assert_eq!(
            compute_trigger_instant("2026-03-15T14:30:00Z", just_before),
            Some(now)
        );
    }

    #[test]
    fn invalid_date_gets_no_reminder() {
        let now = at(2026, 3, 1, 0, 0);
        assert_eq!(compute_trigger_instant("not a date", now), None);
        assert_eq!(compute_trigger_instant("", now), None);
    }

    #[test]
    fn offset_is_respected() {
        let now = at(2026, 3, 1, 0, 0);
        assert_eq!(
            compute_trigger_instant("2026-03-20T09:00:00-05:00", now),
            Some(at(2026, 3, 19, 14, 0))
        );
    }
}
