//! Fire-key math and dueness checks.
//!
//! A fire key names one calendar occurrence of a slot: `YYYY-MM-DD-HH:MM`.
//! Manual triggers use the sentinel `YYYY-MM-DD-MANUAL`, which can never
//! collide with a numeric key, so automatic slots still fire at their own
//! times on the same day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::types::ScheduleEntry;

/// Dedupe key for one calendar occurrence of a daily slot.
pub fn fire_key(date: NaiveDate, hour: u8, minute: u8) -> String {
    format!("{}-{hour:02}:{minute:02}", date.format("%Y-%m-%d"))
}

/// Sentinel key stamped on every slot of a channel after a manual reset.
pub fn manual_fire_key(date: NaiveDate) -> String {
    format!("{}-MANUAL", date.format("%Y-%m-%d"))
}

/// A slot is due iff the clock reads exactly its hour:minute and the ledger
/// does not already hold this minute's key.
pub fn is_due(entry: &ScheduleEntry, now: DateTime<Tz>) -> bool {
    now.hour() == u32::from(entry.hour)
        && now.minute() == u32::from(entry.minute)
        && entry.last_fired.as_deref() != Some(&fire_key(now.date_naive(), entry.hour, entry.minute))
}

/// Next wall-clock instant this slot will fire: today at HH:MM, or tomorrow
/// once today's window has passed. Skips forward across a DST gap where the
/// local time does not exist.
pub fn next_fire_time(entry: &ScheduleEntry, now: DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = at_local_time(tz, date, entry.hour, entry.minute) {
            if candidate > now {
                return candidate;
            }
        }
        date += Duration::days(1);
    }
    // Three consecutive non-existent local times cannot happen; the loop
    // above always returns by the second iteration outside a DST gap.
    now + Duration::days(1)
}

fn at_local_time(tz: Tz, date: NaiveDate, hour: u8, minute: u8) -> Option<DateTime<Tz>> {
    tz.with_ymd_and_hms(
        date.year(),
        date.month(),
        date.day(),
        u32::from(hour),
        u32::from(minute),
        0,
    )
    .earliest()
}
