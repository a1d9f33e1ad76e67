//! Time formatting utilities.

use chrono::{DateTime, Local, TimeZone};

/// Wall-clock time as `HH:MM:SS` in the local timezone.
#[must_use]
pub fn format_clock<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}
