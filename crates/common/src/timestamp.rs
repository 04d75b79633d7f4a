//! ISO 8601 timestamps without a date-time dependency

use std::time::{SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: u64 = 86400;
const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Format a `SystemTime` as `YYYY-MM-DDTHH:MM:SSZ` (UTC)
///
/// Times before the Unix epoch clamp to the epoch.
pub fn format_iso8601(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (date, clock) = split(secs);
    format!("{}T{}Z", date, clock)
}

/// Format a `SystemTime` as `YYYY-MM-DDTHH:MM:SS.mmmZ` (UTC)
pub fn format_iso8601_millis(time: SystemTime) -> String {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    let (date, clock) = split(since_epoch.as_secs());
    format!("{}T{}.{:03}Z", date, clock, since_epoch.subsec_millis())
}

fn split(secs: u64) -> (String, String) {
    let days = secs / SECONDS_PER_DAY;
    let remaining = secs % SECONDS_PER_DAY;
    let hours = remaining / SECONDS_PER_HOUR;
    let remaining = remaining % SECONDS_PER_HOUR;
    let minutes = remaining / SECONDS_PER_MINUTE;
    let seconds = remaining % SECONDS_PER_MINUTE;

    let (year, month, day) = days_to_ymd(days);

    (
        format!("{:04}-{:02}-{:02}", year, month, day),
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds),
    )
}

/// Civil date (proleptic Gregorian) from days since the Unix epoch
fn days_to_ymd(days: u64) -> (u32, u32, u32) {
    // Shift to 0000-03-01 so leap days fall at the end of each 400-year era
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let day_of_era = z.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;

    let day = day_of_year - (153 * shifted_month + 2) / 5 + 1;
    let month = if shifted_month < 10 {
        shifted_month + 3
    } else {
        shifted_month - 9
    };
    let year = year_of_era + era * 400 + i64::from(month <= 2);

    (year as u32, month as u32, day as u32)
}
