use std::time::{Duration, SystemTime};

/// Howard Hinnant's `days_from_civil`: days since the Unix epoch for a
/// proleptic-Gregorian `(year, month, day)`. Used instead of pulling in a
/// date/time crate for two small conversions (EXIF timestamp parsing,
/// path-template date placeholders).
pub fn days_from_civil(year: i64, month: u32, day: u32) -> Option<i64> {
    if !(1..=12).contains(&month) || day == 0 {
        return None;
    }
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (i64::from(month) + 9) % 12;
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    Some(era * 146_097 + doe - 719_468)
}

/// The inverse of [`days_from_civil`]: `(year, month, day)` for a given
/// days-since-epoch count.
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = if month <= 2 { y + 1 } else { y };
    (year, month, day)
}

/// Parses EXIF's `"YYYY:MM:DD HH:MM:SS"` form (no time zone) into a
/// [`SystemTime`].
pub fn parse_exif_datetime(s: &str) -> Option<SystemTime> {
    let (date_part, time_part) = s.split_once(' ')?;
    let mut date_fields = date_part.splitn(3, ':');
    let year: i64 = date_fields.next()?.parse().ok()?;
    let month: u32 = date_fields.next()?.parse().ok()?;
    let day: u32 = date_fields.next()?.parse().ok()?;

    let mut time_fields = time_part.splitn(3, ':');
    let hour: u64 = time_fields.next()?.parse().ok()?;
    let minute: u64 = time_fields.next()?.parse().ok()?;
    let second: u64 = time_fields.next()?.parse().ok()?;

    let days = days_from_civil(year, month, day)?;
    let secs = (days * 86_400) as u64 + hour * 3600 + minute * 60 + second;
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
}

/// `(year, month, day)` for a [`SystemTime`], clamped to the epoch if it
/// somehow predates it (e.g. a clock-skewed mtime).
pub fn civil_date(time: SystemTime) -> (i64, u32, u32) {
    let days = time.duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_secs() as i64 / 86_400).unwrap_or(0);
    civil_from_days(days)
}
