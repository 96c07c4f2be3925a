//! Date and time helpers shared by the UI and the database layer.

use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Current local time, falling back to UTC when the local offset is unknown.
pub fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

pub fn today() -> Date {
    now().date()
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Formats a time as `HH:MM`.
pub fn format_time(time: Time) -> String {
    time.format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| time.to_string())
}

pub fn format_datetime(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| value.to_string())
}

pub fn parse_date(input: &str) -> Option<Date> {
    Date::parse(input.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn parse_time(input: &str) -> Option<Time> {
    Time::parse(input.trim(), format_description!("[hour]:[minute]")).ok()
}

pub fn parse_datetime(input: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        input.trim(),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .ok()
}

/// Minutes elapsed since midnight.
pub fn minutes_of_day(time: Time) -> u32 {
    u32::from(time.hour()) * 60 + u32::from(time.minute())
}

/// Inverse of [`minutes_of_day`]; `None` past the end of the day.
pub fn time_from_minutes(minutes: u32) -> Option<Time> {
    if minutes >= 24 * 60 {
        return None;
    }
    Time::from_hms((minutes / 60) as u8, (minutes % 60) as u8, 0).ok()
}

/// First day of the month containing `date`.
pub fn month_start(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// Six-digit suffix for generated identifiers: three digits from the clock
/// followed by three random digits.
pub fn unique_suffix(at: PrimitiveDateTime) -> String {
    use rand::Rng;
    let clock = (minutes_of_day(at.time()) * 60 + u32::from(at.second())) % 1000;
    let mut rng = rand::thread_rng();
    format!("{clock:03}{:03}", rng.gen_range(0..1000u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn unique_suffix_is_six_digits() {
        let suffix = unique_suffix(datetime!(2026-03-02 10:20:30));
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        // 37230 seconds into the day
        assert!(suffix.starts_with("230"));
    }

    #[test]
    fn dates_and_times_use_fixed_formats() {
        assert_eq!(format_date(date!(2026 - 03 - 02)), "2026-03-02");
        assert_eq!(format_time(time!(09:05)), "09:05");
        assert_eq!(
            format_datetime(datetime!(2026-03-02 09:05:07)),
            "2026-03-02 09:05:07"
        );
    }

    #[test]
    fn parsing_accepts_padded_input() {
        assert_eq!(parse_date(" 2026-03-02 "), Some(date!(2026 - 03 - 02)));
        assert_eq!(parse_time("14:30"), Some(time!(14:30)));
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_date("02/03/2026"), None);
    }

    #[test]
    fn minute_conversions() {
        assert_eq!(minutes_of_day(time!(10:30)), 630);
        assert_eq!(time_from_minutes(630), Some(time!(10:30)));
        assert_eq!(time_from_minutes(24 * 60), None);
    }

    #[test]
    fn month_start_resets_day() {
        assert_eq!(month_start(date!(2026 - 03 - 17)), date!(2026 - 03 - 01));
    }
}
