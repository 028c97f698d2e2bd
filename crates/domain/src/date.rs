use chrono::{prelude::*, SecondsFormat};

const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

pub fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 100 != 0 && year % 4 == 0)
}

// month: January -> 1
pub fn get_month_length(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

pub fn add_days(timestamp: i64, days: i64) -> i64 {
    timestamp + days * MILLIS_PER_DAY
}

/// Adds calendar months to a UTC millisecond timestamp keeping the time of day.
/// When the target month is shorter than the source day, the day is clamped
/// to the last day of the target month (Jan 31 + 1 month -> Feb 28/29).
pub fn add_months(timestamp: i64, months: u32) -> Option<i64> {
    let datetime = Utc.timestamp_millis_opt(timestamp).single()?;

    let months_from_zero = datetime.year() as i64 * 12 + datetime.month0() as i64 + months as i64;
    let year = (months_from_zero / 12) as i32;
    let month = (months_from_zero % 12) as u32 + 1;
    let day = std::cmp::min(datetime.day(), get_month_length(year, month));

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let shifted = date.and_time(datetime.time());
    Some(Utc.from_utc_datetime(&shifted).timestamp_millis())
}

pub fn format_timestamp(timestamp: i64) -> Option<String> {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
}
