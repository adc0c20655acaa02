use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Calendar date of `timestamp` as seen from `tz`, with the time of day dropped.
/// Every streak boundary comparison goes through here.
pub fn calendar_date(timestamp: &DateTime<Utc>, tz: Tz) -> NaiveDate {
    timestamp.with_timezone(&tz).date_naive()
}

pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::validation(format!("无法识别的时区: {name}")))
}

pub fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::validation("时间格式非法"))
}
