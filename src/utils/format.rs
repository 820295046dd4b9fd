//! Text renderings of timestamps shared by the analytics and history views.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

/// Hour-of-day label used to key hourly buckets, e.g. `3PM`, `12AM`.
pub fn hour_label<Tz>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.with_timezone(tz).format("%-I%p").to_string()
}

/// Long form used for history search, e.g. `Apr 29, 2023, 3:04:05 PM`.
pub fn display_timestamp<Tz>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp
        .with_timezone(tz)
        .format("%b %-d, %Y, %-I:%M:%S %p")
        .to_string()
}
