use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::models::{ClassificationResult, SurfaceType};
use crate::utils::format::hour_label;

use super::types::{AnalyticsSummary, HourlyBucket};

pub const BUCKET_COUNT: usize = 24;

/// Summarizes `history` relative to `now`, labelling buckets in local time.
///
/// On the day a DST fall-back repeats an hour, two buckets carry the same
/// label and both count the results with that label. Use [`summarize_in`]
/// with a fixed-offset zone where bucket totals must add up exactly.
pub fn summarize(history: &[ClassificationResult], now: DateTime<Utc>) -> AnalyticsSummary {
    summarize_in(history, now, &Local)
}

/// Summarizes `history` relative to `now`, labelling buckets in `tz`.
///
/// `now` is the single reference instant for both the 24h window cutoff and
/// every bucket label. Results are bucketed by hour-of-day label, so two
/// results sharing a label share a bucket even when they are ~24h apart.
/// Totals and the average cover the full history, not just the window.
pub fn summarize_in<Tz>(
    history: &[ClassificationResult],
    now: DateTime<Utc>,
    tz: &Tz,
) -> AnalyticsSummary
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let window = Duration::hours(BUCKET_COUNT as i64);

    let mut counts_by_label: HashMap<String, (usize, usize)> = HashMap::new();
    let mut windowed_count = 0;
    for result in history
        .iter()
        .filter(|r| now.signed_duration_since(r.timestamp()) < window)
    {
        windowed_count += 1;
        let entry = counts_by_label
            .entry(hour_label(result.timestamp(), tz))
            .or_default();
        match result.surface_type() {
            SurfaceType::Smooth => entry.0 += 1,
            SurfaceType::Rough => entry.1 += 1,
        }
    }

    let hourly = (0..BUCKET_COUNT as i64)
        .rev()
        .map(|hours_ago| {
            let label = hour_label(now - Duration::hours(hours_ago), tz);
            let (smooth, rough) = counts_by_label.get(&label).copied().unwrap_or_default();
            HourlyBucket {
                label,
                smooth,
                rough,
            }
        })
        .collect();

    let total = history.len();
    let smooth_count = history
        .iter()
        .filter(|r| r.surface_type() == SurfaceType::Smooth)
        .count();
    let average_confidence = (total > 0)
        .then(|| history.iter().map(|r| r.confidence()).sum::<f64>() / total as f64);

    AnalyticsSummary {
        hourly,
        windowed_count,
        total,
        smooth_count,
        rough_count: total - smooth_count,
        average_confidence,
    }
}
