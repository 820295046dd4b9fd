use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourlyBucket {
    /// Hour-of-day text, e.g. `3PM`.
    pub label: String,
    pub smooth: usize,
    pub rough: usize,
}

impl HourlyBucket {
    pub fn total(&self) -> usize {
        self.smooth + self.rough
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    /// Oldest hour first.
    pub hourly: Vec<HourlyBucket>,
    /// Results captured less than 24h before the reference instant.
    pub windowed_count: usize,
    pub total: usize,
    pub smooth_count: usize,
    pub rough_count: usize,
    /// `None` when the history is empty.
    pub average_confidence: Option<f64>,
}
