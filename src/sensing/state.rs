use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerStatus {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    pub status: SchedulerStatus,
    pub ticks_completed: u64,
    /// Ticks that found no frame.
    pub ticks_skipped: u64,
    /// Ticks aborted by a classifier error, malformed output or the deadline.
    pub ticks_failed: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the status actually changed.
    pub fn transition(&mut self, status: SchedulerStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    pub fn record_completed(&mut self, at: DateTime<Utc>) {
        self.ticks_completed += 1;
        self.last_tick_at = Some(at);
    }

    pub fn record_skipped(&mut self, at: DateTime<Utc>) {
        self.ticks_skipped += 1;
        self.last_tick_at = Some(at);
    }

    pub fn record_failed(&mut self, at: DateTime<Utc>) {
        self.ticks_failed += 1;
        self.last_tick_at = Some(at);
    }
}
