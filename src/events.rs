use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::ClassificationResult;
use crate::sensing::SchedulerStatus;
use crate::settings::Settings;

const DEFAULT_CAPACITY: usize = 256;

/// State changes pushed to whoever renders the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineEvent {
    ClassificationAdded { result: ClassificationResult },
    HistoryCleared { removed: usize },
    SettingsChanged { settings: Settings },
    SchedulerStatusChanged { status: SchedulerStatus },
    TickSkipped,
    TickFailed { reason: String },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Fire and forget; no subscribers is not an error.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
