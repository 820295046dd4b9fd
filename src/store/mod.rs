//! Append-only classification history, newest first.

use std::{
    collections::VecDeque,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::events::{EngineEvent, EventBus};
use crate::models::ClassificationResult;

/// Optional cap on retained history. Unbounded unless configured.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Retention {
    pub max_entries: Option<usize>,
}

impl Retention {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Keeps at most `max_entries` records. A cap of 0 keeps nothing.
    pub fn max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
        }
    }
}

#[derive(Clone)]
pub struct ClassificationStore {
    history: Arc<RwLock<VecDeque<ClassificationResult>>>,
    retention: Retention,
    events: EventBus,
}

impl ClassificationStore {
    pub fn new(retention: Retention, events: EventBus) -> Self {
        Self {
            history: Arc::new(RwLock::new(VecDeque::new())),
            retention,
            events,
        }
    }

    /// Inserts `result` at the front of the history.
    pub fn append(&self, result: ClassificationResult) {
        {
            let mut history = self.write();
            history.push_front(result.clone());
            if let Some(max) = self.retention.max_entries {
                history.truncate(max);
            }
        }

        self.events
            .publish(EngineEvent::ClassificationAdded { result });
    }

    /// Removes every record. Irreversible. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut history = self.write();
            let removed = history.len();
            history.clear();
            removed
        };

        if removed > 0 {
            info!("Cleared {removed} classification(s) from history");
            self.events.publish(EngineEvent::HistoryCleared { removed });
        }
        removed
    }

    /// Snapshot of the history, newest first. Not updated by later appends.
    pub fn list(&self) -> Vec<ClassificationResult> {
        self.read().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<ClassificationResult> {
        self.read().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<ClassificationResult>> {
        match self.history.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<ClassificationResult>> {
        match self.history.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageRef, SurfaceType};
    use chrono::{Duration, TimeZone, Utc};

    fn result(offset_secs: i64, surface_type: SurfaceType) -> ClassificationResult {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        ClassificationResult::new(
            base + Duration::seconds(offset_secs),
            surface_type,
            0.9,
            ImageRef::new(format!("frame-{offset_secs}")),
        )
        .unwrap()
    }

    fn store() -> ClassificationStore {
        ClassificationStore::new(Retention::unbounded(), EventBus::new())
    }

    #[test]
    fn list_is_reverse_insertion_order() {
        let store = store();
        let inserted: Vec<_> = (0..5)
            .map(|i| result(i, SurfaceType::Smooth))
            .collect();
        for r in &inserted {
            store.append(r.clone());
        }

        let ids: Vec<_> = store.list().iter().map(|r| r.id().to_string()).collect();
        let expected: Vec<_> = inserted.iter().rev().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, expected);
        assert_eq!(store.latest().unwrap().id(), inserted[4].id());
    }

    #[test]
    fn order_follows_insertion_not_timestamp() {
        let store = store();
        let late = result(100, SurfaceType::Rough);
        let early = result(0, SurfaceType::Smooth);
        store.append(late.clone());
        store.append(early.clone());

        let listed = store.list();
        assert_eq!(listed[0].id(), early.id());
        assert_eq!(listed[1].id(), late.id());
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let store = store();
        store.append(result(0, SurfaceType::Smooth));
        let snapshot = store.list();
        store.append(result(1, SurfaceType::Rough));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clear_is_total_and_idempotent() {
        let store = store();
        assert_eq!(store.clear(), 0);
        assert!(store.is_empty());

        store.append(result(0, SurfaceType::Smooth));
        store.append(result(1, SurfaceType::Rough));
        assert_eq!(store.clear(), 2);
        assert_eq!(store.clear(), 0);
        assert!(store.list().is_empty());
    }

    #[test]
    fn retention_drops_oldest() {
        let store = ClassificationStore::new(Retention::max_entries(2), EventBus::new());
        let first = result(0, SurfaceType::Smooth);
        store.append(first.clone());
        store.append(result(1, SurfaceType::Rough));
        store.append(result(2, SurfaceType::Smooth));

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| r.id() != first.id()));
    }

    #[tokio::test]
    async fn append_and_clear_publish_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let store = ClassificationStore::new(Retention::unbounded(), bus);

        let added = result(0, SurfaceType::Rough);
        store.append(added.clone());
        store.clear();
        store.clear();

        match rx.recv().await.unwrap() {
            EngineEvent::ClassificationAdded { result } => assert_eq!(result.id(), added.id()),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::HistoryCleared { removed: 1 }
        ));
        assert!(rx.try_recv().is_err());
    }
}
