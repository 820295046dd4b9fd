use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::Arc};
use tokio::sync::watch;

use crate::events::{EngineEvent, EventBus};
use crate::models::ClassificationResult;

pub const MIN_CAPTURE_INTERVAL_MS: u64 = 100;
pub const MAX_CAPTURE_INTERVAL_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub sensitivity_threshold: f64,
    pub capture_interval_ms: u64,
    pub enable_alerts: bool,
    /// Run/stop switch for the capture scheduler.
    pub is_camera_active: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensitivity_threshold: 0.8,
            capture_interval_ms: 1000,
            enable_alerts: true,
            is_camera_active: true,
        }
    }
}

impl Settings {
    /// Whether `result` should raise an alert under these settings. Advisory;
    /// the engine itself never acts on it.
    pub fn should_alert(&self, result: &ClassificationResult) -> bool {
        self.enable_alerts && result.confidence() >= self.sensitivity_threshold
    }
}

/// Partial update. Absent fields are left untouched; present ones are clamped
/// into range rather than rejected.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub sensitivity_threshold: Option<f64>,
    pub capture_interval_ms: Option<i64>,
    pub enable_alerts: Option<bool>,
    pub is_camera_active: Option<bool>,
}

impl SettingsPatch {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(threshold) = self.sensitivity_threshold {
            // NaN has no sensible clamp target
            if !threshold.is_nan() {
                settings.sensitivity_threshold = threshold.clamp(0.0, 1.0);
            }
        }
        if let Some(interval) = self.capture_interval_ms {
            settings.capture_interval_ms = interval.clamp(
                MIN_CAPTURE_INTERVAL_MS as i64,
                MAX_CAPTURE_INTERVAL_MS as i64,
            ) as u64;
        }
        if let Some(enabled) = self.enable_alerts {
            settings.enable_alerts = enabled;
        }
        if let Some(active) = self.is_camera_active {
            settings.is_camera_active = active;
        }
    }
}

/// Live settings shared by the scheduler and the presentation layer.
///
/// Backed by a watch channel so every commit is a whole-snapshot swap: readers
/// see either the old settings or the new ones, never a half-applied patch.
#[derive(Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<Settings>>,
    events: EventBus,
}

impl SettingsStore {
    pub fn new(events: EventBus) -> Self {
        Self::with_initial(Settings::default(), events)
    }

    pub fn with_initial(initial: Settings, events: EventBus) -> Self {
        let mut settings = Settings::default();
        SettingsPatch::from(initial).apply_to(&mut settings);
        let (tx, _) = watch::channel(settings);
        Self {
            tx: Arc::new(tx),
            events,
        }
    }

    /// Loads initial settings from a JSON file holding any subset of fields.
    /// A missing file yields defaults; the file is never written back.
    pub fn load(path: &Path, events: EventBus) -> Result<Self> {
        let mut settings = Settings::default();

        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<SettingsPatch>(&contents) {
                Ok(patch) => patch.apply_to(&mut settings),
                Err(err) => warn!(
                    "Ignoring malformed settings file {}: {err}; using defaults",
                    path.display()
                ),
            }
        } else {
            info!("No settings file at {}; using defaults", path.display());
        }

        let (tx, _) = watch::channel(settings);
        Ok(Self {
            tx: Arc::new(tx),
            events,
        })
    }

    pub fn read(&self) -> Settings {
        *self.tx.borrow()
    }

    /// Merges `patch` into the live settings and returns the committed
    /// snapshot. Subscribers are only woken when something actually changed.
    pub fn update(&self, patch: SettingsPatch) -> Settings {
        let mut committed = self.read();
        let changed = self.tx.send_if_modified(|current| {
            let before = *current;
            patch.apply_to(current);
            committed = *current;
            before != *current
        });

        if changed {
            self.events.publish(EngineEvent::SettingsChanged {
                settings: committed,
            });
        }
        committed
    }

    /// Flips `is_camera_active` atomically and returns the new value.
    pub fn toggle_camera(&self) -> bool {
        let mut committed = self.read();
        self.tx.send_modify(|current| {
            current.is_camera_active = !current.is_camera_active;
            committed = *current;
        });
        self.events.publish(EngineEvent::SettingsChanged {
            settings: committed,
        });
        committed.is_camera_active
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }
}

impl From<Settings> for SettingsPatch {
    fn from(settings: Settings) -> Self {
        Self {
            sensitivity_threshold: Some(settings.sensitivity_threshold),
            capture_interval_ms: Some(i64::try_from(settings.capture_interval_ms).unwrap_or(i64::MAX)),
            enable_alerts: Some(settings.enable_alerts),
            is_camera_active: Some(settings.is_camera_active),
        }
    }
}
