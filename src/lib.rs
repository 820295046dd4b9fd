pub mod analytics;
pub mod config;
pub mod events;
pub mod history;
pub mod models;
pub mod sensing;
pub mod settings;
pub mod store;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use tokio::sync::{broadcast::error::RecvError, watch};

use analytics::AnalyticsSummary;
use config::EngineConfig;
use events::{EngineEvent, EventBus};
use history::TypeFilter;
use models::{ClassificationResult, View};
use sensing::{CaptureScheduler, RandomClassifier, SchedulerOptions, SimulatedCamera};
use settings::{Settings, SettingsStore};
use store::{ClassificationStore, Retention};

/// Shared engine state: settings, history, the event bus and the selected
/// view. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct AppState {
    pub settings: SettingsStore,
    pub store: ClassificationStore,
    pub events: EventBus,
    view: Arc<watch::Sender<View>>,
}

impl AppState {
    pub fn new(settings: Settings, retention: Retention) -> Self {
        let events = EventBus::new();
        Self::assemble(
            SettingsStore::with_initial(settings, events.clone()),
            retention,
            events,
        )
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let events = EventBus::new();
        let settings = match &config.settings_path {
            Some(path) => SettingsStore::load(path, events.clone())?,
            None => SettingsStore::new(events.clone()),
        };
        Ok(Self::assemble(settings, config.retention, events))
    }

    fn assemble(settings: SettingsStore, retention: Retention, events: EventBus) -> Self {
        let (view, _) = watch::channel(View::default());
        Self {
            settings,
            store: ClassificationStore::new(retention, events.clone()),
            events,
            view: Arc::new(view),
        }
    }

    pub fn current_view(&self) -> View {
        *self.view.borrow()
    }

    pub fn set_view(&self, view: View) {
        self.view.send_replace(view);
    }

    /// Analytics over the current history, in local time.
    pub fn summarize(&self, now: DateTime<Utc>) -> AnalyticsSummary {
        analytics::summarize(&self.store.list(), now)
    }

    /// Filtered history, newest first, in local time.
    pub fn query(&self, type_filter: TypeFilter, search_text: &str) -> Vec<ClassificationResult> {
        history::query(&self.store.list(), type_filter, search_text)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default(), Retention::unbounded())
    }
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var, defaults to info)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("SurfaceScan starting up...");

    let config = EngineConfig::from_env()?;
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(serve(config))
}

async fn serve(config: EngineConfig) -> Result<()> {
    let app = AppState::from_config(&config)?;
    let settings = app.settings.read();
    info!(
        "Capturing every {}ms (threshold {:.1}, alerts {}, camera {})",
        settings.capture_interval_ms,
        settings.sensitivity_threshold,
        if settings.enable_alerts { "on" } else { "off" },
        if settings.is_camera_active { "active" } else { "paused" },
    );

    let scheduler = CaptureScheduler::spawn(
        &app,
        Arc::new(SimulatedCamera::new()),
        Arc::new(RandomClassifier::new()),
        SchedulerOptions {
            tick_timeout: config.tick_timeout,
            ..Default::default()
        },
    );

    let mut events = app.events.subscribe();
    let report_every: u64 = if config.debug { 1 } else { 10 };
    let mut added: u64 = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let deadline = async {
        match config.run_for {
            Some(run_for) => tokio::time::sleep(run_for).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(err) = signal {
                    warn!("Failed to listen for Ctrl-C: {err}");
                }
                info!("Shutdown requested");
                break;
            }
            _ = &mut deadline => {
                info!("Run time elapsed");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(EngineEvent::ClassificationAdded { result }) => {
                        added += 1;
                        if app.settings.read().should_alert(&result) {
                            info!(
                                "Alert: {} surface at {:.0}% confidence",
                                result.surface_type(),
                                result.confidence() * 100.0
                            );
                        }
                        if added % report_every == 0 {
                            log_summary(&app);
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event listener lagged; {skipped} event(s) dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    scheduler.shutdown().await?;
    log_summary(&app);
    Ok(())
}

fn log_summary(app: &AppState) {
    let summary = app.summarize(Utc::now());
    match summary.average_confidence {
        Some(average) => info!(
            "{} classified ({} smooth / {} rough), avg confidence {:.1}%, {} in the last 24h",
            summary.total,
            summary.smooth_count,
            summary.rough_count,
            average * 100.0,
            summary.windowed_count
        ),
        None => info!("No classifications yet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_defaults_to_live_and_switches() {
        let app = AppState::default();
        assert_eq!(app.current_view(), View::Live);

        app.set_view(View::History);
        assert_eq!(app.current_view(), View::History);
        assert_eq!(app.clone().current_view(), View::History);
    }

    #[test]
    fn independent_states_do_not_share_history() {
        let a = AppState::default();
        let b = AppState::default();
        a.store.append(
            ClassificationResult::new(
                Utc::now(),
                models::SurfaceType::Smooth,
                0.9,
                models::ImageRef::new("frame"),
            )
            .unwrap(),
        );
        assert_eq!(a.store.len(), 1);
        assert!(b.store.is_empty());
    }

    #[test]
    fn from_config_applies_retention() {
        let config = EngineConfig {
            retention: Retention::max_entries(1),
            ..Default::default()
        };
        let app = AppState::from_config(&config).unwrap();
        for _ in 0..3 {
            app.store.append(
                ClassificationResult::new(
                    Utc::now(),
                    models::SurfaceType::Rough,
                    0.7,
                    models::ImageRef::new("frame"),
                )
                .unwrap(),
            );
        }
        assert_eq!(app.store.len(), 1);
    }

    #[test]
    fn helpers_cover_full_history() {
        let app = AppState::default();
        app.store.append(
            ClassificationResult::new(
                Utc::now(),
                models::SurfaceType::Rough,
                0.6,
                models::ImageRef::new("frame"),
            )
            .unwrap(),
        );

        let summary = app.summarize(Utc::now());
        assert_eq!(summary.total, 1);
        assert_eq!(summary.rough_count, 1);
        assert_eq!(app.query(TypeFilter::All, "").len(), 1);
        assert!(app.query(TypeFilter::Smooth, "").is_empty());
    }
}
