use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use log::info;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::settings::{SettingsPatch, SettingsStore};
use crate::AppState;

use super::collaborators::{Camera, Classifier};
use super::loop_worker::{CaptureContext, CaptureLoop, Clock};
use super::state::{SchedulerState, SchedulerStatus};

const DEFAULT_TICK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SchedulerOptions {
    /// Deadline for frame acquisition plus classification.
    pub tick_timeout: Duration,
    pub clock: Clock,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            tick_timeout: DEFAULT_TICK_TIMEOUT,
            clock: Arc::new(Utc::now),
        }
    }
}

/// Periodic capture driver.
///
/// Starts in whatever state `Settings::is_camera_active` says. `start`, `stop`
/// and `toggle` flip that flag and wait until the driver has acted on it;
/// flipping the flag through `SettingsStore::update` has the same effect
/// without waiting.
pub struct CaptureScheduler {
    settings: SettingsStore,
    state_rx: watch::Receiver<SchedulerState>,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureScheduler {
    /// Spawns the driver task. Must be called from within a tokio runtime.
    pub fn spawn(
        app: &AppState,
        camera: Arc<dyn Camera>,
        classifier: Arc<dyn Classifier>,
        options: SchedulerOptions,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SchedulerState::new());
        let shutdown = CancellationToken::new();

        let ctx = CaptureContext {
            camera,
            classifier,
            store: app.store.clone(),
            clock: options.clock,
        };
        let worker = CaptureLoop::new(
            ctx,
            app.settings.subscribe(),
            state_tx,
            app.events.clone(),
            shutdown.clone(),
            options.tick_timeout,
        );
        let handle = tokio::spawn(worker.run());

        Self {
            settings: app.settings.clone(),
            state_rx,
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub async fn start(&self) -> Result<SchedulerStatus> {
        self.set_active(true).await
    }

    /// Cancels the pending timer. A tick already in flight finishes, but
    /// nothing is rearmed after it.
    pub async fn stop(&self) -> Result<SchedulerStatus> {
        self.set_active(false).await
    }

    pub async fn toggle(&self) -> Result<SchedulerStatus> {
        self.ensure_running_driver()?;
        let active = self.settings.toggle_camera();
        self.wait_for(active).await
    }

    pub fn status(&self) -> SchedulerStatus {
        self.state_rx.borrow().status
    }

    pub fn snapshot(&self) -> SchedulerState {
        self.state_rx.borrow().clone()
    }

    /// Terminates the driver task. The scheduler cannot be restarted after.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();

        if let Some(handle) = self.handle.lock().await.take() {
            handle
                .await
                .context("capture loop task failed to join")?;
            info!("capture scheduler shut down");
        }
        Ok(())
    }

    async fn set_active(&self, active: bool) -> Result<SchedulerStatus> {
        self.ensure_running_driver()?;
        self.settings.update(SettingsPatch {
            is_camera_active: Some(active),
            ..Default::default()
        });
        self.wait_for(active).await
    }

    /// Waits until the driver reports the status matching `active`, or until
    /// a later settings update flips the flag back. In the second case the
    /// driver may never act on our request, so the current status is returned.
    async fn wait_for(&self, active: bool) -> Result<SchedulerStatus> {
        let target = status_for(active);
        let mut state_rx = self.state_rx.clone();
        let mut settings_rx = self.settings.subscribe();

        loop {
            let status = state_rx.borrow_and_update().status;
            if status == target {
                return Ok(status);
            }
            if settings_rx.borrow_and_update().is_camera_active != active {
                info!("capture scheduler request superseded; status is {status:?}");
                return Ok(status);
            }

            tokio::select! {
                changed = state_rx.changed() => {
                    changed.map_err(|_| anyhow!("capture scheduler has shut down"))?;
                }
                changed = settings_rx.changed() => {
                    changed.map_err(|_| anyhow!("settings store has been dropped"))?;
                }
            }
        }
    }

    fn ensure_running_driver(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            bail!("capture scheduler has shut down");
        }
        Ok(())
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn status_for(active: bool) -> SchedulerStatus {
    if active {
        SchedulerStatus::Running
    } else {
        SchedulerStatus::Stopped
    }
}
