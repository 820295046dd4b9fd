use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    events::{EngineEvent, EventBus},
    models::{ClassificationResult, ImageRef},
    settings::Settings,
    store::ClassificationStore,
};

use super::collaborators::{Camera, Classification, Classifier};
use super::state::{SchedulerState, SchedulerStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_debug, log_error, log_info, log_warn};

/// Source of capture timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Everything one tick needs.
#[derive(Clone)]
pub struct CaptureContext {
    pub camera: Arc<dyn Camera>,
    pub classifier: Arc<dyn Classifier>,
    pub store: ClassificationStore,
    pub clock: Clock,
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    Appended(ClassificationResult),
    /// The camera had no frame.
    Skipped,
}

type Capture = Option<(DateTime<Utc>, ImageRef, Result<Classification>)>;

/// Runs one capture: frame, classification, append.
///
/// The append is the last step, so an error anywhere leaves the history
/// untouched.
pub async fn perform_tick(ctx: &CaptureContext) -> Result<TickOutcome> {
    let capture = spawn_capture(ctx).await;
    finish_capture(ctx, capture)
}

/// Frame acquisition and classification on one blocking worker. The clock is
/// read as soon as a frame is in hand.
fn spawn_capture(ctx: &CaptureContext) -> JoinHandle<Capture> {
    let camera = Arc::clone(&ctx.camera);
    let classifier = Arc::clone(&ctx.classifier);
    let clock = Arc::clone(&ctx.clock);
    tokio::task::spawn_blocking(move || {
        let frame = camera.try_capture_frame()?;
        let captured_at = clock();
        let classification = classifier.classify(&frame);
        Some((captured_at, frame, classification))
    })
}

fn finish_capture(
    ctx: &CaptureContext,
    capture: Result<Capture, JoinError>,
) -> Result<TickOutcome> {
    let Some((captured_at, frame, classification)) =
        capture.context("capture worker join failed")?
    else {
        return Ok(TickOutcome::Skipped);
    };
    let classification = classification.context("classifier failed")?;

    let result = ClassificationResult::new(
        captured_at,
        classification.surface_type,
        classification.confidence,
        frame,
    )
    .context("classifier returned malformed output")?;

    ctx.store.append(result.clone());
    Ok(TickOutcome::Appended(result))
}

enum Exit {
    /// Re-read the run flag and continue in the matching state.
    Resume,
    Shutdown,
}

/// Driver task behind `CaptureScheduler`.
///
/// `Settings::is_camera_active` is the run/stop switch. While running there is
/// exactly one pending single-shot timer; it is rearmed only after the previous
/// tick has finished, using whatever interval is current at that moment.
pub(crate) struct CaptureLoop {
    ctx: CaptureContext,
    settings_rx: watch::Receiver<Settings>,
    state: watch::Sender<SchedulerState>,
    events: EventBus,
    shutdown: CancellationToken,
    tick_timeout: Duration,
}

impl CaptureLoop {
    pub(crate) fn new(
        ctx: CaptureContext,
        settings_rx: watch::Receiver<Settings>,
        state: watch::Sender<SchedulerState>,
        events: EventBus,
        shutdown: CancellationToken,
        tick_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            settings_rx,
            state,
            events,
            shutdown,
            tick_timeout,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let active = self.settings_rx.borrow_and_update().is_camera_active;
            let exit = if active {
                self.set_status(SchedulerStatus::Running);
                self.run_active().await
            } else {
                self.set_status(SchedulerStatus::Stopped);
                self.wait_for_start().await
            };

            if let Exit::Shutdown = exit {
                break;
            }
        }

        self.set_status(SchedulerStatus::Stopped);
        log_info!("capture loop shutting down");
    }

    async fn run_active(&mut self) -> Exit {
        loop {
            // A stop that arrived during the last tick is only visible here.
            let settings = *self.settings_rx.borrow_and_update();
            if !settings.is_camera_active {
                return Exit::Resume;
            }
            let interval = Duration::from_millis(settings.capture_interval_ms);
            let timer = time::sleep(interval);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => return Exit::Shutdown,
                    changed = self.settings_rx.changed() => {
                        if changed.is_err() {
                            return Exit::Shutdown;
                        }
                        if !self.settings_rx.borrow_and_update().is_camera_active {
                            return Exit::Resume;
                        }
                        // interval changes apply at the next rearm
                    }
                    _ = &mut timer => break,
                }
            }

            // The timer may have fired after a stop was requested.
            if self.shutdown.is_cancelled() {
                return Exit::Shutdown;
            }
            if !self.settings_rx.borrow().is_camera_active {
                return Exit::Resume;
            }

            self.tick().await;
        }
    }

    async fn wait_for_start(&mut self) -> Exit {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Exit::Shutdown,
                changed = self.settings_rx.changed() => {
                    if changed.is_err() {
                        return Exit::Shutdown;
                    }
                    if self.settings_rx.borrow_and_update().is_camera_active {
                        return Exit::Resume;
                    }
                }
            }
        }
    }

    async fn tick(&mut self) {
        let started = Instant::now();
        let mut worker = spawn_capture(&self.ctx);
        let outcome = match time::timeout(self.tick_timeout, &mut worker).await {
            Ok(capture) => Ok(finish_capture(&self.ctx, capture)),
            Err(elapsed) => {
                // The blocking worker cannot be cancelled; the next tick waits for it.
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => {}
                    _ = &mut worker => {}
                }
                Err(elapsed)
            }
        };
        let elapsed_ms = started.elapsed().as_millis();
        let now = Utc::now();

        match outcome {
            Ok(Ok(TickOutcome::Appended(result))) => {
                self.state.send_modify(|s| s.record_completed(now));
                log_debug!(
                    "Classified {} as {} ({:.2}) in {}ms",
                    result.image_ref().as_str(),
                    result.surface_type(),
                    result.confidence(),
                    elapsed_ms
                );
            }
            Ok(Ok(TickOutcome::Skipped)) => {
                self.state.send_modify(|s| s.record_skipped(now));
                log_debug!("No frame available; tick skipped");
                self.events.publish(EngineEvent::TickSkipped);
            }
            Ok(Err(err)) => {
                self.state.send_modify(|s| s.record_failed(now));
                log_error!("capture tick failed after {}ms: {err:?}", elapsed_ms);
                self.events.publish(EngineEvent::TickFailed {
                    reason: format!("{err:#}"),
                });
            }
            Err(_) => {
                self.state.send_modify(|s| s.record_failed(now));
                log_warn!(
                    "capture tick timeout (> {}ms)",
                    self.tick_timeout.as_millis()
                );
                self.events.publish(EngineEvent::TickFailed {
                    reason: format!("timed out after {}ms", self.tick_timeout.as_millis()),
                });
            }
        }
    }

    fn set_status(&self, status: SchedulerStatus) {
        if self.state.send_if_modified(|s| s.transition(status)) {
            log_info!("capture scheduler {:?}", status);
            self.events
                .publish(EngineEvent::SchedulerStatusChanged { status });
        }
    }
}
