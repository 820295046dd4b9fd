//! Frame source and classifier seams.
//!
//! Both are blocking calls; the scheduler runs them on the blocking pool under
//! a per-tick deadline.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use rand::Rng;

use crate::models::{ImageRef, SurfaceType};

pub trait Camera: Send + Sync + 'static {
    /// Returns `None` when no frame is available right now.
    fn try_capture_frame(&self) -> Option<ImageRef>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub surface_type: SurfaceType,
    pub confidence: f64,
}

pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, frame: &ImageRef) -> Result<Classification>;
}

/// Always has a frame; references are numbered sequentially.
#[derive(Debug, Default)]
pub struct SimulatedCamera {
    next_frame: AtomicU64,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Camera for SimulatedCamera {
    fn try_capture_frame(&self) -> Option<ImageRef> {
        let n = self.next_frame.fetch_add(1, Ordering::Relaxed);
        Some(ImageRef::new(format!("sim://frame/{n}")))
    }
}

/// Stand-in model: a coin flip for the type, confidence in `[0.7, 1.0)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomClassifier;

impl RandomClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for RandomClassifier {
    fn classify(&self, _frame: &ImageRef) -> Result<Classification> {
        let mut rng = rand::thread_rng();
        let surface_type = if rng.gen_bool(0.5) {
            SurfaceType::Smooth
        } else {
            SurfaceType::Rough
        };

        Ok(Classification {
            surface_type,
            confidence: 0.7 + rng.gen::<f64>() * 0.3,
        })
    }
}
