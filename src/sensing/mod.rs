pub mod collaborators;
pub mod controller;
pub mod loop_worker;
pub mod state;

pub use collaborators::{Camera, Classification, Classifier, RandomClassifier, SimulatedCamera};
pub use controller::{CaptureScheduler, SchedulerOptions};
pub use loop_worker::{perform_tick, CaptureContext, Clock, TickOutcome};
pub use state::{SchedulerState, SchedulerStatus};
