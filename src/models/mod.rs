pub mod classification;
pub mod view;

pub use classification::{ClassificationResult, ImageRef, SurfaceType};
pub use view::View;
