mod summary;
mod types;

pub use summary::{summarize, summarize_in, BUCKET_COUNT};
pub use types::{AnalyticsSummary, HourlyBucket};
