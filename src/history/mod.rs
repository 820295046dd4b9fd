mod filter;

pub use filter::{query, query_in, TypeFilter};
