pub mod handlers;
pub mod rate_limit;

pub use handlers::{AppState, DEFAULT_MAX_TEXT_BYTES, router};
