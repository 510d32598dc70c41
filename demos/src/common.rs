use std::sync::Arc;

use candela::SeriesSource;

/// Backend used when `CANDELA_BACKEND_URL` is not set.
pub const DEFAULT_BACKEND: &str = "http://localhost:8000";

/// Return a series source for demos.
///
/// Uses the synthetic mock when `CANDELA_DEMOS_USE_MOCK` is set, otherwise the
/// HTTP backend at `CANDELA_BACKEND_URL` (default [`DEFAULT_BACKEND`]).
///
/// # Panics
/// Panics if the backend URL cannot be parsed.
#[must_use]
pub fn get_source() -> Arc<dyn SeriesSource> {
    if std::env::var("CANDELA_DEMOS_USE_MOCK").is_ok() {
        println!("--- (Using Mock Source for CI) ---");
        Arc::new(candela_mock::MockSource::new())
    } else {
        let base =
            std::env::var("CANDELA_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND.to_string());
        Arc::new(candela_http::HttpSource::new(&base).expect("invalid CANDELA_BACKEND_URL"))
    }
}
