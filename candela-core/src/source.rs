use async_trait::async_trait;

use crate::{CandelaError, FetchedBatch, TimeWindow};

/// A backend able to return the candles inside a time window.
///
/// Implementations issue exactly one request per call and never retry; the
/// loader decides when to call again.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Short identifier used in errors and logs (e.g. `"http"`).
    fn name(&self) -> &'static str;

    /// Fetch at most `window.limit()` candles inside `[start, end)`.
    ///
    /// Points are returned in whatever order the backend produced them. Rows
    /// that could not be parsed are dropped and counted in
    /// [`FetchedBatch::dropped`] instead of failing the batch.
    ///
    /// # Errors
    /// Returns `CandelaError::Fetch` on transport, status or body failures.
    async fn fetch(&self, window: &TimeWindow) -> Result<FetchedBatch, CandelaError>;
}
