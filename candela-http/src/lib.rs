//! candela-http
//!
//! `SeriesSource` backed by a candle backend's `GET /binance_data/` endpoint.
//! Windows are sent as `start_time`/`end_time` epoch milliseconds plus `limit`.
#![warn(missing_docs)]

mod builder;
/// Response body decoding.
pub mod wire;

use async_trait::async_trait;
use candela_core::{CandelaError, FetchedBatch, SeriesSource, TimeWindow};
use chrono::{DateTime, TimeDelta, Utc};
use url::Url;

pub use builder::HttpSourceBuilder;

/// Series source talking to the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: Url,
    candle_interval: TimeDelta,
}

impl HttpSource {
    /// Connector name reported in errors.
    pub const NAME: &'static str = "http";

    /// Source for `base_url` with default client settings.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, CandelaError> {
        Self::builder().base_url(base_url).build()
    }

    /// Start configuring a source.
    #[must_use]
    pub fn builder() -> HttpSourceBuilder {
        HttpSourceBuilder::default()
    }

    /// Resolved query endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Spacing of the candles the backend serves.
    #[must_use]
    pub const fn candle_interval(&self) -> TimeDelta {
        self.candle_interval
    }

    /// Start sent for `window`.
    ///
    /// The backend answers with the oldest `limit` candles after `start_time`,
    /// so an unbounded window starts `limit` candles before its end to get the
    /// most recent ones.
    #[must_use]
    pub fn resolved_start(&self, window: &TimeWindow) -> Option<DateTime<Utc>> {
        window.start().or_else(|| {
            let span = self
                .candle_interval
                .checked_mul(i32::try_from(window.limit()).ok()?)?;
            window.end().checked_sub_signed(span)
        })
    }

    /// Request URL for `window`.
    ///
    /// The backend filters `open_time <= end_time`, so the exclusive window end
    /// is sent as `end - 1ms`.
    #[must_use]
    pub fn request_url(&self, window: &TimeWindow) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut q = url.query_pairs_mut();
            if let Some(start) = self.resolved_start(window) {
                q.append_pair("start_time", &start.timestamp_millis().to_string());
            }
            q.append_pair(
                "end_time",
                &(window.end().timestamp_millis() - 1).to_string(),
            );
            q.append_pair("limit", &window.limit().to_string());
        }
        url
    }
}

#[async_trait]
impl SeriesSource for HttpSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::http::fetch",
            skip(self, window),
            fields(window = %window.key()),
            err,
        )
    )]
    async fn fetch(&self, window: &TimeWindow) -> Result<FetchedBatch, CandelaError> {
        let url = self.request_url(window);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CandelaError::fetch(Self::NAME, e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CandelaError::fetch(
                Self::NAME,
                format!("unexpected status {status}"),
            ));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| CandelaError::fetch(Self::NAME, format!("reading body: {e}")))?;
        let batch = wire::parse_batch(Self::NAME, &body)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            points = batch.points.len(),
            dropped = batch.dropped,
            "fetched window"
        );
        Ok(batch)
    }
}
