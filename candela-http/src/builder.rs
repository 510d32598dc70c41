use std::time::Duration;

use candela_core::CandelaError;
use chrono::TimeDelta;
use url::Url;

use crate::HttpSource;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CANDLE_INTERVAL: Duration = Duration::from_secs(60);
const ENDPOINT: &str = "binance_data/";

/// Builder for [`HttpSource`].
#[derive(Debug, Default)]
pub struct HttpSourceBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
    candle_interval: Option<Duration>,
}

impl HttpSourceBuilder {
    /// Backend root, e.g. `http://localhost:8000`.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Transport timeout for the default client (30s when unset).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a preconfigured client; `timeout` is ignored.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Spacing of the backend's candles (one minute when unset).
    ///
    /// Used to place the start of windows that only bound their end.
    #[must_use]
    pub const fn candle_interval(mut self, interval: Duration) -> Self {
        self.candle_interval = Some(interval);
        self
    }

    /// Build the source.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the base URL is missing, relative or cannot
    /// carry a path, or the candle interval is zero. Returns `Other` when the
    /// HTTP client cannot be constructed.
    pub fn build(self) -> Result<HttpSource, CandelaError> {
        let raw = self
            .base_url
            .ok_or_else(|| CandelaError::InvalidArg("base_url is required".into()))?;
        let endpoint = endpoint_for(&raw)?;
        let interval = self.candle_interval.unwrap_or(DEFAULT_CANDLE_INTERVAL);
        if interval.is_zero() {
            return Err(CandelaError::InvalidArg(
                "candle_interval must be positive".into(),
            ));
        }
        let candle_interval = TimeDelta::from_std(interval)
            .map_err(|e| CandelaError::InvalidArg(format!("candle_interval out of range: {e}")))?;
        let client = match self.client {
            Some(c) => c,
            None => reqwest::Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .map_err(|e| CandelaError::Other(format!("building http client: {e}")))?,
        };
        Ok(HttpSource {
            client,
            endpoint,
            candle_interval,
        })
    }
}

fn endpoint_for(raw: &str) -> Result<Url, CandelaError> {
    let mut base = Url::parse(raw.trim())
        .map_err(|e| CandelaError::InvalidArg(format!("invalid base_url '{raw}': {e}")))?;
    if base.cannot_be_a_base() {
        return Err(CandelaError::InvalidArg(format!(
            "base_url '{raw}' cannot carry a path"
        )));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.join(ENDPOINT)
        .map_err(|e| CandelaError::InvalidArg(format!("invalid base_url '{raw}': {e}")))
}
