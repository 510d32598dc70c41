//! Candela value types: time windows, cache keys, candle points, range presets,
//! configuration and the shared error enum.
#![warn(missing_docs)]

mod config;
mod error;
mod point;
mod range;
mod window;

pub use config::{CacheConfig, DownsampleMode, LoaderConfig, SessionConfig, ViewportConfig};
pub use error::CandelaError;
pub use point::{FetchedBatch, RawPoint};
pub use range::TimeRange;
pub use window::{CacheKey, TimeWindow};
