//! candela-mock
//!
//! CI-safe series source. Serves deterministic synthetic minute candles and
//! lets tests script failures, delays and stalls per window.
#![warn(missing_docs)]

mod dynamic;
/// Synthetic data generators.
pub mod fixtures;

pub use dynamic::{Layout, MockBehavior, MockController, MockSource};
pub use fixtures::history::{candle_at, data_origin, window_points};
