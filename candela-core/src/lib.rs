//! candela-core
//!
//! Core traits and utilities shared across the candela workspace.
//!
//! - `source`: the `SeriesSource` trait implemented by backends.
//! - `timeseries`: downsampling, ordering/merging into a `DisplaySeries`, price summary.
//! - `density`: candle width as a function of visible point count.
//! - `present`: the presenter boundary and the projections charts consume.
//!
#![warn(missing_docs)]

/// Candle width derived from visible point count.
pub mod density;
/// Presenter boundary and chart projections.
pub mod present;
/// The `SeriesSource` trait.
pub mod source;
/// Time-series utilities for downsampling, ordering and summaries.
pub mod timeseries;

pub use candela_types::*;
pub use density::{DensityTier, MAX_WIDTH, MIN_WIDTH, density};
pub use present::{CandleBar, LinePoint, Presenter, VolumeBar, candles, line, volume_bars};
pub use source::SeriesSource;
pub use timeseries::downsample::{aggregate, downsample, reduce};
pub use timeseries::merge::DisplaySeries;
pub use timeseries::summary::{PriceSummary, summarize};
