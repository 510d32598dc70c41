//! Time-series utilities shared by the loader and the session.
//!
//! Modules include:
//! - `downsample`: reduce an oversized batch to a point ceiling
//! - `merge`: order, de-duplicate and merge batches into a display series
//! - `summary`: min/max/change statistics over a series
/// Point-ceiling reduction by decimation or bucket aggregation.
pub mod downsample;
/// Ordered, de-duplicated display series.
pub mod merge;
/// Price summary statistics.
pub mod summary;
