//! Deterministic synthetic market data.
pub mod history;
