//! candela-cache
//!
//! Window cache used by the loader. `SeriesCache` maps a normalized window key
//! to the raw batch fetched for it, backed either by a session-lifetime map or
//! by a bounded LRU store.
#![warn(missing_docs)]

mod series;
mod store;

pub use crate::series::{CacheEntry, CachePolicy, SeriesCache};
pub use crate::store::{CacheStore, LruStore, SessionStore};
