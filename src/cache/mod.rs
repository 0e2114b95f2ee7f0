//! Result cache: prior ratings keyed by item id.
//!
//! Entries are either streaming (advisory, overwritten by later deltas) or
//! final (immutable). Only final entries short-circuit scheduling and only
//! final entries survive a reload.

pub mod entry;
pub mod store;

#[cfg(test)]
mod tests;

pub use entry::{CacheChange, CacheEntry, CacheStats};
pub use store::{CacheObserver, ResultCache};
