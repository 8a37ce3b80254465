//! Result cache adapter. Implements CachePort.

pub mod memory_cache;

pub use memory_cache::{CacheLimits, CacheStats, ResultCache};
