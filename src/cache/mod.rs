//! Per-table response cache.
//!
//! Entries are keyed by table name and hold the last list response and the
//! last index response fetched for that table. Nothing expires: an entry lives
//! until a mutation against its table succeeds or the whole cache is cleared.
//! Only tables listed as cacheable in the settings are ever stored.

mod layer;
mod traits;

pub use layer::{CacheSlot, TableCache};
pub use traits::{CacheResult, CacheSource};
