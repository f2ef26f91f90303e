//! Table cache that sits between the CRUD service and the transport.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tracing::debug;

use super::traits::CacheResult;
use crate::crud::CrudResponse;
use crate::error::Result;

/// Which read of a table a cache entry answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSlot {
  /// `GET {table}?...`
  Listing,
  /// `GET {table}/index`
  Index,
}

#[derive(Debug, Clone)]
struct Cached {
  response: CrudResponse,
  cached_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct TableEntry {
  listing: Option<Cached>,
  index: Option<Cached>,
}

impl TableEntry {
  fn slot(&self, slot: CacheSlot) -> Option<&Cached> {
    match slot {
      CacheSlot::Listing => self.listing.as_ref(),
      CacheSlot::Index => self.index.as_ref(),
    }
  }

  fn slot_mut(&mut self, slot: CacheSlot) -> &mut Option<Cached> {
    match slot {
      CacheSlot::Listing => &mut self.listing,
      CacheSlot::Index => &mut self.index,
    }
  }
}

/// Mapping from table name to its stored responses.
///
/// An absent slot means the next read of that slot must fetch. The lock is
/// never held across an await, so two concurrent misses on the same table
/// both fetch and the later store wins.
pub struct TableCache {
  cacheable: BTreeSet<String>,
  entries: Mutex<HashMap<String, TableEntry>>,
}

impl TableCache {
  /// Create a cache that only stores the given tables.
  pub fn new(cacheable: impl IntoIterator<Item = String>) -> Self {
    Self {
      cacheable: cacheable.into_iter().collect(),
      entries: Mutex::new(HashMap::new()),
    }
  }

  pub fn is_cacheable(&self, table: &str) -> bool {
    self.cacheable.contains(table)
  }

  /// Stored response for `table`, if the slot is live.
  pub fn lookup(&self, table: &str, slot: CacheSlot) -> Option<CacheResult<CrudResponse>> {
    let entries = self.entries.lock();
    entries
      .get(table)
      .and_then(|entry| entry.slot(slot))
      .map(|cached| CacheResult::from_cache(cached.response.clone(), cached.cached_at))
  }

  pub fn is_live(&self, table: &str, slot: CacheSlot) -> bool {
    self
      .entries
      .lock()
      .get(table)
      .is_some_and(|entry| entry.slot(slot).is_some())
  }

  /// Store a response. Ignored for tables that are not cacheable.
  pub fn store(&self, table: &str, slot: CacheSlot, response: CrudResponse) {
    if !self.is_cacheable(table) {
      return;
    }

    let mut entries = self.entries.lock();
    *entries.entry(table.to_string()).or_default().slot_mut(slot) = Some(Cached {
      response,
      cached_at: Utc::now(),
    });
  }

  /// Drop every stored response for `table`.
  pub fn invalidate(&self, table: &str) {
    if self.entries.lock().remove(table).is_some() {
      debug!(table, "Cache invalidated");
    }
  }

  /// Drop all entries.
  pub fn clear(&self) {
    self.entries.lock().clear();
  }

  /// Read-through fetch.
  ///
  /// 1. Non-cacheable table: always call the fetcher, never store
  /// 2. Live slot: return it without calling the fetcher
  /// 3. Otherwise: call the fetcher, store and return its result
  pub async fn fetch<F, Fut>(
    &self,
    table: &str,
    slot: CacheSlot,
    fetcher: F,
  ) -> Result<CacheResult<CrudResponse>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CrudResponse>>,
  {
    if !self.is_cacheable(table) {
      return Ok(CacheResult::from_network(fetcher().await?));
    }

    if let Some(cached) = self.lookup(table, slot) {
      debug!(table, ?slot, "Cache hit");
      return Ok(cached);
    }

    let data = fetcher().await?;
    self.store(table, slot, data.clone());
    Ok(CacheResult::from_network(data))
  }
}
