//! Debounce bookkeeping for list reads.
//!
//! Each call takes a fresh generation, records it as its table's latest and
//! subscribes to the table's broadcast channel. Generations never repeat, so
//! a timer left over from an earlier burst cannot claim a later one. After the
//! quiescence window only the call whose generation is still current claims
//! the channel and performs the request; every subscriber receives that one
//! result.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;

use super::response::ListResponse;
use crate::error::Result;

pub(crate) type Outcome = Result<ListResponse>;

struct Slot {
  generation: u64,
  tx: broadcast::Sender<Outcome>,
}

#[derive(Default)]
struct Slots {
  last_generation: u64,
  by_table: HashMap<String, Slot>,
}

pub(crate) struct Debouncer {
  window: Duration,
  slots: Mutex<Slots>,
}

impl Debouncer {
  pub fn new(window: Duration) -> Self {
    Self {
      window,
      slots: Mutex::new(Slots::default()),
    }
  }

  pub fn window(&self) -> Duration {
    self.window
  }

  /// Register a call for `table`.
  pub fn enter(&self, table: &str) -> (u64, broadcast::Receiver<Outcome>) {
    let mut slots = self.slots.lock();
    slots.last_generation += 1;
    let generation = slots.last_generation;

    let slot = slots.by_table.entry(table.to_string()).or_insert_with(|| Slot {
      generation,
      tx: broadcast::channel(1).0,
    });
    slot.generation = generation;
    (generation, slot.tx.subscribe())
  }

  /// Take the channel if `generation` is still the latest call for `table`.
  pub fn claim(&self, table: &str, generation: u64) -> Option<broadcast::Sender<Outcome>> {
    let mut slots = self.slots.lock();
    match slots.by_table.get(table) {
      Some(slot) if slot.generation == generation => {
        slots.by_table.remove(table).map(|slot| slot.tx)
      }
      _ => None,
    }
  }
}
