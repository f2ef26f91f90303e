//! Operations queued while a transaction is open.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use super::response::{Deferred, Reply, ResponseShape};
use crate::cache::CacheSlot;
use crate::http::Method;

/// One deferred call, serialized as a bulk descriptor
/// `{"type": "POST", "path": "/users", "body": {...}, "table": "users"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
  #[serde(rename = "type")]
  pub method: Method,
  /// Path relative to the API root, with a leading `/`
  #[serde(deserialize_with = "deserialize_rooted_path")]
  pub path: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<Value>,
  /// Table the operation reads or mutates, when it maps to one
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub table: Option<String>,
  /// Shape the result is decoded as; never sent to the server
  #[serde(default, skip_serializing)]
  pub shape: ResponseShape,
  #[serde(skip)]
  pub cache_slot: Option<CacheSlot>,
}

fn rooted(path: &str) -> String {
  format!("/{}", path.trim_start_matches('/'))
}

fn deserialize_rooted_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let path = String::deserialize(deserializer)?;
  Ok(rooted(&path))
}

impl Operation {
  pub fn new(method: Method, path: &str) -> Self {
    Self {
      method,
      path: rooted(path),
      body: None,
      table: None,
      shape: ResponseShape::Entity,
      cache_slot: None,
    }
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn with_table(mut self, table: &str) -> Self {
    self.table = Some(table.to_string());
    self
  }

  pub fn expecting(mut self, shape: ResponseShape) -> Self {
    self.shape = shape;
    self
  }

  /// Mark the operation as a read that answers `slot` of its table's cache.
  pub fn caching(mut self, slot: CacheSlot) -> Self {
    self.cache_slot = Some(slot);
    self
  }

  pub fn is_read(&self) -> bool {
    !self.method.is_mutation()
  }
}

pub(crate) struct Queued {
  pub operation: Operation,
  pub reply: Option<Reply>,
}

/// Transaction flag plus its operation queue.
#[derive(Default)]
pub(crate) struct Transaction {
  open: bool,
  queue: Vec<Queued>,
}

impl Transaction {
  /// Returns false when a transaction was already open.
  pub fn begin(&mut self) -> bool {
    if self.open {
      return false;
    }
    self.open = true;
    true
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  pub fn len(&self) -> usize {
    self.queue.len()
  }

  /// Queue an operation and hand back a handle to its future result.
  pub fn push<T>(&mut self, operation: Operation) -> Deferred<T> {
    let (tx, rx) = oneshot::channel();
    let position = self.queue.len();
    self.queue.push(Queued {
      operation,
      reply: Some(tx),
    });
    Deferred::new(position, rx)
  }

  /// Queue an operation nobody waits on. Returns the new queue length.
  pub fn push_detached(&mut self, operation: Operation) -> usize {
    self.queue.push(Queued {
      operation,
      reply: None,
    });
    self.queue.len()
  }

  /// Close the transaction and take its queue. Dropping the returned
  /// entries resolves their handles to `Cancelled`.
  pub fn close(&mut self) -> Vec<Queued> {
    self.open = false;
    std::mem::take(&mut self.queue)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::crud::EntityResponse;
  use serde_json::json;

  #[test]
  fn test_descriptor_serialization_skips_local_fields() {
    let op = Operation::new(Method::Post, "users")
      .with_body(json!({"name": "Ada"}))
      .with_table("users")
      .expecting(ResponseShape::List)
      .caching(CacheSlot::Listing);

    assert_eq!(
      serde_json::to_value(&op).unwrap(),
      json!({"type": "POST", "path": "/users", "body": {"name": "Ada"}, "table": "users"})
    );
  }

  #[test]
  fn test_descriptor_omits_absent_body_and_table() {
    let op = Operation::new(Method::Get, "/users/1?relations=[roles]");
    assert_eq!(
      serde_json::to_value(&op).unwrap(),
      json!({"type": "GET", "path": "/users/1?relations=[roles]"})
    );
  }

  #[test]
  fn test_descriptor_reads_shape_from_input() {
    let op: Operation =
      serde_json::from_value(json!({"type": "GET", "path": "/users", "shape": "list"})).unwrap();
    assert_eq!(op.shape, ResponseShape::List);
    assert!(op.is_read());
  }

  #[test]
  fn test_descriptor_path_is_rooted_on_input() {
    let ops: Vec<Operation> = serde_yaml::from_str(
      "- type: DELETE\n  path: users/3\n- type: GET\n  path: //countries\n",
    )
    .unwrap();

    assert_eq!(ops[0].path, "/users/3");
    assert_eq!(ops[1].path, "/countries");
    assert_eq!(serde_json::to_value(&ops[0]).unwrap()["path"], "/users/3");
  }

  #[tokio::test]
  async fn test_begin_is_not_reentrant_and_close_cancels() {
    let mut tx = Transaction::default();
    assert!(tx.begin());
    assert!(!tx.begin());

    let handle = tx.push::<EntityResponse>(Operation::new(Method::Delete, "users/1"));
    assert_eq!(handle.position(), 0);
    assert_eq!(tx.push_detached(Operation::new(Method::Get, "users")), 2);

    let queued = tx.close();
    assert_eq!(queued.len(), 2);
    assert!(!tx.is_open());
    assert_eq!(tx.len(), 0);

    drop(queued);
    assert_eq!(handle.wait().await.unwrap_err(), crate::error::CrudError::Cancelled);
  }
}
