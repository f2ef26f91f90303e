#![allow(dead_code)]

use std::time::Duration;

use crudkit::crud::{CrudService, CrudSettings, Model};
use crudkit::http::MockTransport;
use crudkit::notify::RecordingNotifier;
use serde::Serialize;
use serde_json::{json, Value};

pub const API: &str = "http://api.test";

pub struct Harness {
  pub service: CrudService,
  pub transport: MockTransport,
  pub notifier: RecordingNotifier,
}

/// Service over a mock transport, caching `cache_tables`.
pub fn harness(cache_tables: &[&str]) -> Harness {
  let transport = MockTransport::new();
  let notifier = RecordingNotifier::new();
  let settings = CrudSettings::new(API)
    .with_cache_tables(cache_tables.iter().copied())
    .with_debounce(Duration::from_millis(50));
  let service = CrudService::new(settings, transport.clone(), notifier.clone());

  Harness {
    service,
    transport,
    notifier,
  }
}

pub fn url(path: &str) -> String {
  format!("{}/{}", API, path)
}

/// List payload with one `{"id": n}` record per id.
pub fn list(ids: &[u64]) -> Value {
  let data: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
  json!({ "data": data, "pagination": { "total": ids.len(), "current_page": 1 } })
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
  pub id: u64,
  pub name: String,
}

impl User {
  pub fn new(id: u64, name: &str) -> Self {
    Self {
      id,
      name: name.to_string(),
    }
  }
}

impl Model for User {
  fn table(&self) -> &str {
    "users"
  }

  fn primary_key(&self) -> String {
    self.id.to_string()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Currency {
  pub code: String,
}

impl Currency {
  pub fn new(code: &str) -> Self {
    Self {
      code: code.to_string(),
    }
  }
}

impl Model for Currency {
  fn table(&self) -> &str {
    "currencies"
  }

  fn primary_key(&self) -> String {
    self.code.clone()
  }
}
