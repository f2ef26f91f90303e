//! Typed records sent through the CRUD surface.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{CrudError, Result};

/// A record stored in a REST table.
///
/// ```ignore
/// #[derive(Serialize)]
/// struct User { id: u64, name: String }
///
/// impl Model for User {
///   fn table(&self) -> &str { "users" }
///   fn primary_key(&self) -> String { self.id.to_string() }
/// }
/// ```
pub trait Model: Serialize {
  /// Table the record belongs to, used when no table is passed explicitly
  fn table(&self) -> &str;

  /// Value of the primary key, as it appears in URLs
  fn primary_key(&self) -> String;

  /// JSON body sent on create and update.
  fn export_data(&self) -> Result<Value> {
    serde_json::to_value(self).map_err(|e| CrudError::Encode(e.to_string()))
  }
}

/// Untyped record: a JSON object plus the name of its key field.
///
/// Used by the command line, where the table is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
  pub table: String,
  pub key_field: String,
  pub data: Value,
}

impl Record {
  pub fn new(table: impl Into<String>, data: Value) -> Self {
    Self {
      table: table.into(),
      key_field: "id".to_string(),
      data,
    }
  }

  pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
    self.key_field = field.into();
    self
  }
}

impl Serialize for Record {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    self.data.serialize(serializer)
  }
}

impl Model for Record {
  fn table(&self) -> &str {
    &self.table
  }

  fn primary_key(&self) -> String {
    match self.data.get(&self.key_field) {
      Some(Value::String(s)) => s.clone(),
      Some(Value::Null) | None => String::new(),
      Some(other) => other.to_string(),
    }
  }

  fn export_data(&self) -> Result<Value> {
    Ok(self.data.clone())
  }
}
