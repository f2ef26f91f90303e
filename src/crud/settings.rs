//! Static settings shared by every call of a service.

use std::collections::BTreeSet;
use std::time::Duration;

/// Static settings of a [`CrudService`](super::CrudService).
#[derive(Debug, Clone)]
pub struct CrudSettings {
  api_url: String,
  cache_tables: BTreeSet<String>,
  debounce: Duration,
  default_message: String,
}

impl CrudSettings {
  /// Settings for the API rooted at `api_url`. A trailing `/` is ignored.
  pub fn new(api_url: &str) -> Self {
    Self {
      api_url: api_url.trim_end_matches('/').to_string(),
      cache_tables: BTreeSet::new(),
      debounce: Duration::from_millis(300),
      default_message: "Operation successful.".to_string(),
    }
  }

  pub fn with_cache_tables<I, S>(mut self, tables: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.cache_tables = tables.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_debounce(mut self, window: Duration) -> Self {
    self.debounce = window;
    self
  }

  pub fn with_default_message(mut self, message: &str) -> Self {
    self.default_message = message.to_string();
    self
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  pub fn cache_tables(&self) -> &BTreeSet<String> {
    &self.cache_tables
  }

  pub fn debounce(&self) -> Duration {
    self.debounce
  }

  pub fn default_message(&self) -> &str {
    &self.default_message
  }

  /// Absolute URL for a table-relative path.
  pub fn url(&self, path: &str) -> String {
    format!("{}/{}", self.api_url, path.trim_start_matches('/'))
  }

  pub fn bulk_url(&self) -> String {
    self.url("bulk")
  }
}
