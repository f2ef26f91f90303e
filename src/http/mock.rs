//! Recording transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;

use super::{ApiRequest, Method, Transport};
use crate::error::{CrudError, Result};

/// Record of a request made through the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
  pub method: Method,
  pub url: String,
  pub body: Option<Value>,
}

/// Transport returning canned responses.
///
/// Responses are keyed by `"{METHOD} {url}"` and returned in FIFO order.
/// A request with no queued response fails with a 404.
#[derive(Clone, Default)]
pub struct MockTransport {
  responses: Arc<Mutex<HashMap<String, VecDeque<Result<Value>>>>>,
  calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a response for `method url`.
  pub fn add_response(&self, method: Method, url: &str, response: Result<Value>) {
    self
      .responses
      .lock()
      .entry(format!("{} {}", method, url))
      .or_default()
      .push_back(response);
  }

  /// All calls made so far, in order.
  pub fn calls(&self) -> Vec<MockCall> {
    self.calls.lock().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().len()
  }

  pub fn clear_calls(&self) {
    self.calls.lock().clear();
  }
}

impl Transport for MockTransport {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value>> {
    self.calls.lock().push(MockCall {
      method: request.method,
      url: request.url.clone(),
      body: request.body.clone(),
    });

    let key = format!("{} {}", request.method, request.url);
    let response = self
      .responses
      .lock()
      .get_mut(&key)
      .and_then(|queue| queue.pop_front())
      .unwrap_or_else(|| {
        Err(CrudError::Http {
          status: 404,
          body: format!("No mock response configured for {}", key),
        })
      });

    Box::pin(async move { response })
  }
}
