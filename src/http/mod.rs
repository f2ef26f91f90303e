//! HTTP transport seam.
//!
//! The service never talks to the network directly. It builds an
//! [`ApiRequest`] and hands it to a [`Transport`], which returns the decoded
//! JSON payload or a [`CrudError`]. Production code uses
//! [`ReqwestTransport`]; tests use [`MockTransport`].

mod client;
mod mock;

pub use client::ReqwestTransport;
pub use mock::{MockCall, MockTransport};

use std::fmt;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// HTTP verbs spoken by the CRUD API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }

  /// Whether a successful call changes server state.
  pub fn is_mutation(&self) -> bool {
    !matches!(self, Method::Get)
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A fully resolved request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Absolute URL including query string
  pub url: String,
  /// JSON body, sent with `Content-Type: application/json` when present
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn new(method: Method, url: impl Into<String>) -> Self {
    Self {
      method,
      url: url.into(),
      body: None,
    }
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }
}

/// Executes requests against the remote API.
///
/// Implementations must map non-2xx answers to [`CrudError::Http`] and
/// connection-level failures to [`CrudError::Transport`]. An empty body
/// decodes to `Value::Null`.
///
/// [`CrudError::Http`]: crate::error::CrudError::Http
/// [`CrudError::Transport`]: crate::error::CrudError::Transport
pub trait Transport: Send + Sync {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value>>;
}
