//! Production transport backed by reqwest.

use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ApiRequest, Method, Transport};
use crate::error::{CrudError, Result};

/// Transport that performs real HTTP calls.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  /// Create a transport with the given per-request timeout.
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| CrudError::Config(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self { client })
  }

  async fn execute(&self, request: ApiRequest) -> Result<Value> {
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    };

    debug!(method = %request.method, url = %request.url, "Sending request");

    let mut builder = self.client.request(method, &request.url);
    if let Some(body) = &request.body {
      let payload = serde_json::to_string(body).map_err(|e| CrudError::Encode(e.to_string()))?;
      builder = builder
        .header("Content-Type", "application/json")
        .body(payload);
    }

    let response = builder.send().await.map_err(|e| {
      warn!(url = %request.url, error = %e, "Request failed");
      CrudError::Transport(e.to_string())
    })?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| CrudError::Transport(e.to_string()))?;

    if !status.is_success() {
      warn!(url = %request.url, status = status.as_u16(), "Server returned an error");
      return Err(CrudError::Http {
        status: status.as_u16(),
        body: text,
      });
    }

    if text.trim().is_empty() {
      return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| CrudError::Decode(e.to_string()))
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value>> {
    Box::pin(self.execute(request))
  }
}
