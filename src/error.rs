//! Error types for the CRUD client.

use thiserror::Error;

/// Result type alias using the crudkit error type.
pub type Result<T> = std::result::Result<T, CrudError>;

/// Errors surfaced by the transport, the service and deferred handles.
///
/// Every variant is `Clone` so a single batch failure can be handed to each
/// caller still waiting on a deferred result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrudError {
  /// The server answered with a non-2xx status
  #[error("HTTP {status}: {body}")]
  Http { status: u16, body: String },

  /// The request never produced a response (connect, timeout, TLS...)
  #[error("Transport error: {0}")]
  Transport(String),

  /// A response body could not be decoded into the declared shape
  #[error("Failed to decode response: {0}")]
  Decode(String),

  /// A model or operation could not be serialized to JSON
  #[error("Failed to encode request body: {0}")]
  Encode(String),

  /// The bulk endpoint answered with a different number of results than
  /// operations sent
  #[error("Bulk response has {actual} results for {expected} operations")]
  BatchMismatch { expected: usize, actual: usize },

  /// A response was requested as one shape but holds the other
  #[error("Expected {expected} response, got {actual}")]
  UnexpectedShape {
    expected: &'static str,
    actual: &'static str,
  },

  /// The transaction owning a deferred result was cancelled or abandoned
  #[error("Transaction cancelled before the operation was sent")]
  Cancelled,

  /// Invalid client configuration
  #[error("Configuration error: {0}")]
  Config(String),
}

impl CrudError {
  /// HTTP status for server-side failures.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Http { status, .. } => Some(*status),
      _ => None,
    }
  }
}
