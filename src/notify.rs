//! User-facing success notifications.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Receives confirmation messages after successful mutations.
///
/// Calls are fire-and-forget and must not block.
pub trait Notifier: Send + Sync {
  fn success(&self, message: &str);
}

/// Notifier that writes messages to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn success(&self, message: &str) {
    info!(target: "crudkit::notify", "{}", message);
  }
}

/// Notifier that keeps every message, for tests and for callers that render
/// notifications themselves.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
  messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn messages(&self) -> Vec<String> {
    self.messages.lock().clone()
  }
}

impl Notifier for RecordingNotifier {
  fn success(&self, message: &str) {
    self.messages.lock().push(message.to_string());
  }
}
