//! Response envelopes and deferred results.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::error::{CrudError, Result};

/// Shape a caller expects a payload to have.
///
/// Recorded on every operation so bulk results are decoded by what was asked
/// for rather than by probing the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
  #[default]
  Entity,
  List,
}

impl ResponseShape {
  pub fn decode(self, payload: Value) -> Result<CrudResponse> {
    match self {
      ResponseShape::Entity => Ok(CrudResponse::Entity(EntityResponse { data: payload })),
      ResponseShape::List => {
        if !payload.is_object() {
          return Err(CrudError::Decode(format!(
            "expected a list object, got {}",
            json_kind(&payload)
          )));
        }
        let list: ListResponse =
          serde_json::from_value(payload).map_err(|e| CrudError::Decode(e.to_string()))?;
        Ok(CrudResponse::List(list))
      }
    }
  }

  fn name(self) -> &'static str {
    match self {
      ResponseShape::Entity => "entity",
      ResponseShape::List => "list",
    }
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

/// Pagination metadata of a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub per_page: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub current_page: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_page: Option<u64>,
  /// Any other field the server sends
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Paginated list: `{"data": [...], "pagination": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
  pub data: Vec<Value>,
  #[serde(default)]
  pub pagination: Pagination,
}

impl ListResponse {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// Decode every record into `T`.
  pub fn items<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
    self
      .data
      .iter()
      .map(|v| T::deserialize(v).map_err(|e| CrudError::Decode(e.to_string())))
      .collect()
  }
}

/// Single-entity payload, kept as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityResponse {
  pub data: Value,
}

/// Normalized response of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CrudResponse {
  Entity(EntityResponse),
  List(ListResponse),
}

impl CrudResponse {
  pub fn shape(&self) -> ResponseShape {
    match self {
      CrudResponse::Entity(_) => ResponseShape::Entity,
      CrudResponse::List(_) => ResponseShape::List,
    }
  }

  pub fn as_list(&self) -> Option<&ListResponse> {
    match self {
      CrudResponse::List(list) => Some(list),
      CrudResponse::Entity(_) => None,
    }
  }

  pub fn as_entity(&self) -> Option<&EntityResponse> {
    match self {
      CrudResponse::Entity(entity) => Some(entity),
      CrudResponse::List(_) => None,
    }
  }
}

impl TryFrom<CrudResponse> for ListResponse {
  type Error = CrudError;

  fn try_from(response: CrudResponse) -> Result<Self> {
    match response {
      CrudResponse::List(list) => Ok(list),
      other => Err(CrudError::UnexpectedShape {
        expected: ResponseShape::List.name(),
        actual: other.shape().name(),
      }),
    }
  }
}

impl TryFrom<CrudResponse> for EntityResponse {
  type Error = CrudError;

  fn try_from(response: CrudResponse) -> Result<Self> {
    match response {
      CrudResponse::Entity(entity) => Ok(entity),
      other => Err(CrudError::UnexpectedShape {
        expected: ResponseShape::Entity.name(),
        actual: other.shape().name(),
      }),
    }
  }
}

pub(crate) type Reply = oneshot::Sender<Result<CrudResponse>>;

/// Outcome of a CRUD call.
///
/// Outside a transaction the call runs and its result is `Immediate`. Inside
/// one the call is only queued and the caller receives a handle that resolves
/// when the transaction is flushed.
#[derive(Debug)]
pub enum Dispatch<T> {
  Immediate(T),
  Deferred(Deferred<T>),
}

impl<T> Dispatch<T> {
  pub fn is_deferred(&self) -> bool {
    matches!(self, Dispatch::Deferred(_))
  }

  /// The result, when the call was not queued.
  pub fn immediate(self) -> Option<T> {
    match self {
      Dispatch::Immediate(value) => Some(value),
      Dispatch::Deferred(_) => None,
    }
  }

}

impl<T> Dispatch<T>
where
  T: TryFrom<CrudResponse, Error = CrudError>,
{
  /// Wait for the value, whichever way the call was dispatched.
  pub async fn resolve(self) -> Result<T> {
    match self {
      Dispatch::Immediate(value) => Ok(value),
      Dispatch::Deferred(handle) => handle.wait().await,
    }
  }
}

/// Handle to the result of a queued operation.
#[derive(Debug)]
pub struct Deferred<T> {
  position: usize,
  rx: oneshot::Receiver<Result<CrudResponse>>,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Deferred<T> {
  pub(crate) fn new(position: usize, rx: oneshot::Receiver<Result<CrudResponse>>) -> Self {
    Self {
      position,
      rx,
      _marker: PhantomData,
    }
  }

  /// Index of the operation in its transaction queue.
  pub fn position(&self) -> usize {
    self.position
  }
}

impl<T> Deferred<T>
where
  T: TryFrom<CrudResponse, Error = CrudError>,
{
  /// Resolves once the owning transaction is flushed. Fails with
  /// [`CrudError::Cancelled`] if it is cancelled instead, or with the flush
  /// error if the bulk request fails.
  pub async fn wait(self) -> Result<T> {
    match self.rx.await {
      Ok(Ok(response)) => T::try_from(response),
      Ok(Err(e)) => Err(e),
      Err(_) => Err(CrudError::Cancelled),
    }
  }
}
