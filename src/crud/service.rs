//! CRUD service: typed calls in, REST requests out.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use super::model::Model;
use super::operation::{Operation, Queued, Transaction};
use super::paths::{self, Relation, SearchCriteria};
use super::response::{
  CrudResponse, Deferred, Dispatch, EntityResponse, ListResponse, ResponseShape,
};
use super::settings::CrudSettings;
use crate::cache::{CacheSlot, TableCache};
use crate::error::{CrudError, Result};
use crate::http::{ApiRequest, Method, Transport};
use crate::notify::Notifier;

struct Inner {
  settings: CrudSettings,
  transport: Arc<dyn Transport>,
  notifier: Arc<dyn Notifier>,
  cache: TableCache,
  transaction: Mutex<Transaction>,
  debouncer: Debouncer,
}

/// Client for a REST API following the table conventions:
///
/// - list: `GET {table}?{filters}&relations=[...]`
/// - detail: `GET {table}/{id}?relations=[...]`
/// - create / update / delete: `POST {table}`, `PUT {table}/{id}`,
///   `DELETE {table}/{id}`
/// - bulk: `POST bulk` with an array of operation descriptors
///
/// Cheap to clone; clones share cache and transaction state.
#[derive(Clone)]
pub struct CrudService {
  inner: Arc<Inner>,
}

impl CrudService {
  pub fn new(
    settings: CrudSettings,
    transport: impl Transport + 'static,
    notifier: impl Notifier + 'static,
  ) -> Self {
    Self::with_shared(settings, Arc::new(transport), Arc::new(notifier))
  }

  pub fn with_shared(
    settings: CrudSettings,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    let cache = TableCache::new(settings.cache_tables().iter().cloned());
    let debouncer = Debouncer::new(settings.debounce());

    Self {
      inner: Arc::new(Inner {
        settings,
        transport,
        notifier,
        cache,
        transaction: Mutex::new(Transaction::default()),
        debouncer,
      }),
    }
  }

  pub fn settings(&self) -> &CrudSettings {
    &self.inner.settings
  }

  pub fn cache(&self) -> &TableCache {
    &self.inner.cache
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  /// List `table`, optionally filtered and with relations expanded.
  pub async fn get(
    &self,
    table: &str,
    criteria: Option<&SearchCriteria>,
    relations: Option<&[Relation]>,
  ) -> Result<Dispatch<ListResponse>> {
    let path = paths::list_path(table, criteria, relations);
    if let Some(handle) = self.defer(list_operation(table, &path)) {
      return Ok(Dispatch::Deferred(handle));
    }

    Ok(Dispatch::Immediate(self.read_list(table, &path).await?))
  }

  /// Like [`get`](Self::get), but calls for the same table arriving within the
  /// debounce window collapse into one request for the last call. Every
  /// collapsed caller receives that request's result.
  pub async fn get_debounced(
    &self,
    table: &str,
    criteria: Option<&SearchCriteria>,
    relations: Option<&[Relation]>,
  ) -> Result<Dispatch<ListResponse>> {
    let path = paths::list_path(table, criteria, relations);
    if let Some(handle) = self.defer(list_operation(table, &path)) {
      return Ok(Dispatch::Deferred(handle));
    }

    let (generation, mut rx) = self.inner.debouncer.enter(table);
    let this = self.clone();
    let table = table.to_string();

    tokio::spawn(async move {
      tokio::time::sleep(this.inner.debouncer.window()).await;
      let Some(tx) = this.inner.debouncer.claim(&table, generation) else {
        return;
      };
      let outcome = this.read_list(&table, &path).await;
      let _ = tx.send(outcome);
    });

    match rx.recv().await {
      Ok(outcome) => outcome.map(Dispatch::Immediate),
      Err(_) => Err(CrudError::Cancelled),
    }
  }

  /// Fetch the `relation` sub-resource of record `id`.
  pub async fn get_relation(
    &self,
    table: &str,
    id: &str,
    relation: &str,
  ) -> Result<Dispatch<EntityResponse>> {
    let path = paths::relation_path(table, id, relation);
    let operation = Operation::new(Method::Get, &path).with_table(table);
    if let Some(handle) = self.defer(operation.clone()) {
      return Ok(Dispatch::Deferred(handle));
    }

    let response = self.execute(&operation).await?;
    Ok(Dispatch::Immediate(EntityResponse::try_from(response)?))
  }

  /// Fetch `table/index`. Cached for cacheable tables.
  pub async fn index(&self, table: &str) -> Result<Dispatch<EntityResponse>> {
    let path = paths::index_path(table);
    let operation = Operation::new(Method::Get, &path)
      .with_table(table)
      .caching(CacheSlot::Index);
    if let Some(handle) = self.defer(operation.clone()) {
      return Ok(Dispatch::Deferred(handle));
    }

    let result = self
      .inner
      .cache
      .fetch(table, CacheSlot::Index, || self.execute(&operation))
      .await?;
    Ok(Dispatch::Immediate(EntityResponse::try_from(result.data)?))
  }

  /// Fetch one record, optionally with relations expanded.
  pub async fn get_by_id(
    &self,
    table: &str,
    id: &str,
    relations: Option<&[Relation]>,
  ) -> Result<Dispatch<EntityResponse>> {
    let path = paths::detail_path(table, id, relations);
    let operation = Operation::new(Method::Get, &path);
    if let Some(handle) = self.defer(operation.clone()) {
      return Ok(Dispatch::Deferred(handle));
    }

    let response = self.execute(&operation).await?;
    Ok(Dispatch::Immediate(EntityResponse::try_from(response)?))
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  /// Create `model` in `table` (defaults to the model's table).
  pub async fn post<M: Model>(
    &self,
    model: &M,
    table: Option<&str>,
  ) -> Result<Dispatch<EntityResponse>> {
    let table = table.unwrap_or(model.table());
    let operation = Operation::new(Method::Post, table)
      .with_body(model.export_data()?)
      .with_table(table);
    let message = format!("{} {} added successfully.", table, model.primary_key());

    self.mutate(operation, message).await
  }

  /// Replace record `model` in `table`.
  pub async fn put<M: Model>(
    &self,
    model: &M,
    table: Option<&str>,
  ) -> Result<Dispatch<EntityResponse>> {
    let table = table.unwrap_or(model.table());
    let id = model.primary_key();
    let operation = Operation::new(Method::Put, &format!("{}/{}", table, id))
      .with_body(model.export_data()?)
      .with_table(table);
    let message = format!("{} {} updated successfully.", table, id);

    self.mutate(operation, message).await
  }

  /// Delete record `model` from `table`.
  pub async fn delete<M: Model>(
    &self,
    model: &M,
    table: Option<&str>,
  ) -> Result<Dispatch<EntityResponse>> {
    let table = table.unwrap_or(model.table());
    let id = model.primary_key();
    let operation = Operation::new(Method::Delete, &format!("{}/{}", table, id)).with_table(table);
    let message = format!("{} {} deleted successfully.", table, id);

    self.mutate(operation, message).await
  }

  /// Create `model` under `parents/relation_table`, e.g.
  /// `POST users/7/roles`.
  pub async fn post_relation<M: Model>(
    &self,
    model: &M,
    parents: &[&str],
    relation_table: Option<&str>,
  ) -> Result<Dispatch<EntityResponse>> {
    let relation_table = relation_table.unwrap_or(model.table());
    let path = paths::relation_collection_path(parents, relation_table);
    let operation = Operation::new(Method::Post, &path).with_body(model.export_data()?);
    let message = format!("Relation {} added successfully.", model.primary_key());

    self.mutate(operation, message).await
  }

  /// Link existing records by posting an empty array to `parents`, e.g.
  /// `POST users/7/roles/3`.
  pub async fn create_relation(&self, parents: &[&str]) -> Result<Dispatch<EntityResponse>> {
    let operation = Operation::new(Method::Post, &parents.join("/")).with_body(Value::Array(Vec::new()));

    self
      .mutate(operation, "Relation added successfully.".to_string())
      .await
  }

  /// Delete `model` from `parents/relation_table`.
  pub async fn delete_relation<M: Model>(
    &self,
    model: &M,
    parents: &[&str],
    relation_table: Option<&str>,
  ) -> Result<Dispatch<EntityResponse>> {
    let relation_table = relation_table.unwrap_or(model.table());
    let id = model.primary_key();
    let path = format!(
      "{}/{}",
      paths::relation_collection_path(parents, relation_table),
      id
    );
    let operation = Operation::new(Method::Delete, &path);
    let message = format!("Relation {} deleted successfully.", id);

    self.mutate(operation, message).await
  }

  // ==========================================================================
  // Transactions
  // ==========================================================================

  /// Start queuing calls instead of sending them. No-op if already open.
  pub fn begin_transaction(&self) {
    if self.inner.transaction.lock().begin() {
      debug!("Transaction opened");
    }
  }

  pub fn transaction_started(&self) -> bool {
    self.inner.transaction.lock().is_open()
  }

  pub fn operation_count(&self) -> usize {
    self.inner.transaction.lock().len()
  }

  /// Queue a raw operation. Returns the new queue length, or `None` when no
  /// transaction is open.
  pub fn add_operation(&self, operation: Operation) -> Option<usize> {
    let mut transaction = self.inner.transaction.lock();
    if !transaction.is_open() {
      return None;
    }
    Some(transaction.push_detached(operation))
  }

  /// Discard the queue without any network call. Pending handles resolve to
  /// [`CrudError::Cancelled`].
  pub fn cancel_transaction(&self) {
    let discarded = self.inner.transaction.lock().close();
    debug!(discarded = discarded.len(), "Transaction cancelled");
  }

  /// Flush the queue as one bulk request.
  ///
  /// Returns one response per queued operation, in queue order. Reads of
  /// cached tables are answered from the cache and not sent. `message` is
  /// shown once if the queue contained a mutation; `None` uses the configured
  /// default and an empty message shows nothing. If a result does not decode,
  /// that error is returned and nothing is shown.
  pub async fn end_transaction(&self, message: Option<&str>) -> Result<Vec<CrudResponse>> {
    let queued = self.inner.transaction.lock().close();
    if queued.is_empty() {
      return Ok(Vec::new());
    }

    let plan = self.plan(&queued);
    let outgoing: Vec<&Operation> = queued
      .iter()
      .zip(&plan)
      .filter(|(_, cached)| cached.is_none())
      .map(|(q, _)| &q.operation)
      .collect();

    let mut remote = if outgoing.is_empty() {
      Vec::new().into_iter()
    } else {
      match self.send_bulk(&outgoing).await {
        Ok(results) => results.into_iter(),
        Err(e) => {
          warn!(operations = queued.len(), error = %e, "Bulk request failed");
          fail_all(queued, &e);
          return Err(e);
        }
      }
    };

    let sent = outgoing.len();
    let total = queued.len();
    let mut results = Vec::with_capacity(total);
    let mut first_error = None;
    let mut mutated = false;

    for (entry, cached) in queued.into_iter().zip(plan) {
      let Queued { operation, reply } = entry;

      let outcome = match cached {
        Some(response) => Ok(response),
        None => {
          let payload = remote.next().unwrap_or(Value::Null);
          let outcome = operation.shape.decode(payload);
          if let Ok(response) = &outcome {
            self.apply_to_cache(&operation, response);
          }
          outcome
        }
      };
      mutated |= !operation.is_read();

      match outcome {
        Ok(response) => {
          if let Some(reply) = reply {
            let _ = reply.send(Ok(response.clone()));
          }
          results.push(response);
        }
        Err(e) => {
          if let Some(reply) = reply {
            let _ = reply.send(Err(e.clone()));
          }
          first_error.get_or_insert(e);
        }
      }
    }

    if let Some(e) = first_error {
      warn!(operations = total, sent, error = %e, "Transaction committed with undecodable results");
      return Err(e);
    }

    info!(operations = total, sent, "Transaction committed");

    if mutated {
      let message = message.unwrap_or(self.inner.settings.default_message());
      if !message.is_empty() {
        self.inner.notifier.success(message);
      }
    }

    Ok(results)
  }

  /// Drop every cached response.
  pub fn clear_cache(&self) {
    self.inner.cache.clear();
  }

  // ==========================================================================
  // Internals
  // ==========================================================================

  /// Queue `operation` if a transaction is open.
  fn defer<T>(&self, operation: Operation) -> Option<Deferred<T>> {
    let mut transaction = self.inner.transaction.lock();
    if !transaction.is_open() {
      return None;
    }
    let method = operation.method;
    let path = operation.path.clone();
    let handle = transaction.push(operation);
    debug!(%method, %path, position = handle.position(), "Operation queued");
    Some(handle)
  }

  /// Reset transaction state after a failed direct call.
  fn abort_transaction(&self) {
    let discarded = self.inner.transaction.lock().close();
    if !discarded.is_empty() {
      warn!(discarded = discarded.len(), "Transaction discarded after failure");
    }
  }

  async fn read_list(&self, table: &str, path: &str) -> Result<ListResponse> {
    let operation = list_operation(table, path);
    let result = self
      .inner
      .cache
      .fetch(table, CacheSlot::Listing, || self.execute(&operation))
      .await?;

    debug!(table, path, cached = result.is_cached(), "List read");
    ListResponse::try_from(result.data)
  }

  /// Send one operation directly and decode its result.
  async fn execute(&self, operation: &Operation) -> Result<CrudResponse> {
    let mut request = ApiRequest::new(operation.method, self.inner.settings.url(&operation.path));
    if let Some(body) = &operation.body {
      request = request.with_body(body.clone());
    }

    match self.inner.transport.send(request).await {
      Ok(payload) => operation.shape.decode(payload),
      Err(e) => {
        warn!(method = %operation.method, path = %operation.path, error = %e, "Request failed");
        self.abort_transaction();
        Err(e)
      }
    }
  }

  async fn mutate(&self, operation: Operation, message: String) -> Result<Dispatch<EntityResponse>> {
    if let Some(handle) = self.defer(operation.clone()) {
      return Ok(Dispatch::Deferred(handle));
    }

    let response = self.execute(&operation).await?;
    if let Some(table) = &operation.table {
      self.inner.cache.invalidate(table);
    }
    self.inner.notifier.success(&message);

    Ok(Dispatch::Immediate(EntityResponse::try_from(response)?))
  }

  /// Decide, per queued operation, whether the cache already answers it.
  ///
  /// A mutation marks its table dirty so later reads of that table in the
  /// same queue are sent rather than served from the pre-mutation cache.
  fn plan(&self, queued: &[Queued]) -> Vec<Option<CrudResponse>> {
    let cache = &self.inner.cache;
    let mut dirty: HashSet<&str> = HashSet::new();

    queued
      .iter()
      .map(|entry| {
        let operation = &entry.operation;
        let table = operation.table.as_deref();

        if !operation.is_read() {
          if let Some(table) = table {
            dirty.insert(table);
          }
          return None;
        }

        match (table, operation.cache_slot) {
          (Some(table), Some(slot)) if !dirty.contains(table) => {
            cache.lookup(table, slot).map(|result| result.data)
          }
          _ => None,
        }
      })
      .collect()
  }

  async fn send_bulk(&self, operations: &[&Operation]) -> Result<Vec<Value>> {
    let body = serde_json::to_value(operations).map_err(|e| CrudError::Encode(e.to_string()))?;
    let request = ApiRequest::new(Method::Post, self.inner.settings.bulk_url()).with_body(body);

    debug!(operations = operations.len(), "Sending bulk request");

    match self.inner.transport.send(request).await? {
      Value::Array(results) if results.len() == operations.len() => Ok(results),
      Value::Array(results) => Err(CrudError::BatchMismatch {
        expected: operations.len(),
        actual: results.len(),
      }),
      other => Err(CrudError::Decode(format!(
        "bulk response is not an array: {}",
        other
      ))),
    }
  }

  /// Cache side effects of a successful bulk result.
  fn apply_to_cache(&self, operation: &Operation, response: &CrudResponse) {
    let Some(table) = operation.table.as_deref() else {
      return;
    };

    if !operation.is_read() {
      self.inner.cache.invalidate(table);
    } else if let Some(slot) = operation.cache_slot {
      self.inner.cache.store(table, slot, response.clone());
    }
  }
}

fn list_operation(table: &str, path: &str) -> Operation {
  Operation::new(Method::Get, path)
    .with_table(table)
    .expecting(ResponseShape::List)
    .caching(CacheSlot::Listing)
}

fn fail_all(queued: Vec<Queued>, error: &CrudError) {
  for entry in queued {
    if let Some(reply) = entry.reply {
      let _ = reply.send(Err(error.clone()));
    }
  }
}
