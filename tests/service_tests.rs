//! Direct (non-transaction) calls against a mock transport.

mod common;

use common::{harness, list, url, Currency, User};
use crudkit::crud::{Relation, SearchCriteria};
use crudkit::http::Method;
use crudkit::CrudError;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_list_url_carries_filter_then_relations() {
  let h = harness(&[]);
  h.transport.add_response(
    Method::Get,
    &url("users?active=true&relations=[roles,teams]"),
    Ok(list(&[1, 2])),
  );

  let criteria = SearchCriteria::new().filter("active", true);
  let relations = vec![Relation::new("roles"), Relation::new("teams")];
  let users = h
    .service
    .get("users", Some(&criteria), Some(relations.as_slice()))
    .await
    .unwrap()
    .immediate()
    .unwrap();

  assert_eq!(users.len(), 2);
  assert_eq!(users.pagination.total, Some(2));
  assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test]
async fn test_cacheable_table_is_fetched_once() {
  let h = harness(&["countries"]);
  h.transport
    .add_response(Method::Get, &url("countries"), Ok(list(&[1, 2, 3])));

  let first = h.service.get("countries", None, None).await.unwrap().immediate().unwrap();
  let second = h.service.get("countries", None, None).await.unwrap().immediate().unwrap();

  assert_eq!(first, second);
  assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test]
async fn test_non_cacheable_table_always_hits_network() {
  let h = harness(&["countries"]);
  h.transport.add_response(Method::Get, &url("users"), Ok(list(&[1])));
  h.transport.add_response(Method::Get, &url("users"), Ok(list(&[1, 2])));

  h.service.get("users", None, None).await.unwrap();
  let second = h.service.get("users", None, None).await.unwrap().immediate().unwrap();

  assert_eq!(second.len(), 2);
  assert_eq!(h.transport.call_count(), 2);
}

#[tokio::test]
async fn test_mutation_invalidates_cache_before_notifying() {
  let h = harness(&["currencies"]);
  h.transport
    .add_response(Method::Get, &url("currencies"), Ok(list(&[1])));
  h.transport
    .add_response(Method::Post, &url("currencies"), Ok(json!({"code": "eur"})));
  h.transport
    .add_response(Method::Get, &url("currencies"), Ok(list(&[1, 2])));

  h.service.get("currencies", None, None).await.unwrap();
  assert!(h.service.cache().lookup("currencies", crudkit::cache::CacheSlot::Listing).is_some());

  let created = h
    .service
    .post(&Currency::new("eur"), None)
    .await
    .unwrap()
    .immediate()
    .unwrap();
  assert_eq!(created.data, json!({"code": "eur"}));
  assert!(h.service.cache().lookup("currencies", crudkit::cache::CacheSlot::Listing).is_none());
  assert_eq!(h.notifier.messages(), vec!["currencies eur added successfully."]);

  let refreshed = h.service.get("currencies", None, None).await.unwrap().immediate().unwrap();
  assert_eq!(refreshed.len(), 2);
  assert_eq!(h.transport.call_count(), 3);
}

#[tokio::test]
async fn test_put_and_delete_paths_and_messages() {
  let h = harness(&[]);
  let user = User::new(7, "Ada");
  h.transport
    .add_response(Method::Put, &url("users/7"), Ok(json!({"id": 7, "name": "Ada"})));
  h.transport
    .add_response(Method::Delete, &url("accounts/7"), Ok(json!(null)));

  h.service.put(&user, None).await.unwrap();
  h.service.delete(&user, Some("accounts")).await.unwrap();

  let calls = h.transport.calls();
  assert_eq!(calls[0].body, Some(json!({"id": 7, "name": "Ada"})));
  assert_eq!(calls[1].url, url("accounts/7"));
  assert!(calls[1].body.is_none());
  assert_eq!(
    h.notifier.messages(),
    vec!["users 7 updated successfully.", "accounts 7 deleted successfully."]
  );
}

#[tokio::test]
async fn test_detail_relation_and_index_reads() {
  let h = harness(&["countries"]);
  h.transport.add_response(
    Method::Get,
    &url("users/7?relations=[roles.permissions]"),
    Ok(json!({"id": 7})),
  );
  h.transport
    .add_response(Method::Get, &url("users/7/roles"), Ok(json!([{"id": 1}])));
  h.transport
    .add_response(Method::Get, &url("countries/index"), Ok(json!({"fr": "France"})));

  let relations = vec![Relation::new("roles").nested("permissions")];
  let user = h
    .service
    .get_by_id("users", "7", Some(relations.as_slice()))
    .await
    .unwrap()
    .immediate()
    .unwrap();
  assert_eq!(user.data["id"], 7);

  let roles = h
    .service
    .get_relation("users", "7", "roles")
    .await
    .unwrap()
    .immediate()
    .unwrap();
  assert_eq!(roles.data, json!([{"id": 1}]));

  h.service.index("countries").await.unwrap();
  let index = h.service.index("countries").await.unwrap().immediate().unwrap();
  assert_eq!(index.data["fr"], "France");

  assert_eq!(h.transport.call_count(), 3);
  assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_relation_mutations() {
  let h = harness(&[]);
  let role = User::new(3, "admin");
  h.transport
    .add_response(Method::Post, &url("users/7/roles"), Ok(json!({"id": 3})));
  h.transport
    .add_response(Method::Post, &url("users/7/roles/3"), Ok(json!([])));
  h.transport
    .add_response(Method::Delete, &url("users/7/roles/3"), Ok(json!(null)));

  h.service
    .post_relation(&role, &["users", "7"], Some("roles"))
    .await
    .unwrap();
  h.service
    .create_relation(&["users", "7", "roles", "3"])
    .await
    .unwrap();
  h.service
    .delete_relation(&role, &["users", "7"], Some("roles"))
    .await
    .unwrap();

  let calls = h.transport.calls();
  assert_eq!(calls[0].body, Some(json!({"id": 3, "name": "admin"})));
  assert_eq!(calls[1].body, Some(json!([])));
  assert_eq!(
    h.notifier.messages(),
    vec![
      "Relation 3 added successfully.",
      "Relation added successfully.",
      "Relation 3 deleted successfully.",
    ]
  );
}

#[tokio::test]
async fn test_transport_failure_is_surfaced_unchanged() {
  let h = harness(&["countries"]);
  h.transport.add_response(
    Method::Get,
    &url("countries"),
    Err(CrudError::Http {
      status: 500,
      body: "boom".into(),
    }),
  );

  let err = h.service.get("countries", None, None).await.unwrap_err();

  assert_eq!(err.status(), Some(500));
  assert!(h.service.cache().lookup("countries", crudkit::cache::CacheSlot::Listing).is_none());
}

#[tokio::test]
async fn test_list_read_rejects_payload_without_data() {
  let h = harness(&["countries"]);
  h.transport.add_response(
    Method::Get,
    &url("countries"),
    Ok(json!({"error": "not a list"})),
  );
  h.transport.add_response(Method::Get, &url("countries"), Ok(json!([])));

  let err = h.service.get("countries", None, None).await.unwrap_err();
  assert!(matches!(err, CrudError::Decode(_)));
  let err = h.service.get("countries", None, None).await.unwrap_err();
  assert!(matches!(err, CrudError::Decode(_)));

  assert!(h.service.cache().lookup("countries", crudkit::cache::CacheSlot::Listing).is_none());
  assert_eq!(h.transport.call_count(), 2);
}

#[tokio::test]
async fn test_failed_mutation_does_not_notify_or_invalidate() {
  let h = harness(&["currencies"]);
  h.transport
    .add_response(Method::Get, &url("currencies"), Ok(list(&[1])));
  h.transport.add_response(
    Method::Post,
    &url("currencies"),
    Err(CrudError::Transport("connection reset".into())),
  );

  h.service.get("currencies", None, None).await.unwrap();
  let err = h.service.post(&Currency::new("eur"), None).await.unwrap_err();

  assert_eq!(err, CrudError::Transport("connection reset".into()));
  assert!(h.notifier.messages().is_empty());
  assert!(h.service.cache().is_live("currencies", crudkit::cache::CacheSlot::Listing));
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
  let h = harness(&["countries"]);
  h.transport.add_response(Method::Get, &url("countries"), Ok(list(&[1])));
  h.transport.add_response(Method::Get, &url("countries"), Ok(list(&[1])));

  h.service.get("countries", None, None).await.unwrap();
  h.service.clear_cache();
  h.service.get("countries", None, None).await.unwrap();

  assert_eq!(h.transport.call_count(), 2);
}

#[tokio::test]
async fn test_debounced_reads_collapse_into_last_request() {
  let h = harness(&[]);
  h.transport
    .add_response(Method::Get, &url("users?q=abc"), Ok(list(&[4])));

  let a = SearchCriteria::new().filter("q", "a");
  let ab = SearchCriteria::new().filter("q", "ab");
  let abc = SearchCriteria::new().filter("q", "abc");

  let (first, second, third) = tokio::join!(
    h.service.get_debounced("users", Some(&a), None),
    h.service.get_debounced("users", Some(&ab), None),
    h.service.get_debounced("users", Some(&abc), None),
  );

  assert_eq!(h.transport.call_count(), 1);
  assert_eq!(h.transport.calls()[0].url, url("users?q=abc"));
  for result in [first, second, third] {
    assert_eq!(result.unwrap().immediate().unwrap().len(), 1);
  }
}

#[tokio::test]
async fn test_debounced_reads_outside_window_are_separate() {
  let h = harness(&[]);
  h.transport.add_response(Method::Get, &url("users"), Ok(list(&[1])));
  h.transport.add_response(Method::Get, &url("users"), Ok(list(&[1, 2])));

  h.service.get_debounced("users", None, None).await.unwrap();
  tokio::time::sleep(Duration::from_millis(10)).await;
  let second = h
    .service
    .get_debounced("users", None, None)
    .await
    .unwrap()
    .immediate()
    .unwrap();

  assert_eq!(second.len(), 2);
  assert_eq!(h.transport.call_count(), 2);
}
