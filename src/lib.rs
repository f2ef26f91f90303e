//! Typed CRUD client for REST APIs.
//!
//! - [`crud::CrudService`] turns model objects into `GET`/`POST`/`PUT`/`DELETE`
//!   calls following the table conventions of the API
//! - cacheable tables are read once and served from memory until a mutation
//!   against them succeeds ([`cache`])
//! - calls made between `begin_transaction` and `end_transaction` are sent as
//!   one `POST bulk` request and demultiplexed back in order
//!
//! The HTTP layer and the user-facing notifier are injected through the
//! [`http::Transport`] and [`notify::Notifier`] traits.

pub mod cache;
pub mod config;
pub mod crud;
pub mod error;
pub mod http;
pub mod logging;
pub mod notify;

pub use crud::{
  CrudResponse, CrudService, CrudSettings, Dispatch, EntityResponse, ListResponse, Model,
  Operation, Relation, SearchCriteria,
};
pub use error::{CrudError, Result};
