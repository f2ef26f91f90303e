//! Typed CRUD surface over a REST API.
//!
//! [`CrudService`] maps calls to table-relative paths, reads cacheable tables
//! through a [`TableCache`](crate::cache::TableCache), and can buffer calls
//! into a single bulk transaction.

mod debounce;
mod model;
mod operation;
mod paths;
mod response;
mod service;
mod settings;

pub use model::{Model, Record};
pub use operation::Operation;
pub use paths::{
  detail_path, index_path, list_path, relation_collection_path, relation_list, relation_path,
  Relation, SearchCriteria,
};
pub use response::{
  CrudResponse, Deferred, Dispatch, EntityResponse, ListResponse, Pagination, ResponseShape,
};
pub use service::CrudService;
pub use settings::CrudSettings;
