//! Request path builder.
//!
//! Paths are table-relative (`users/3?relations=[roles]`) and purely
//! concatenative: nothing is escaped here beyond what [`SearchCriteria`] and
//! [`Relation`] already produce, and relation order is preserved.

use url::form_urlencoded;

/// Ordered list of `key=value` filters for list reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
  filters: Vec<(String, String)>,
}

impl SearchCriteria {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a filter. Repeated keys are kept.
  pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
    self.filters.push((key.into(), value.to_string()));
    self
  }

  pub fn is_empty(&self) -> bool {
    self.filters.is_empty()
  }

  /// Form-encoded query string, e.g. `name=Jo+Doe&active=true`.
  pub fn url_string(&self) -> String {
    form_urlencoded::Serializer::new(String::new())
      .extend_pairs(self.filters.iter())
      .finish()
  }
}

/// A relation to expand inline, optionally through nested relations
/// (`comments.author`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
  path: Vec<String>,
}

impl Relation {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      path: vec![name.into()],
    }
  }

  /// Expand `name` on the related records as well.
  pub fn nested(mut self, name: impl Into<String>) -> Self {
    self.path.push(name.into());
    self
  }

  pub fn url_string(&self) -> String {
    self.path.join(".")
  }
}

impl From<&str> for Relation {
  fn from(name: &str) -> Self {
    let mut parts = name.split('.');
    let mut relation = Relation::new(parts.next().unwrap_or_default());
    for part in parts {
      relation = relation.nested(part);
    }
    relation
  }
}

/// `[r1,r2,...]`
pub fn relation_list(relations: &[Relation]) -> String {
  let names: Vec<String> = relations.iter().map(Relation::url_string).collect();
  format!("[{}]", names.join(","))
}

/// `table?filters&relations=[...]`
///
/// An empty criteria string counts as absent. A supplied but empty relation
/// list still produces `relations=[]`.
pub fn list_path(
  table: &str,
  criteria: Option<&SearchCriteria>,
  relations: Option<&[Relation]>,
) -> String {
  let mut query = criteria.map(SearchCriteria::url_string).unwrap_or_default();

  if let Some(relations) = relations {
    if !query.is_empty() {
      query.push('&');
    }
    query.push_str("relations=");
    query.push_str(&relation_list(relations));
  }

  if query.is_empty() {
    table.to_string()
  } else {
    format!("{}?{}", table, query)
  }
}

/// `table/id` or `table/id?relations=[...]`
pub fn detail_path(table: &str, id: &str, relations: Option<&[Relation]>) -> String {
  match relations {
    Some(relations) => format!("{}/{}?relations={}", table, id, relation_list(relations)),
    None => format!("{}/{}", table, id),
  }
}

/// `table/id/relation`
pub fn relation_path(table: &str, id: &str, relation: &str) -> String {
  format!("{}/{}/{}", table, id, relation)
}

/// `table/index`
pub fn index_path(table: &str) -> String {
  format!("{}/index", table)
}

/// `p1/p2/.../relation_table`
pub fn relation_collection_path(parents: &[&str], relation_table: &str) -> String {
  let mut segments = parents.to_vec();
  segments.push(relation_table);
  segments.join("/")
}
