use std::fmt;

/// Key of a cached query: the entity type plus the filter it was run with.
///
/// The empty filter is the unfiltered list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  entity: String,
  filter: String,
}

impl QueryKey {
  pub fn new(entity: impl Into<String>) -> Self {
    Self {
      entity: entity.into(),
      filter: String::new(),
    }
  }

  /// Same entity, different filter. Surrounding whitespace is not significant.
  pub fn with_filter(mut self, filter: impl AsRef<str>) -> Self {
    self.filter = filter.as_ref().trim().to_string();
    self
  }

  pub fn entity(&self) -> &str {
    &self.entity
  }

  pub fn filter(&self) -> &str {
    &self.filter
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.filter.is_empty() {
      write!(f, "{}", self.entity)
    } else {
      write!(f, "{}[{}]", self.entity, self.filter)
    }
  }
}
