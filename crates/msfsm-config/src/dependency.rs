use serde::{Deserialize, Serialize};

/// A reference to another automaton, as stored on a transition.
///
/// Older editor exports stored the full automaton object (or a
/// `{ automatonId }` / `{ name }` stub) instead of the bare id, so both shapes
/// are accepted. Anything else (`null`, numbers) is kept as `Other` and
/// resolves to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyRef {
  Id(String),
  Object {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(
      default,
      rename = "automatonId",
      skip_serializing_if = "Option::is_none"
    )]
    automaton_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
  },
  Other(serde_json::Value),
}

impl DependencyRef {
  /// The referenced automaton id, if the reference carries one.
  pub fn automaton_id(&self) -> Option<&str> {
    match self {
      DependencyRef::Id(id) => Some(id.as_str()),
      DependencyRef::Object {
        id, automaton_id, ..
      } => id.as_deref().or(automaton_id.as_deref()),
      DependencyRef::Other(_) => None,
    }
  }

  /// The referenced automaton name, for object references that carry one.
  pub fn name(&self) -> Option<&str> {
    match self {
      DependencyRef::Object { name, .. } => name.as_deref(),
      _ => None,
    }
  }
}
