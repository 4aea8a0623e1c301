use serde::{Deserialize, Serialize};

use crate::dependency::DependencyRef;

/// Id reserved for the derived deployment-flow automaton.
///
/// The editor stores the generated flow alongside the real automata, so every
/// consumer of a contract's automata list has to skip this entry.
pub const FLOW_AUTOMATON_ID: &str = "flow-deploiement";

/// Canvas coordinates of a state or flow node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

impl Position {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// A single automaton (one clause of a contract).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatonDef {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub states: Vec<StateDef>,
  #[serde(default)]
  pub transitions: Vec<TransitionDef>,
}

impl AutomatonDef {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      states: Vec::new(),
      transitions: Vec::new(),
    }
  }

  /// Whether this entry is the derived deployment flow rather than a clause.
  pub fn is_flow(&self) -> bool {
    self.id == FLOW_AUTOMATON_ID
  }

  /// Append a transition, builder style.
  pub fn with_transition(mut self, transition: TransitionDef) -> Self {
    self.transitions.push(transition);
    self
  }

  /// Every dependency reference declared on this automaton's transitions,
  /// in declaration order (duplicates kept).
  pub fn dependencies(&self) -> impl Iterator<Item = &DependencyRef> {
    self.transitions.iter().flat_map(|t| t.dependencies().iter())
  }

  /// Ids of every automaton this one depends on by id. References carrying
  /// only a name are left out.
  pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
    self.dependencies().filter_map(DependencyRef::automaton_id)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
  pub id: String,
  #[serde(default)]
  pub label: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub state_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDef {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(
    default,
    rename = "automataDependencies",
    skip_serializing_if = "Option::is_none"
  )]
  pub automata_dependencies: Option<Vec<DependencyRef>>,
}

impl TransitionDef {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      label: None,
      automata_dependencies: None,
    }
  }

  /// Declare the automata whose completion gates this transition.
  pub fn depends_on<I, S>(mut self, ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let deps = ids.into_iter().map(|id| DependencyRef::Id(id.into())).collect();
    self.automata_dependencies = Some(deps);
    self
  }

  /// Declared dependencies, empty when the field is absent.
  pub fn dependencies(&self) -> &[DependencyRef] {
    self.automata_dependencies.as_deref().unwrap_or(&[])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_transition_without_dependencies_field() {
    let json = r#"{ "id": "t1", "source": "s0", "target": "s1", "label": "sign" }"#;
    let transition: TransitionDef = serde_json::from_str(json).unwrap();
    assert!(transition.dependencies().is_empty());
  }

  #[test]
  fn test_dependency_ids_flatten_transitions() {
    let automaton = AutomatonDef::new("03", "Delivery")
      .with_transition(TransitionDef::new("t1", "s0", "s1").depends_on(["01"]))
      .with_transition(TransitionDef::new("t2", "s1", "s2"))
      .with_transition(TransitionDef::new("t3", "s2", "s3").depends_on(["02", "01"]));

    let deps: Vec<&str> = automaton.dependency_ids().collect();
    assert_eq!(deps, vec!["01", "02", "01"]);
  }

  #[test]
  fn test_null_dependency_entry_is_accepted() {
    let json = r#"{ "id": "t1", "source": "s0", "target": "s1", "automataDependencies": ["01", null] }"#;
    let transition: TransitionDef = serde_json::from_str(json).unwrap();

    assert_eq!(transition.dependencies().len(), 2);
    let automaton = AutomatonDef::new("02", "Keys").with_transition(transition);
    assert_eq!(automaton.dependency_ids().collect::<Vec<_>>(), vec!["01"]);
  }

  #[test]
  fn test_flow_automaton_is_detected() {
    assert!(AutomatonDef::new(FLOW_AUTOMATON_ID, "Flow").is_flow());
    assert!(!AutomatonDef::new("01", "Payment").is_flow());
  }
}
