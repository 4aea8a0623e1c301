use serde::{Deserialize, Serialize};

use crate::automaton::AutomatonDef;
use crate::error::ConfigError;

/// A contract as exported by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub name: String,
  #[serde(default)]
  pub automates: Vec<AutomatonDef>,
}

impl ContractDef {
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Automata that describe clauses, skipping the derived deployment flow.
  pub fn source_automates(&self) -> impl Iterator<Item = &AutomatonDef> {
    self.automates.iter().filter(|a| !a.is_flow())
  }

  /// Look up an automaton by id.
  pub fn automaton(&self, automaton_id: &str) -> Result<&AutomatonDef, ConfigError> {
    self
      .automates
      .iter()
      .find(|a| a.id == automaton_id)
      .ok_or_else(|| ConfigError::AutomatonNotFound(automaton_id.to_string()))
  }
}
