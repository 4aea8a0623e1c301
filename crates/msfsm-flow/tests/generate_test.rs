//! Generator properties checked against editor-shaped contracts.

use msfsm_config::{AutomatonDef, ContractDef, FLOW_AUTOMATON_ID, TransitionDef};
use msfsm_flow::{DeploymentFlowGraph, generate, generate_for_contract, ids};

fn three_clause_contract() -> Vec<AutomatonDef> {
  vec![
    AutomatonDef::new("A", "Payment"),
    AutomatonDef::new("B", "Delivery")
      .with_transition(TransitionDef::new("b1", "s0", "s1").depends_on(["A"])),
    AutomatonDef::new("C", "Invoice")
      .with_transition(TransitionDef::new("c1", "s0", "s1").depends_on(["A"]))
      .with_transition(TransitionDef::new("c2", "s1", "s2").depends_on(["B"])),
  ]
}

fn edge_ids(flow: &DeploymentFlowGraph) -> Vec<&str> {
  flow.edges.iter().map(|e| e.id.as_str()).collect()
}

#[test]
fn test_regeneration_is_deterministic() {
  let automata = three_clause_contract();
  let first = generate(&automata);
  let second = generate(&automata);

  assert_eq!(first, second);
  assert_eq!(
    serde_json::to_string(&first).unwrap(),
    serde_json::to_string(&second).unwrap()
  );
}

#[test]
fn test_three_automata_scenario() {
  let flow = generate(&three_clause_contract());

  assert_eq!(flow.nodes.len(), 3);
  assert_eq!(
    edge_ids(&flow),
    vec![
      "deployment-edge-A-to-B",
      "deployment-edge-A-to-C",
      "deployment-edge-B-to-C",
    ]
  );
  assert_eq!(flow.dependencies_of("C"), vec!["A", "B"]);
}

#[test]
fn test_every_declared_dependency_has_exactly_one_edge() {
  let automata = three_clause_contract();
  let flow = generate(&automata);

  for target in &automata {
    for dep in target.dependency_ids() {
      let expected = ids::edge_id(dep, &target.id);
      let count = flow.edges.iter().filter(|e| e.id == expected).count();
      assert_eq!(count, 1, "edge {expected}");
    }
  }
}

#[test]
fn test_sentinel_never_appears() {
  let mut automata = three_clause_contract();
  automata.insert(
    1,
    AutomatonDef::new(FLOW_AUTOMATON_ID, "Flow Déploiement")
      .with_transition(TransitionDef::new("f", "s0", "s1").depends_on(["A"])),
  );
  automata[0]
    .transitions
    .push(TransitionDef::new("a1", "s0", "s1").depends_on([FLOW_AUTOMATON_ID]));

  let flow = generate(&automata);
  let sentinel_node = ids::node_id(FLOW_AUTOMATON_ID);

  assert!(flow.nodes.iter().all(|n| n.automate_id != FLOW_AUTOMATON_ID));
  assert!(
    flow
      .edges
      .iter()
      .all(|e| e.source != sentinel_node && e.target != sentinel_node)
  );
  // The sentinel does not consume an execution key.
  assert_eq!(flow.nodes[1].automata_key, "Automata1");
  assert_eq!(flow.nodes[1].automate_id, "B");
}

#[test]
fn test_contract_with_object_dependencies() {
  let json = r#"{
    "name": "Lease",
    "automates": [
      { "id": "01", "name": "Deposit" },
      { "id": "02", "name": "Keys", "transitions": [
        { "id": "t1", "source": "s0", "target": "s1",
          "automataDependencies": [{ "id": "01", "name": "Deposit" }, { "name": "nameless" }] }
      ] },
      { "id": "03", "name": "Inventory", "transitions": [
        { "id": "t1", "source": "s0", "target": "s1",
          "automataDependencies": [{ "name": "Keys" }] }
      ] }
    ]
  }"#;
  let contract = ContractDef::from_json(json).unwrap();
  let flow = generate_for_contract(&contract);

  assert_eq!(
    edge_ids(&flow),
    vec!["deployment-edge-01-to-02", "deployment-edge-02-to-03"]
  );
}

#[test]
fn test_null_dependency_entries_are_dropped() {
  let json = r#"{
    "name": "Lease",
    "automates": [
      { "id": "01", "name": "Deposit" },
      { "id": "02", "name": "Keys", "transitions": [
        { "id": "t1", "source": "s0", "target": "s1", "automataDependencies": ["01", null] }
      ] }
    ]
  }"#;
  let contract = ContractDef::from_json(json).unwrap();
  let flow = generate_for_contract(&contract);

  assert_eq!(flow.nodes.len(), 2);
  assert_eq!(edge_ids(&flow), vec!["deployment-edge-01-to-02"]);
}

#[test]
fn test_flow_json_round_trip_keeps_execution_fields() {
  let mut flow = generate(&three_clause_contract());
  flow.prepare_deployment("sale-2024");

  let json = flow.to_json_pretty().unwrap();
  let parsed = DeploymentFlowGraph::from_json(&json).unwrap();

  assert_eq!(parsed, flow);
}
