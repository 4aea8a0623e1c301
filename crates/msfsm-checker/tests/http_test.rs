//! HttpCompletionChecker against a mocked execution backend.

use msfsm_checker::{
  CheckError, CompletionChecker, HttpCheckerConfig, HttpCompletionChecker, RetryPolicy,
  RetryingChecker,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IS_COMPLETED_PATH: &str = "/smart-contracts/sale/clause/Automata0/function/is_completed/execute";

fn checker_for(server: &MockServer) -> HttpCompletionChecker {
  let config = HttpCheckerConfig::new(Url::parse(&server.uri()).unwrap());
  HttpCompletionChecker::new(config).unwrap()
}

async fn respond_with(server: &MockServer, response: ResponseTemplate) {
  Mock::given(method("POST"))
    .and(path(IS_COMPLETED_PATH))
    .and(body_json(json!({ "args": [] })))
    .respond_with(response)
    .mount(server)
    .await;
}

#[tokio::test]
async fn test_completed_automaton() {
  let server = MockServer::start().await;
  respond_with(
    &server,
    ResponseTemplate::new(200).set_body_json(json!({ "result": true, "gas_used": 21000 })),
  )
  .await;

  let completed = checker_for(&server)
    .check_completed("sale", "Automata0")
    .await
    .unwrap();
  assert!(completed);
}

#[tokio::test]
async fn test_only_literal_true_counts() {
  let server = MockServer::start().await;
  respond_with(
    &server,
    ResponseTemplate::new(200).set_body_json(json!({ "result": "true" })),
  )
  .await;

  let completed = checker_for(&server)
    .check_completed("sale", "Automata0")
    .await
    .unwrap();
  assert!(!completed);
}

#[tokio::test]
async fn test_backend_error_field() {
  let server = MockServer::start().await;
  respond_with(
    &server,
    ResponseTemplate::new(200).set_body_json(json!({ "error": "contract not deployed" })),
  )
  .await;

  let result = checker_for(&server).check_completed("sale", "Automata0").await;
  assert!(matches!(result, Err(CheckError::Backend(msg)) if msg == "contract not deployed"));
}

#[tokio::test]
async fn test_unexpected_body() {
  let server = MockServer::start().await;
  respond_with(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

  let result = checker_for(&server).check_completed("sale", "Automata0").await;
  assert!(matches!(result, Err(CheckError::UnexpectedResponse(_))));
}

#[tokio::test]
async fn test_server_error_status() {
  let server = MockServer::start().await;
  respond_with(&server, ResponseTemplate::new(502).set_body_string("bad gateway")).await;

  let result = checker_for(&server).check_completed("sale", "Automata0").await;
  match result {
    Err(e @ CheckError::Status { status: 502, .. }) => assert!(e.is_transient()),
    other => panic!("expected 502 status error, got {other:?}"),
  }
}

#[tokio::test]
async fn test_retrying_checker_gives_up_on_server_errors() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path(IS_COMPLETED_PATH))
    .respond_with(ResponseTemplate::new(503))
    .expect(2)
    .mount(&server)
    .await;

  let checker = RetryingChecker::new(
    checker_for(&server),
    RetryPolicy {
      max_attempts: 2,
      base_delay_ms: 1,
      ..RetryPolicy::default()
    },
  );

  let result = checker.check_completed("sale", "Automata0").await;
  assert!(matches!(result, Err(CheckError::Status { status: 503, .. })));
}
