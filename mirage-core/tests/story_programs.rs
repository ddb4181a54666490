//! End-to-end tests for story programs using scripted replies.

use mirage_core::interpreter::FALLBACK_TYPE;
use mirage_core::testing::{
    assert_calls, assert_memory, assert_output_contains, ScriptedService, TestHarness,
};
use mirage_core::{
    parse_program, run_source, CallReply, InterpreterConfig, MirageError, RuntimeError,
};
use std::collections::HashMap;

const GREETER: &str = r#"story "Greeter"

object Friend:
  has name(Text) meaning "what they are called"

helper greet returns Text:
  needs name(Text)
  prompt:
<<<
Write a one-line greeting for {name}.
>>>

helper describe returns Text:
  needs subject(Text)
  prompt:
<<<
Describe the subject in three words.
>>>

begin:
  ask greet for:
    name is "Milo"
  keep answer as hello
  ask describe for:
    subject is hello
  keep answer as description
  ask greet for:
    name is "Ada"
  keep answer as hello_again
  show hello_again
"#;

#[tokio::test]
async fn test_show_input_without_service_calls() {
    let harness = TestHarness::new("inputs:\n  argument count as Int\n\nbegin:\n  show count\n")
        .with_input("count", "3");

    let report = harness.run().await.unwrap();

    assert_output_contains(&report.outputs, "count [Int] = 3");
    assert_calls(&harness.service, 0);
}

#[tokio::test]
async fn test_call_stores_return_and_update() {
    let source = r#"helper greet returns Text:
  needs name(Text)
  prompt:
<<<
Greet them.
>>>

begin:
  ask greet for:
    name is "Milo"
  keep answer as greeting
"#;
    let harness = TestHarness::new(source)
        .expect_reply(CallReply::returning("hi Milo").with_update("mood", "cheerful"));

    let report = harness.run().await.unwrap();

    assert_memory(&report.memory, "greeting", "Text", "hi Milo");
    assert_memory(&report.memory, "mood", FALLBACK_TYPE, "cheerful");
    assert_eq!(
        report.outputs,
        vec![
            "[ask greet] greeting [Text] = hi Milo",
            "[update] mood [Unknown] = cheerful",
        ]
    );
}

#[tokio::test]
async fn test_history_is_per_helper() {
    let harness = TestHarness::new(GREETER)
        .expect_reply(CallReply::returning("hi Milo"))
        .expect_reply(CallReply::returning("warm short friendly"))
        .expect_reply(CallReply::returning("hello Ada"));

    let report = harness.run().await.unwrap();
    assert_output_contains(&report.outputs, "hello_again [Text] = hello Ada");

    let requests = harness.service.requests();
    assert_eq!(requests.len(), 3);

    // First greet: no history.
    assert_eq!(requests[0].messages.len(), 1);
    // describe: never sees the greet exchange.
    assert_eq!(requests[1].messages.len(), 1);
    // Second greet: first greet's request and reply, then the new payload.
    assert_eq!(requests[2].messages.len(), 3);
    assert_eq!(requests[2].messages[0].text(), requests[0].messages[0].text());
    let prior_reply: serde_json::Value =
        serde_json::from_str(&requests[2].messages[1].text()).unwrap();
    assert_eq!(prior_reply["result"]["value"], "hi Milo");

    let describe = harness.service.payload(1);
    assert_eq!(describe["helper"], "describe");
    assert_eq!(describe["arguments"][0]["value"], "hi Milo");
    assert_eq!(describe["arguments"][0]["source"], "memory hello");
}

#[tokio::test]
async fn test_payload_carries_objects_and_memory() {
    let harness = TestHarness::new(GREETER)
        .expect_reply(CallReply::returning("hi Milo"))
        .expect_reply(CallReply::returning("warm"))
        .expect_reply(CallReply::returning("hello Ada"));

    harness.run().await.unwrap();

    let first = harness.service.payload(0);
    assert_eq!(first["returns"], "Text");
    assert_eq!(first["prompt"], "Write a one-line greeting for {name}.");
    assert_eq!(first["objects"][0]["name"], "Friend");
    assert_eq!(
        first["objects"][0]["fields"][0]["description"],
        "what they are called"
    );
    assert_eq!(first["memory"], "(memory is empty)");

    let third = harness.service.payload(2);
    assert_eq!(
        third["memory"],
        "- hello [Text]: hi Milo\n- description [Text]: warm"
    );
}

#[tokio::test]
async fn test_unknown_helper_never_calls_service() {
    let harness =
        TestHarness::new("begin:\n  note \"start\"\n  ask wish for:\n  keep answer as x\n");

    let failure = harness.run().await.unwrap_err();

    assert!(matches!(
        failure.error,
        RuntimeError::UnknownFunction { ref name } if name == "wish"
    ));
    assert_eq!(failure.outputs, vec!["[note] start"]);
    assert_calls(&harness.service, 0);
}

#[tokio::test]
async fn test_service_failure_is_fatal() {
    let harness = TestHarness::new(GREETER);

    let failure = harness.run().await.unwrap_err();

    assert!(matches!(failure.error, RuntimeError::Service(_)));
    assert_calls(&harness.service, 1);
}

#[tokio::test]
async fn test_request_uses_configured_system_text() {
    let service = ScriptedService::new(vec![
        ScriptedService::reply(CallReply::returning("a")),
        ScriptedService::reply(CallReply::returning("b")),
        ScriptedService::reply(CallReply::returning("c")),
    ]);
    let config = InterpreterConfig::default()
        .with_helper_instructions("Be terse.")
        .with_model("claude-test");

    run_source(GREETER, &HashMap::new(), &service, config)
        .await
        .unwrap();

    let requests = service.requests();
    assert_eq!(requests[0].system.as_deref(), Some("Be terse."));
    assert_eq!(requests[0].model.as_deref(), Some("claude-test"));
}

#[tokio::test]
async fn test_run_source_reports_parse_errors() {
    let service = ScriptedService::default();
    let err = run_source(
        "begin:\n  wander off\n",
        &HashMap::new(),
        &service,
        InterpreterConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MirageError::Parse(ref e) if e.line() == 2));
}

#[test]
fn test_parse_twice_is_identical() {
    assert_eq!(parse_program(GREETER).unwrap(), parse_program(GREETER).unwrap());
}
