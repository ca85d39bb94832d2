//! End-to-end patch synthesis tests against a scripted gateway.
#![allow(clippy::unwrap_used)]

use confguard::test_utils::ScriptedGateway;
use confguard::{
    autofix_task, AutofixError, FileType, Finding, GenError, Settings, Severity, TaskInput,
    TaskPatch, TaskState, TaskStore,
};

fn finding(title: &str, evidence: &str, recommendation: &str) -> Finding {
    Finding {
        id: "CG-DOCK-001".to_owned(),
        title: title.to_owned(),
        severity: Severity::High,
        line_range: None,
        evidence: evidence.to_owned(),
        rationale: "risk".to_owned(),
        recommendation: recommendation.to_owned(),
        autofix_hint: None,
        source: None,
    }
}

/// Seeds a task that already went through analysis.
fn analyzed_task(store: &TaskStore, text: &str, findings: Vec<Finding>) -> String {
    let id = store.create_task(
        FileType::Dockerfile,
        TaskInput {
            text: Some(text.to_owned()),
            image_base64: None,
        },
    );
    store.update(
        &id,
        TaskPatch {
            state: Some(TaskState::Planned),
            findings: Some(findings),
            ..TaskPatch::default()
        },
    );
    id
}

#[tokio::test]
async fn happy_path_produces_diff_and_persists_patch() {
    let store = TaskStore::new();
    let original = "FROM node:latest\nCOPY . .\nCMD [\"node\"]\n";
    let id = analyzed_task(
        &store,
        original,
        vec![finding(
            "Container runs as root",
            "No USER directive found",
            "add a USER directive",
        )],
    );

    let gateway = ScriptedGateway::replying(&[
        "FROM node:latest\nCOPY . .\nUSER node\nCMD [\"node\"]",
    ]);
    let settings = Settings::default();

    let diff = autofix_task(&store, &gateway, &settings, &id).await.unwrap();

    assert!(diff.starts_with("--- dockerfile\tbefore\n+++ dockerfile\tafter\n"));
    assert!(diff.contains("+USER node"));

    let task = store.get(&id).unwrap();
    assert_eq!(task.state, TaskState::Patched);
    assert_eq!(task.patch_diff.as_deref(), Some(diff.as_str()));
    // The deterministic pinning pass rewrote the base image.
    let patched = task.patched_text.unwrap();
    assert!(patched.starts_with("FROM node:22.0.0 AS builder\n"));
    assert!(!patched.contains("node:latest"));
}

#[tokio::test]
async fn structured_output_is_repaired_once_then_accepted() {
    let store = TaskStore::new();
    let id = analyzed_task(
        &store,
        "FROM alpine:3.20\nCMD [\"sh\"]\n",
        vec![finding("Root user", "No USER directive found", "add USER")],
    );

    let gateway = ScriptedGateway::replying(&[
        r#"[{"op":"add","path":"/2","value":"USER app"}]"#,
        "FROM alpine:3.20\nUSER app\nCMD [\"sh\"]",
    ]);
    let settings = Settings::default();

    let diff = autofix_task(&store, &gateway, &settings, &id).await.unwrap();
    assert!(diff.contains("+USER app"));
    assert_eq!(gateway.recorded_prompts().len(), 2);
    // The repair prompt embeds the structured output it must apply.
    assert!(gateway.recorded_prompts()[1].contains(r#""op":"add""#));
}

#[tokio::test]
async fn still_structured_after_repair_is_a_terminal_bad_format() {
    let store = TaskStore::new();
    let id = analyzed_task(
        &store,
        "FROM alpine:3.20\n",
        vec![finding("t", "e", "r")],
    );

    let gateway = ScriptedGateway::replying(&[
        r#"{"patched": "nope"}"#,
        r#"[{"op":"replace","path":"/0","value":"x"}]"#,
    ]);
    let settings = Settings::default();

    let err = autofix_task(&store, &gateway, &settings, &id).await.unwrap_err();
    assert_eq!(err, AutofixError::BadFormat);
    // No third repair attempt, and nothing was persisted.
    assert_eq!(gateway.recorded_prompts().len(), 2);
    let task = store.get(&id).unwrap();
    assert_eq!(task.state, TaskState::Planned);
    assert!(task.patched_text.is_none());
}

#[tokio::test]
async fn disallowed_lines_trigger_one_retry_then_hard_strip() {
    let store = TaskStore::new();
    let original = "FROM debian:12\nCMD [\"app\"]\n";
    let id = analyzed_task(
        &store,
        original,
        vec![finding("Root user", "No USER directive found", "add USER")],
    );

    // Both attempts sneak in a package install; the second is hard-stripped.
    let gateway = ScriptedGateway::replying(&[
        "FROM debian:12\nRUN apt-get install -y curl\nUSER app\nCMD [\"app\"]",
        "FROM debian:12\nRUN yum install wget\nUSER app\nCMD [\"app\"]",
    ]);
    let settings = Settings::default();

    autofix_task(&store, &gateway, &settings, &id).await.unwrap();

    assert_eq!(gateway.recorded_prompts().len(), 2);
    // The retry used the stricter prompt variant.
    assert!(gateway.recorded_prompts()[1].contains("Touch ONLY lines implicated"));

    let patched = store.get(&id).unwrap().patched_text.unwrap();
    assert!(!patched.to_lowercase().contains("install"));
    assert!(patched.contains("USER app"));
}

#[tokio::test]
async fn findings_requiring_tooling_exempt_the_install_line() {
    let store = TaskStore::new();
    let original = "FROM debian:12\nCMD [\"app\"]\n";
    let id = analyzed_task(
        &store,
        original,
        vec![finding(
            "Missing health check",
            "no HEALTHCHECK present",
            "healthcheck endpoint requires curl to be installed",
        )],
    );

    let gateway = ScriptedGateway::replying(&[
        "FROM debian:12\nRUN apt-get install -y curl\nHEALTHCHECK CMD curl -f http://localhost/\nCMD [\"app\"]",
    ]);
    let settings = Settings::default();

    autofix_task(&store, &gateway, &settings, &id).await.unwrap();

    // One attempt only; the install line survives because the findings
    // explicitly require curl.
    assert_eq!(gateway.recorded_prompts().len(), 1);
    let patched = store.get(&id).unwrap().patched_text.unwrap();
    assert!(patched.contains("apt-get install -y curl"));
}

#[tokio::test]
async fn fenced_and_quoted_output_is_sanitized() {
    let store = TaskStore::new();
    let id = analyzed_task(
        &store,
        "FROM alpine:3.20\nCMD [\"sh\"]\n",
        vec![finding("Root user", "No USER directive found", "add USER")],
    );

    let gateway = ScriptedGateway::replying(&[
        "```dockerfile\nFROM alpine:3.20\nUSER app\nCMD [\"sh\"]\n```",
    ]);
    let settings = Settings::default();

    autofix_task(&store, &gateway, &settings, &id).await.unwrap();
    let patched = store.get(&id).unwrap().patched_text.unwrap();
    assert!(!patched.contains("```"));
    assert!(patched.starts_with("FROM alpine:3.20"));
}

#[tokio::test]
async fn preconditions_are_checked_before_any_generative_call() {
    let store = TaskStore::new();
    let gateway = ScriptedGateway::replying(&["unused"]);
    let settings = Settings::default();

    let err = autofix_task(&store, &gateway, &settings, "tsk_missing")
        .await
        .unwrap_err();
    assert_eq!(err, AutofixError::NotFound);

    // Text but no findings.
    let id = store.create_task(
        FileType::Dockerfile,
        TaskInput {
            text: Some("FROM x\n".to_owned()),
            image_base64: None,
        },
    );
    let err = autofix_task(&store, &gateway, &settings, &id).await.unwrap_err();
    assert_eq!(err, AutofixError::NoFindings);

    // Image but no resolved text.
    let id = store.create_task(
        FileType::Dockerfile,
        TaskInput {
            text: None,
            image_base64: Some("aW1hZ2U=".to_owned()),
        },
    );
    let err = autofix_task(&store, &gateway, &settings, &id).await.unwrap_err();
    assert_eq!(err, AutofixError::NoOriginalText);

    assert!(gateway.recorded_prompts().is_empty());
}

#[tokio::test]
async fn backend_failure_surfaces_as_synthesis_failure() {
    let store = TaskStore::new();
    let id = analyzed_task(&store, "FROM x\n", vec![finding("t", "e", "r")]);

    let gateway = ScriptedGateway::new(vec![Err(GenError::Backend("connection reset".to_owned()))]);
    let settings = Settings::default();

    let err = autofix_task(&store, &gateway, &settings, &id).await.unwrap_err();
    match err {
        AutofixError::Failed(detail) => assert!(detail.contains("connection reset")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn configured_node_version_is_used_for_pinning() {
    let store = TaskStore::new();
    let id = analyzed_task(
        &store,
        "FROM node:latest\nCMD [\"node\"]\n",
        vec![finding("Unpinned base image (latest)", "FROM node:latest", "pin it")],
    );

    let gateway = ScriptedGateway::replying(&["FROM node:latest\nUSER node\nCMD [\"node\"]"]);
    let settings = Settings {
        node_base_version: "20.11.1".to_owned(),
        ..Settings::default()
    };

    autofix_task(&store, &gateway, &settings, &id).await.unwrap();
    let patched = store.get(&id).unwrap().patched_text.unwrap();
    assert!(patched.starts_with("FROM node:20.11.1 AS builder\n"));
}
