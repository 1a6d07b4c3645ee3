//! End-to-end pipeline tests with mock completion backends.
//!
//! These exercise the full path the CLI drives — create a function, branch
//! a version, evaluate it through the invoker and grading engine, persist
//! the aggregate — without real API calls.

use std::sync::Arc;

use promptgrade_core::grading::{GradingConfig, GradingEngine};
use promptgrade_core::model::{
    FunctionDefinition, FunctionKind, OwnerAggregate, TestCase, VersionParameters,
};
use promptgrade_core::orchestrator::Orchestrator;
use promptgrade_core::traits::FunctionStore;
use promptgrade_invoke::LlmInvoker;
use promptgrade_providers::mock::MockCompletion;
use promptgrade_store::MemoryStore;
use serde_json::json;

/// Grading backend returning a conforming wrapped response at a fixed
/// score.
fn grader(score: f64, reasoning: &str) -> Orchestrator {
    let response = json!({
        "Answer": {
            "scores": {"Correctness": score},
            "models_output": "stub",
            "reasoning": reasoning,
        },
        "reasoning": "",
    });
    Orchestrator::new(GradingEngine::new(
        Arc::new(MockCompletion::with_fixed_response(response)),
        GradingConfig::default(),
    ))
}

/// Function-under-test backend answering every question the same way.
fn invoker() -> LlmInvoker {
    LlmInvoker::new(Arc::new(MockCompletion::with_fixed_response(
        json!({"Answer": "stub"}),
    )))
}

fn definition(tests: usize) -> FunctionDefinition {
    FunctionDefinition {
        name: "calculus-qa".into(),
        task: "Answer calculus questions".into(),
        kind: FunctionKind::Completion,
        input_schema: json!({
            "type": "object",
            "properties": {"Question": {"type": "string"}},
        }),
        output_schema: json!({
            "type": "object",
            "properties": {
                "Answer": {"type": "string", "metrics": ["Correctness"]},
            },
        }),
        parameters: VersionParameters::Completion {
            prompt: "You are a calculus tutor.".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
        },
        test_set: (0..tests)
            .map(|i| TestCase::new(json!({"Question": format!("q-{i}")})))
            .collect(),
    }
}

#[tokio::test]
async fn create_branch_evaluate_persist() {
    let orchestrator = grader(88.0, "fine");
    let store = MemoryStore::new();

    // Create and persist.
    let function = orchestrator.create_function(definition(3)).unwrap();
    let root = function.version_tree.root().clone();
    let mut aggregate = OwnerAggregate::new("alice");
    aggregate.insert_function(function).unwrap();
    store.save("alice", &aggregate, None).unwrap();

    // Load, branch, evaluate with the default worker pool of three, save.
    let mut loaded = store.load("alice").unwrap().unwrap();
    let function = loaded.aggregate.function_by_name_mut("calculus-qa").unwrap();
    let branch = orchestrator
        .branch_version(
            function,
            &root,
            VersionParameters::Completion {
                prompt: "Answer tersely.".into(),
                model: "gpt-4o".into(),
                temperature: 0.0,
            },
        )
        .unwrap();

    let summary = orchestrator
        .evaluate_version(function, &branch, &invoker())
        .await
        .unwrap();
    assert_eq!(summary.records.len(), 3);
    assert!(summary.failures.is_empty());

    store
        .save("alice", &loaded.aggregate, Some(loaded.revision))
        .unwrap();

    // Exactly one record per test landed on the branch; the root is
    // untouched. The records survive a store round trip.
    let reloaded = store.load("alice").unwrap().unwrap();
    let function = reloaded.aggregate.function_by_name("calculus-qa").unwrap();
    let branch_node = function.version_tree.get(&branch).unwrap();
    assert_eq!(branch_node.evals.len(), 3);
    for (record, case) in branch_node.evals.iter().zip(function.test_set.iter()) {
        assert_eq!(record.input, case.input);
        assert_eq!(record.scores["Correctness"], 88.0);
        assert_eq!(record.output, json!({"Answer": "stub"}));
    }
    assert!(function.version_tree.get(&root).unwrap().evals.is_empty());
}

#[tokio::test]
async fn grading_scenario_single_metric() {
    // Schema {Answer: string, metrics: [Correctness]}, task "derivative of
    // sin(x)", output {Answer: "cos(x)"} → one record with score 95 and the
    // grader's reasoning.
    let orchestrator = grader(95.0, "correct");
    let mut function = orchestrator.create_function(definition(0)).unwrap();
    let root = function.version_tree.root().clone();

    let record = orchestrator
        .evaluate_call(
            &mut function,
            &root,
            json!({"Question": "What is the derivative of sin(x)?"}),
            json!({"Answer": "cos(x)"}),
        )
        .await
        .unwrap();

    assert_eq!(record.scores["Correctness"], 95.0);
    assert_eq!(record.reasoning, "correct");
    assert_eq!(record.output, json!({"Answer": "cos(x)"}));
    assert_eq!(function.version_tree.get(&root).unwrap().evals.len(), 1);
}

#[tokio::test]
async fn deployment_pointer_survives_persistence() {
    let orchestrator = grader(50.0, "ok");
    let store = MemoryStore::new();

    let mut function = orchestrator.create_function(definition(1)).unwrap();
    let root = function.version_tree.root().clone();
    let branch = orchestrator
        .branch_version(
            &mut function,
            &root,
            VersionParameters::Completion {
                prompt: "v2".into(),
                model: "gpt-4o".into(),
                temperature: 0.1,
            },
        )
        .unwrap();
    function.deploy(&branch).unwrap();

    let mut aggregate = OwnerAggregate::new("alice");
    aggregate.insert_function(function).unwrap();
    store.save("alice", &aggregate, None).unwrap();

    let reloaded = store.load("alice").unwrap().unwrap();
    let function = reloaded.aggregate.function_by_name("calculus-qa").unwrap();
    assert_eq!(function.current_version, branch);
    assert!(function.deployed().is_some());
}

#[tokio::test]
async fn concurrent_updates_are_detected_not_lost() {
    let orchestrator = grader(50.0, "ok");
    let store = MemoryStore::new();

    let function = orchestrator.create_function(definition(1)).unwrap();
    let mut aggregate = OwnerAggregate::new("alice");
    aggregate.insert_function(function).unwrap();
    store.save("alice", &aggregate, None).unwrap();

    // Two cycles read the same revision and both mutate.
    let mut first = store.load("alice").unwrap().unwrap();
    let mut second = store.load("alice").unwrap().unwrap();

    let root = {
        let f = first.aggregate.function_by_name_mut("calculus-qa").unwrap();
        let root = f.version_tree.root().clone();
        orchestrator
            .branch_version(
                f,
                &root,
                VersionParameters::Completion {
                    prompt: "first".into(),
                    model: "gpt-4o-mini".into(),
                    temperature: 0.0,
                },
            )
            .unwrap();
        root
    };
    store
        .save("alice", &first.aggregate, Some(first.revision))
        .unwrap();

    {
        let f = second.aggregate.function_by_name_mut("calculus-qa").unwrap();
        orchestrator
            .branch_version(
                f,
                &root,
                VersionParameters::Completion {
                    prompt: "second".into(),
                    model: "gpt-4o-mini".into(),
                    temperature: 0.0,
                },
            )
            .unwrap();
    }
    let err = store
        .save("alice", &second.aggregate, Some(second.revision))
        .unwrap_err();
    assert!(err.is_retryable(), "the second write must conflict: {err}");
}
