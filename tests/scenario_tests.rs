//! End-to-end scenarios over the public session API.

mod common;

use common::{learn_ok, session, session_with};
use sys2::{Method, StepKind};

// Scenario A: direct fact retrieval.
#[test]
fn direct_fact_retrieval() {
    let mut s = session();
    learn_ok(&mut s, "loves John Mary");
    let result = s.query("@q loves ?who Mary");
    assert!(result.success);
    assert_eq!(result.all_results.len(), 1);
    assert_eq!(result.all_results[0].bindings["who"], "John");
    assert!(result.all_results[0].confidence >= 0.6);
    s.close();
}

// Scenario B: transitive chain over isA.
#[test]
fn transitive_chain_over_isa() {
    let mut s = session();
    learn_ok(&mut s, "isA Rex Dog\nisA Dog Mammal\nisA Mammal Animal");
    let proof = s.prove("@g isA Rex Animal");
    assert!(proof.valid, "failure: {:?}", proof.failure);
    assert!(proof.confidence >= 0.9, "confidence {}", proof.confidence);
    let details: Vec<&str> = proof.steps.iter().map(|s| s.detail.as_str()).collect();
    assert_eq!(
        details,
        vec!["isA Rex Dog", "isA Dog Mammal", "isA Mammal Animal"]
    );
    assert!(proof
        .steps
        .iter()
        .all(|s| s.kind == StepKind::TransitiveLink));
}

// Scenario C: rule-based derivation.
#[test]
fn rule_based_derivation() {
    let mut s = session();
    learn_ok(
        &mut s,
        "isA Socrates Human\n@c isA ?x Human\n@k isA ?x Mortal\n@r Implies $c $k",
    );
    let proof = s.prove("@g isA Socrates Mortal");
    assert!(proof.valid, "failure: {:?}", proof.failure);
    assert_eq!(proof.method, Method::Rule);
    let rule_step = proof
        .steps
        .iter()
        .find(|s| s.kind == StepKind::RuleApplication)
        .expect("rule step present");
    assert!(rule_step.detail.contains("isA ?x Human"));
    assert!(rule_step
        .bindings
        .iter()
        .any(|(var, value)| var == "x" && value == "Socrates"));
}

// Scenario D: contradiction rejection with rollback.
#[test]
fn contradiction_rejection_rolls_back_whole_batch() {
    let mut s = session();
    learn_ok(&mut s, "hasState Door Open");

    let rejected = s.learn("locatedIn Door Kitchen\nhasState Door Closed");
    assert!(!rejected.success);
    let contradiction = rejected.rejected.expect("contradiction reported");
    assert_eq!(contradiction.attempted, "hasState Door Closed");
    assert_eq!(contradiction.existing, "hasState Door Open");

    let states = s.query("@q hasState Door ?s");
    assert_eq!(states.all_results.len(), 1);
    assert_eq!(states.all_results[0].bindings["s"], "Open");

    // The first statement of the rejected batch must not be present.
    let location = s.query("@q locatedIn Door ?where");
    assert!(!location.success);
    assert!(location.all_results.is_empty());
    assert!(location.errors.is_empty());
}

// Scenario E: CSP wedding seating.
#[test]
fn csp_wedding_seating() {
    let mut s = session();
    learn_ok(
        &mut s,
        "isA Alice Guest\nisA Bob Guest\nisA T1 Table\nisA T2 Table\n\
         conflictsWith Alice Bob\nconflictsWith Bob Alice",
    );
    let result = s
        .create_csp_solver()
        .variables_from_type("Guest")
        .domain_from_type("Table")
        .no_conflict("conflictsWith")
        .solve();
    assert!(result.success);
    assert_eq!(result.solutions.len(), 2);
    assert_eq!(result.solutions[0]["Alice"], "T1");
    assert_eq!(result.solutions[0]["Bob"], "T2");
    assert_eq!(result.solutions[1]["Alice"], "T2");
    assert_eq!(result.solutions[1]["Bob"], "T1");
}

// Scenario F: holographic with fallback.
#[test]
fn holographic_query_with_fallback() {
    let mut s = session_with("dense-binary", "holographic");
    learn_ok(&mut s, "isA Rex Dog");
    let result = s.query("@q isA Rex ?t");
    assert!(result.success);
    let answer = &result.all_results[0];
    assert_eq!(answer.bindings["t"], "Dog");
    assert!(
        answer.method == Method::HdcValidated || answer.method == Method::SymbolicFallback,
        "unexpected method {:?}",
        answer.method
    );
}

// Scenario F on the exact substrate decodes without fallback.
#[test]
fn holographic_query_exact_decodes() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "loves John Mary");
    let result = s.query("@q loves ?who Mary");
    assert!(result.success);
    assert_eq!(result.all_results[0].bindings["who"], "John");
    assert_eq!(result.all_results[0].method, Method::HdcValidated);
    let stats = s.stats();
    assert!(stats.hdc.hdc_unbind_attempts >= 1);
    assert!(stats.hdc.hdc_unbind_successes >= 1);
    assert!(stats.hdc.hdc_validation_successes >= 1);
}
