//! Holographic-priority engine: decode-then-validate, fallback labeling,
//! statistics counters, and the validation contract.

mod common;

use common::{learn_ok, session_with};
use sys2::Method;

#[test]
fn exact_substrate_decodes_and_validates() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "loves John Mary\nloves Bob Sue\nisA John Person");
    let result = s.query("@q loves ?who Mary");
    assert!(result.success);
    assert_eq!(result.all_results.len(), 1);
    assert_eq!(result.all_results[0].bindings["who"], "John");
    assert_eq!(result.all_results[0].method, Method::HdcValidated);
}

#[test]
fn validated_answers_pass_symbolic_prove() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "loves John Mary\nloves Bob Mary");
    let result = s.query("@q loves ?who Mary");
    let validated: Vec<_> = result
        .all_results
        .iter()
        .filter(|a| a.method == Method::HdcValidated)
        .cloned()
        .collect();
    assert!(!validated.is_empty());
    for answer in validated {
        let goal = format!("@g loves {} Mary", answer.bindings["who"]);
        assert!(s.prove(&goal).valid, "unvalidated candidate leaked: {}", goal);
    }
}

#[test]
fn fallback_answers_are_labeled() {
    let mut s = session_with("metric-affine", "holographic");
    learn_ok(&mut s, "isA Rex Dog");
    // Metric bundling washes out quickly; whichever path answers, the
    // binding is right and the label names the evidence source.
    let result = s.query("@q isA Rex ?t");
    assert!(result.success);
    let answer = &result.all_results[0];
    assert_eq!(answer.bindings["t"], "Dog");
    assert!(
        answer.method == Method::HdcValidated || answer.method == Method::SymbolicFallback
    );
}

#[test]
fn holographic_prove_validates_symbolically() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "isA Rex Dog\nisA Dog Mammal");
    let proof = s.prove("@g isA Rex Mammal");
    assert!(proof.valid);
    assert!(
        proof.method == Method::HdcValidated || proof.method == Method::SymbolicFallback
    );
    // A falsehood stays false no matter the substrate.
    assert!(!s.prove("@g isA Mammal Rex").valid);
}

#[test]
fn unbind_statistics_accumulate() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "loves John Mary");
    s.query("@q loves ?who Mary");
    s.query("@q loves John ?whom");
    let stats = s.stats();
    assert_eq!(stats.queries, 2);
    assert_eq!(stats.hdc.hdc_unbind_attempts, 2);
    assert!(stats.hdc.hdc_unbind_successes >= 1);
    assert!(stats.hdc.hdc_validation_attempts >= 1);
}

#[test]
fn fallback_counts_when_nothing_decodes() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "loves John Mary");
    // No fact mentions Venus; decoding yields nothing, symbolic fallback
    // runs and also finds nothing.
    let result = s.query("@q loves ?who Venus");
    assert!(!result.success);
    assert!(s.stats().hdc.symbolic_fallbacks >= 1);
}

#[test]
fn two_hole_queries_validate_combinations() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "loves John Mary\nloves Bob Sue");
    let result = s.query("@q loves ?who ?whom");
    assert!(result.success);
    for answer in &result.all_results {
        let goal = format!(
            "@g loves {} {}",
            answer.bindings["who"], answer.bindings["whom"]
        );
        assert!(s.prove(&goal).valid);
    }
    // The cross pairs (John, Sue) and (Bob, Mary) must not survive
    // validation.
    assert!(result.all_results.len() <= 2);
}

#[test]
fn ground_holographic_query_falls_back() {
    let mut s = session_with("exact", "holographic");
    learn_ok(&mut s, "loves John Mary");
    let result = s.query("loves John Mary");
    assert!(result.success);
    assert_eq!(result.all_results[0].method, Method::SymbolicFallback);
}
