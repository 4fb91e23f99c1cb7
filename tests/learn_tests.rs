//! Learn semantics: persistence rules, transactionality, idempotence,
//! boundaries, exports, graphs, and canonicalization.

mod common;

use common::{hole_values, learn_ok, session};

#[test]
fn learn_is_idempotent_on_fact_sets() {
    let mut s = session();
    learn_ok(&mut s, "loves John Mary\nisA John Person");
    let before = s.kb().len();
    let again = s.learn("loves John Mary\nisA John Person");
    assert!(again.success);
    assert_eq!(again.facts_added, 0);
    assert_eq!(s.kb().len(), before);
}

#[test]
fn scoped_statement_does_not_enter_kb() {
    let mut s = session();
    let before = s.kb().len();
    learn_ok(&mut s, "@tmp loves John Mary");
    assert_eq!(s.kb().len(), before);
    assert!(!s.query("@q loves ?who Mary").success);
}

#[test]
fn exported_statement_enters_scope_and_kb() {
    let mut s = session();
    learn_ok(&mut s, "@d:doorFact hasState Door Open");
    assert!(s.kb().anchor("doorFact").is_some());
    assert_eq!(hole_values(&mut s, "@q hasState Door ?s", "s"), vec!["Open"]);
}

#[test]
fn exported_fact_becomes_a_referable_atom_with_higher_level() {
    let mut s = session();
    learn_ok(&mut s, "@d:doorOpen hasState Door Open");
    learn_ok(&mut s, "observed Alice doorOpen");
    let anchor_id = s.kb().anchor("doorOpen").unwrap();
    let anchored = s.kb().fact(anchor_id).unwrap();
    assert_eq!(anchored.level, 1);
    let dependent = s
        .kb()
        .facts_with_operator("observed")
        .next()
        .expect("dependent fact");
    assert_eq!(dependent.level, 2);
}

#[test]
fn undefined_scope_variable_is_an_error() {
    let mut s = session();
    let result = s.learn("Implies $ghost $ghost");
    assert!(!result.success);
    assert!(result.errors[0].contains("ghost"));
}

#[test]
fn arity_at_maximum_succeeds_and_above_fails() {
    let mut s = session();
    let max_args: Vec<String> = (0..20).map(|i| format!("a{}", i)).collect();
    let ok = format!("wideRelation {}", max_args.join(" "));
    learn_ok(&mut s, &ok);

    let over_args: Vec<String> = (0..21).map(|i| format!("b{}", i)).collect();
    let over = format!("widerRelation {}", over_args.join(" "));
    let result = s.learn(&over);
    assert!(!result.success);
    assert!(result.errors[0].contains("21"));
}

#[test]
fn zero_arity_statement_round_trips() {
    let mut s = session();
    learn_ok(&mut s, "worldExists");
    let result = s.query("worldExists");
    assert!(result.success);
    assert_eq!(result.all_results.len(), 1);
    assert!(result.all_results[0].bindings.is_empty());
}

#[test]
fn parse_error_short_circuits_the_batch() {
    let mut s = session();
    let before = s.kb().len();
    let result = s.learn("isA Rex Dog\nloves % broken");
    assert!(!result.success);
    assert!(!result.errors.is_empty());
    assert_eq!(s.kb().len(), before);
}

#[test]
fn vocabulary_is_retained_across_a_rejected_batch() {
    let mut s = session();
    learn_ok(&mut s, "hasState Door Open");
    let result = s.learn("locatedIn Door AtticRoom\nhasState Door Closed");
    assert!(result.rejected.is_some());
    // The atom interned during the rejected attempt stays known.
    assert!(s.vocabulary().lookup("AtticRoom").is_some());
    // But no fact mentions it.
    assert_eq!(s.kb().facts_with_component("AtticRoom").count(), 0);
}

#[test]
fn graph_declaration_and_invocation() {
    let mut s = session();
    learn_ok(
        &mut s,
        "@Couple graph a b\n  @l loves $a $b\n  return $l\nend\nCouple Alice Bob",
    );
    assert_eq!(hole_values(&mut s, "@q loves ?who Bob", "who"), vec!["Alice"]);
}

#[test]
fn graph_alias_invokes_the_same_body() {
    let mut s = session();
    learn_ok(
        &mut s,
        "@Couple:pairUp graph a b\n  @l loves $a $b\n  return $l\nend\npairUp Carol Dan",
    );
    assert_eq!(hole_values(&mut s, "@q loves ?who Dan", "who"), vec!["Carol"]);
}

#[test]
fn graph_with_wrong_arity_is_rejected() {
    let mut s = session();
    learn_ok(
        &mut s,
        "@Couple graph a b\n  @l loves $a $b\n  return $l\nend",
    );
    let result = s.learn("Couple Alice");
    assert!(!result.success);
    assert!(result.errors[0].contains("Couple"));
}

#[test]
fn graph_parameters_scope_to_the_body() {
    let mut s = session();
    learn_ok(
        &mut s,
        "@Chain graph x y z\n  isA $x $y\n  isA $y $z\n  @last isA $x $z\n  return $last\nend\n\
         Chain Pup Dog Animal",
    );
    // Body statements emitted facts; the returned expr did too.
    assert!(s.query("@g isA Pup Dog").success);
    assert!(s.query("@g isA Dog Animal").success);
    assert!(s.query("@g isA Pup Animal").success);
}

#[test]
fn canonical_rewrite_applies_within_the_declaring_batch() {
    let mut s = session();
    learn_ok(&mut s, "Canonical loves adores\nadores Bob Sue");
    assert_eq!(hole_values(&mut s, "@q loves ?who Sue", "who"), vec!["Bob"]);
    // The surface alias also canonicalizes at query time.
    assert_eq!(hole_values(&mut s, "@q adores ?who Sue", "who"), vec!["Bob"]);
}

#[test]
fn canonical_rewrite_is_recorded_as_metadata_fact() {
    let mut s = session();
    learn_ok(&mut s, "Canonical loves adores\nadores Bob Sue");
    let recorded: Vec<String> = s
        .kb()
        .facts_with_operator("__CANONICAL_REWRITE__")
        .map(|f| f.signature())
        .collect();
    assert_eq!(recorded, vec!["__CANONICAL_REWRITE__ adores loves"]);
}

#[test]
fn symmetric_relation_emits_its_mirror() {
    let mut s = session();
    learn_ok(&mut s, "conflictsWith Alice Bob");
    assert!(s.query("@g conflictsWith Bob Alice").success);
}

#[test]
fn theory_block_scopes_new_atom_material() {
    let mut s = session();
    learn_ok(&mut s, "@Folklore theory\nisA Banshee Spirit\nend");
    assert!(s.query("@g isA Banshee Spirit").success);
}

#[test]
fn export_directive_persists_a_scope_entry() {
    let mut s = session();
    learn_ok(&mut s, "@pair loves Ann Ben\n@_ Export $pair");
    assert!(s.query("@g loves Ann Ben").success);
    assert!(s.kb().anchor("pair").is_some());
}

#[test]
fn close_refuses_further_operations() {
    let mut s = session();
    s.close();
    assert!(s.is_closed());
    let result = s.learn("isA A B");
    assert!(!result.success);
    assert!(result.errors[0].contains("closed"));
    assert!(!s.query("@q isA ?x B").success);
}
