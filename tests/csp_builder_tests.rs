//! KB-backed constraint solving through the session builder.

mod common;

use common::{learn_ok, session};
use sys2::Constraint;

#[test]
fn unsat_seating_reports_failure_with_backtracks() {
    let mut s = session();
    learn_ok(
        &mut s,
        "isA Alice Guest\nisA Bob Guest\nisA T1 Table\n\
         conflictsWith Alice Bob",
    );
    let result = s
        .create_csp_solver()
        .variables_from_type("Guest")
        .domain_from_type("Table")
        .no_conflict("conflictsWith")
        .solve();
    assert!(!result.success);
    assert!(result.solutions.is_empty());
    assert!(result.stats.backtracks > 0);
}

#[test]
fn all_different_assigns_distinct_tables() {
    let mut s = session();
    learn_ok(
        &mut s,
        "isA Alice Guest\nisA Bob Guest\nisA T1 Table\nisA T2 Table",
    );
    let result = s
        .create_csp_solver()
        .variables_from_type("Guest")
        .domain_from_type("Table")
        .all_different()
        .solve();
    assert!(result.success);
    assert_eq!(result.solutions.len(), 2);
    for solution in &result.solutions {
        assert_ne!(solution["Alice"], solution["Bob"]);
    }
}

#[test]
fn explicit_variables_and_predicates_compose() {
    let s = session();
    let result = s
        .create_csp_solver()
        .add_variable("X", &["1", "2", "3"])
        .add_variable("Y", &["1", "2", "3"])
        .constraint(Constraint::AllDifferent(vec!["X".into(), "Y".into()]))
        .predicate(
            &["X"],
            Box::new(|a| a["X"] != "2"),
        )
        .solve();
    assert!(result.success);
    assert!(result.solutions.iter().all(|s| s["X"] != "2"));
    assert!(result.solutions.iter().all(|s| s["X"] != s["Y"]));
}

#[test]
fn max_solutions_caps_the_enumeration() {
    let mut s = session();
    learn_ok(
        &mut s,
        "isA G1 Guest\nisA G2 Guest\nisA T1 Table\nisA T2 Table\nisA T3 Table",
    );
    let result = s
        .create_csp_solver()
        .variables_from_type("Guest")
        .domain_from_type("Table")
        .max_solutions(4)
        .solve();
    assert!(result.success);
    assert_eq!(result.solutions.len(), 4);
}

#[test]
fn solver_results_are_reproducible() {
    let mut s = session();
    learn_ok(
        &mut s,
        "isA A Guest\nisA B Guest\nisA C Guest\nisA T1 Table\nisA T2 Table\n\
         conflictsWith A B",
    );
    let run = |s: &sys2::Session| {
        s.create_csp_solver()
            .variables_from_type("Guest")
            .domain_from_type("Table")
            .no_conflict("conflictsWith")
            .solve()
            .solutions
    };
    assert_eq!(run(&s), run(&s));
}

#[test]
fn conflicts_outside_the_variable_set_are_ignored() {
    let mut s = session();
    learn_ok(
        &mut s,
        "isA Alice Guest\nisA T1 Table\nconflictsWith Alice Stranger",
    );
    let result = s
        .create_csp_solver()
        .variables_from_type("Guest")
        .domain_from_type("Table")
        .no_conflict("conflictsWith")
        .solve();
    assert!(result.success);
    assert_eq!(result.solutions.len(), 1);
}
