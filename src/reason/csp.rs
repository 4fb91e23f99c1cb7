//! Constraint-satisfaction backend.
//!
//! Backtracking search with MRV variable selection (insertion order breaks
//! ties), insertion-order value selection, and forward checking over
//! binary constraints. Variable and value iteration are insertion-order
//! based throughout so the solution list is reproducible.

use std::collections::BTreeMap;
use std::time::Instant;

/// A candidate assignment, variable name → value.
pub type Assignment = BTreeMap<String, String>;

pub type PredicateFn = Box<dyn Fn(&Assignment) -> bool>;

pub struct CspVariable {
    pub name: String,
    pub domain: Vec<String>,
}

pub enum Constraint {
    /// Listed variables take pairwise distinct values.
    AllDifferent(Vec<String>),

    /// `(value(left), value(right))` must appear in the extension; used
    /// for KB-backed relational constraints materialized at build time.
    Allowed {
        left: String,
        right: String,
        pairs: Vec<(String, String)>,
    },

    /// Named variable pairs that must not share a value (KB conflict
    /// relations map each conflicting entity pair here).
    NoConflict { pairs: Vec<(String, String)> },

    /// Arbitrary test over its variables, evaluated once all are bound.
    Predicate { vars: Vec<String>, test: PredicateFn },

    Not(Box<Constraint>),
    All(Vec<Constraint>),
    Any(Vec<Constraint>),
}

impl Constraint {
    /// Variables this constraint mentions, in declaration order.
    pub fn vars(&self) -> Vec<&str> {
        match self {
            Constraint::AllDifferent(vars) => vars.iter().map(String::as_str).collect(),
            Constraint::Allowed { left, right, .. } => vec![left, right],
            Constraint::NoConflict { pairs } => {
                let mut out: Vec<&str> = Vec::new();
                for (a, b) in pairs {
                    if !out.contains(&a.as_str()) {
                        out.push(a);
                    }
                    if !out.contains(&b.as_str()) {
                        out.push(b);
                    }
                }
                out
            }
            Constraint::Predicate { vars, .. } => vars.iter().map(String::as_str).collect(),
            Constraint::Not(inner) => inner.vars(),
            Constraint::All(inner) | Constraint::Any(inner) => {
                let mut out: Vec<&str> = Vec::new();
                for c in inner {
                    for v in c.vars() {
                        if !out.contains(&v) {
                            out.push(v);
                        }
                    }
                }
                out
            }
        }
    }

    fn is_determined(&self, assignment: &Assignment) -> bool {
        self.vars().iter().all(|v| assignment.contains_key(*v))
    }

    /// Full evaluation; only meaningful once determined.
    fn eval(&self, assignment: &Assignment) -> bool {
        match self {
            Constraint::AllDifferent(vars) => {
                for (i, a) in vars.iter().enumerate() {
                    for b in vars.iter().skip(i + 1) {
                        if assignment.get(a) == assignment.get(b) {
                            return false;
                        }
                    }
                }
                true
            }
            Constraint::Allowed { left, right, pairs } => {
                match (assignment.get(left), assignment.get(right)) {
                    (Some(l), Some(r)) => {
                        pairs.iter().any(|(a, b)| a == l && b == r)
                    }
                    _ => true,
                }
            }
            Constraint::NoConflict { pairs } => pairs.iter().all(|(a, b)| {
                match (assignment.get(a), assignment.get(b)) {
                    (Some(va), Some(vb)) => va != vb,
                    _ => true,
                }
            }),
            Constraint::Predicate { test, .. } => test(assignment),
            Constraint::Not(inner) => !inner.eval(assignment),
            Constraint::All(inner) => inner.iter().all(|c| c.eval(assignment)),
            Constraint::Any(inner) => inner.iter().any(|c| c.eval(assignment)),
        }
    }

    /// True unless the partial assignment already rules the constraint
    /// out. Undetermined negations and disjunctions stay optimistic.
    fn consistent(&self, assignment: &Assignment) -> bool {
        match self {
            Constraint::AllDifferent(vars) => {
                for (i, a) in vars.iter().enumerate() {
                    for b in vars.iter().skip(i + 1) {
                        if let (Some(va), Some(vb)) = (assignment.get(a), assignment.get(b)) {
                            if va == vb {
                                return false;
                            }
                        }
                    }
                }
                true
            }
            Constraint::Allowed { .. } => self.eval(assignment),
            Constraint::NoConflict { .. } => self.eval(assignment),
            Constraint::Predicate { .. } => {
                if self.is_determined(assignment) {
                    self.eval(assignment)
                } else {
                    true
                }
            }
            Constraint::Not(inner) => {
                if inner.is_determined(assignment) {
                    !inner.eval(assignment)
                } else {
                    true
                }
            }
            Constraint::All(inner) => inner.iter().all(|c| c.consistent(assignment)),
            Constraint::Any(inner) => {
                if self.is_determined(assignment) {
                    self.eval(assignment)
                } else {
                    true
                }
            }
        }
    }
}

pub struct CspProblem {
    pub variables: Vec<CspVariable>,
    pub constraints: Vec<Constraint>,
    pub max_solutions: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CspStats {
    pub nodes: u64,
    pub backtracks: u64,
    pub pruned: u64,
    pub time_ms: u64,
}

#[derive(Debug, Default)]
pub struct CspResult {
    pub success: bool,
    pub solutions: Vec<Assignment>,
    pub stats: CspStats,
    pub timed_out: bool,
}

pub fn solve(problem: &CspProblem) -> CspResult {
    let start = Instant::now();
    let mut search = Search {
        problem,
        start,
        assignment: Assignment::new(),
        domains: problem
            .variables
            .iter()
            .map(|v| v.domain.clone())
            .collect(),
        solutions: Vec::new(),
        stats: CspStats::default(),
        timed_out: false,
    };
    search.backtrack();
    let mut result = CspResult {
        success: !search.solutions.is_empty(),
        solutions: search.solutions,
        stats: search.stats,
        timed_out: search.timed_out,
    };
    result.stats.time_ms = start.elapsed().as_millis() as u64;
    result
}

struct Search<'a> {
    problem: &'a CspProblem,
    start: Instant,
    assignment: Assignment,
    domains: Vec<Vec<String>>,
    solutions: Vec<Assignment>,
    stats: CspStats,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn backtrack(&mut self) {
        if self.timed_out || self.solutions.len() >= self.problem.max_solutions {
            return;
        }
        if self.start.elapsed().as_millis() as u64 > self.problem.timeout_ms {
            self.timed_out = true;
            return;
        }

        let Some(var_index) = self.select_variable() else {
            // Complete assignment; every constraint is determined now.
            if self
                .problem
                .constraints
                .iter()
                .all(|c| c.eval(&self.assignment))
            {
                self.solutions.push(self.assignment.clone());
            }
            return;
        };
        let var_name = self.problem.variables[var_index].name.clone();

        let values = self.domains[var_index].clone();
        for value in values {
            self.stats.nodes += 1;
            self.assignment.insert(var_name.clone(), value.clone());

            if !self.consistent() {
                self.assignment.remove(&var_name);
                self.stats.backtracks += 1;
                continue;
            }

            // Forward checking: prune neighbor domains against this
            // assignment; an emptied domain forces a backtrack here.
            let saved = self.domains.clone();
            if self.forward_check(var_index) {
                self.backtrack();
            } else {
                self.stats.backtracks += 1;
            }
            self.domains = saved;
            self.assignment.remove(&var_name);

            if self.timed_out || self.solutions.len() >= self.problem.max_solutions {
                return;
            }
        }
    }

    /// MRV: smallest live domain among unassigned variables; insertion
    /// order breaks ties.
    fn select_variable(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (i, variable) in self.problem.variables.iter().enumerate() {
            if self.assignment.contains_key(&variable.name) {
                continue;
            }
            let size = self.domains[i].len();
            match best {
                Some((_, best_size)) if best_size <= size => {}
                _ => best = Some((i, size)),
            }
        }
        best.map(|(i, _)| i)
    }

    fn consistent(&self) -> bool {
        self.problem
            .constraints
            .iter()
            .all(|c| c.consistent(&self.assignment))
    }

    /// Remove values from unassigned neighbors that would violate some
    /// constraint given the current assignment. False when a domain dies.
    fn forward_check(&mut self, assigned_index: usize) -> bool {
        let assigned_name = &self.problem.variables[assigned_index].name;
        let neighbor_indices: Vec<usize> = self
            .problem
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                !self.assignment.contains_key(&v.name)
                    && self.problem.constraints.iter().any(|c| {
                        let vars = c.vars();
                        vars.contains(&v.name.as_str())
                            && vars.contains(&assigned_name.as_str())
                    })
            })
            .map(|(i, _)| i)
            .collect();

        for neighbor in neighbor_indices {
            let neighbor_name = self.problem.variables[neighbor].name.clone();
            let mut kept = Vec::with_capacity(self.domains[neighbor].len());
            for value in &self.domains[neighbor] {
                self.assignment
                    .insert(neighbor_name.clone(), value.clone());
                let ok = self.consistent();
                self.assignment.remove(&neighbor_name);
                if ok {
                    kept.push(value.clone());
                } else {
                    self.stats.pruned += 1;
                }
            }
            if kept.is_empty() {
                return false;
            }
            self.domains[neighbor] = kept;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, domain: &[&str]) -> CspVariable {
        CspVariable {
            name: name.into(),
            domain: domain.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn problem(variables: Vec<CspVariable>, constraints: Vec<Constraint>) -> CspProblem {
        CspProblem {
            variables,
            constraints,
            max_solutions: 100,
            timeout_ms: 10_000,
        }
    }

    #[test]
    fn no_conflict_seating_enumerates_both_arrangements() {
        let p = problem(
            vec![var("Alice", &["T1", "T2"]), var("Bob", &["T1", "T2"])],
            vec![Constraint::NoConflict {
                pairs: vec![("Alice".into(), "Bob".into())],
            }],
        );
        let result = solve(&p);
        assert!(result.success);
        assert_eq!(result.solutions.len(), 2);
        assert_eq!(result.solutions[0]["Alice"], "T1");
        assert_eq!(result.solutions[0]["Bob"], "T2");
        assert_eq!(result.solutions[1]["Alice"], "T2");
        assert_eq!(result.solutions[1]["Bob"], "T1");
    }

    #[test]
    fn unsat_reports_backtracks() {
        let p = problem(
            vec![var("A", &["x"]), var("B", &["x"])],
            vec![Constraint::AllDifferent(vec!["A".into(), "B".into()])],
        );
        let result = solve(&p);
        assert!(!result.success);
        assert!(result.solutions.is_empty());
        assert!(result.stats.backtracks > 0);
    }

    #[test]
    fn all_different_three_queens_of_colors() {
        let p = problem(
            vec![
                var("A", &["red", "green", "blue"]),
                var("B", &["red", "green", "blue"]),
                var("C", &["red", "green", "blue"]),
            ],
            vec![Constraint::AllDifferent(vec![
                "A".into(),
                "B".into(),
                "C".into(),
            ])],
        );
        let result = solve(&p);
        assert_eq!(result.solutions.len(), 6);
    }

    #[test]
    fn allowed_extension_restricts_pairs() {
        let p = problem(
            vec![var("X", &["a", "b"]), var("Y", &["a", "b"])],
            vec![Constraint::Allowed {
                left: "X".into(),
                right: "Y".into(),
                pairs: vec![("a".into(), "b".into())],
            }],
        );
        let result = solve(&p);
        assert_eq!(result.solutions.len(), 1);
        assert_eq!(result.solutions[0]["X"], "a");
        assert_eq!(result.solutions[0]["Y"], "b");
    }

    #[test]
    fn predicate_constraint_evaluates_when_bound() {
        let p = problem(
            vec![var("N", &["1", "2", "3"])],
            vec![Constraint::Predicate {
                vars: vec!["N".into()],
                test: Box::new(|a| a["N"] != "2"),
            }],
        );
        let result = solve(&p);
        assert_eq!(result.solutions.len(), 2);
    }

    #[test]
    fn negation_inverts_a_determined_constraint() {
        let p = problem(
            vec![var("A", &["x", "y"]), var("B", &["x", "y"])],
            vec![Constraint::Not(Box::new(Constraint::AllDifferent(vec![
                "A".into(),
                "B".into(),
            ])))],
        );
        let result = solve(&p);
        // Not(all-different) == must be equal.
        assert_eq!(result.solutions.len(), 2);
        for s in &result.solutions {
            assert_eq!(s["A"], s["B"]);
        }
    }

    #[test]
    fn disjunction_accepts_either_branch() {
        let p = problem(
            vec![var("A", &["x", "y"])],
            vec![Constraint::Any(vec![
                Constraint::Predicate {
                    vars: vec!["A".into()],
                    test: Box::new(|a| a["A"] == "x"),
                },
                Constraint::Predicate {
                    vars: vec!["A".into()],
                    test: Box::new(|a| a["A"] == "y"),
                },
            ])],
        );
        let result = solve(&p);
        assert_eq!(result.solutions.len(), 2);
    }

    #[test]
    fn max_solutions_caps_enumeration() {
        let mut p = problem(
            vec![var("A", &["1", "2", "3", "4"]), var("B", &["1", "2", "3", "4"])],
            vec![],
        );
        p.max_solutions = 3;
        let result = solve(&p);
        assert_eq!(result.solutions.len(), 3);
    }

    #[test]
    fn mrv_prefers_smaller_domain() {
        // B has the smaller domain; MRV must branch on it first, which
        // shows up as B varying slowest... i.e. solutions sorted by B.
        let p = problem(
            vec![var("A", &["1", "2", "3"]), var("B", &["x", "y"])],
            vec![],
        );
        let result = solve(&p);
        assert_eq!(result.solutions.len(), 6);
        assert_eq!(result.solutions[0]["B"], "x");
        assert_eq!(result.solutions[1]["B"], "x");
        assert_eq!(result.solutions[2]["B"], "x");
        assert_eq!(result.solutions[3]["B"], "y");
    }

    #[test]
    fn solver_is_deterministic() {
        let build = || {
            problem(
                vec![
                    var("A", &["1", "2", "3"]),
                    var("B", &["1", "2", "3"]),
                    var("C", &["1", "2", "3"]),
                ],
                vec![Constraint::AllDifferent(vec![
                    "A".into(),
                    "B".into(),
                    "C".into(),
                ])],
            )
        };
        let r1 = solve(&build());
        let r2 = solve(&build());
        assert_eq!(r1.solutions, r2.solutions);
    }
}
