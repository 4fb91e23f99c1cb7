//! Symbolic-priority reasoning engine.
//!
//! One `solve` core serves both queries (goals with holes) and proofs
//! (ground goals): direct index match, then declared-transitive closure,
//! then property inheritance, then backward rule chaining. Results carry
//! ordered derivation steps and a confidence that decays per link.
//!
//! Determinism: facts iterate in id order, rules in insertion order,
//! bindings live in `BTreeMap`s, and solutions deduplicate by canonical
//! argument tuple before a stable sort on confidence.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::Warning;
use crate::expr::{Expr, ExprArg};
use crate::kb::KnowledgeBase;
use crate::semantic::SemanticIndex;

use super::unify::{apply_bindings, freshen, unify_exprs, Bindings};
use super::{Method, ProofStep, StepKind, CONFIDENCE_DECAY};

/// An internal derivation result.
#[derive(Debug, Clone)]
pub struct Solution {
    pub bindings: Bindings,
    pub confidence: f64,
    pub steps: Vec<ProofStep>,
    pub method: Method,
}

/// A surfaced query answer: hole name → rendered value.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub bindings: BTreeMap<String, String>,
    pub confidence: f64,
    pub method: Method,
}

#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub answers: Vec<Answer>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug)]
pub struct ProveOutcome {
    pub valid: bool,
    pub confidence: f64,
    pub steps: Vec<ProofStep>,
    pub method: Method,
    pub warnings: Vec<Warning>,
    /// On failure: the last rule attempted and the premise that failed.
    pub failure: Option<String>,
}

pub struct SymbolicEngine<'a> {
    kb: &'a KnowledgeBase,
    semantic: &'a SemanticIndex,
    max_depth: usize,
}

impl<'a> SymbolicEngine<'a> {
    pub fn new(kb: &'a KnowledgeBase, semantic: &'a SemanticIndex, max_depth: usize) -> Self {
        Self {
            kb,
            semantic,
            max_depth,
        }
    }

    /// Multi-answer query: all successful hole bindings, deduplicated by
    /// canonical argument tuple, confidence-descending.
    pub fn query(&self, goal: &Expr) -> QueryOutcome {
        let holes = goal.vars();
        let mut warnings = Vec::new();
        let mut visited = HashSet::new();
        let mut failure = None;
        let solutions = self.solve(goal, self.max_depth, &mut visited, &mut warnings, &mut failure);

        let mut answers: Vec<Answer> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for sol in &solutions {
            let grounded = apply_bindings(goal, &sol.bindings);
            if !grounded.is_ground() {
                continue;
            }
            if !seen.insert(grounded.signature()) {
                continue;
            }
            let mut bindings = BTreeMap::new();
            for hole in &holes {
                match sol.bindings.get(hole) {
                    Some(value) => {
                        let resolved = resolve_render(value, &sol.bindings);
                        bindings.insert(hole.clone(), resolved);
                    }
                    None => break,
                }
            }
            if bindings.len() != holes.len() {
                continue;
            }
            answers.push(Answer {
                bindings,
                confidence: sol.confidence,
                method: sol.method,
            });
        }
        // Stable: equal confidences keep derivation (insertion) order.
        answers.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        dedup_warnings(&mut warnings);
        QueryOutcome { answers, warnings }
    }

    /// Ground-goal proof with an ordered step trace.
    pub fn prove(&self, goal: &Expr) -> ProveOutcome {
        let mut warnings = Vec::new();
        let mut visited = HashSet::new();
        let mut failure = None;
        let solutions = self.solve(goal, self.max_depth, &mut visited, &mut warnings, &mut failure);
        dedup_warnings(&mut warnings);
        // First-best on ties keeps the trace stable across runs.
        match solutions
            .into_iter()
            .reduce(|best, current| {
                if current.confidence > best.confidence {
                    current
                } else {
                    best
                }
            }) {
            Some(best) => ProveOutcome {
                valid: true,
                confidence: best.confidence,
                steps: best.steps,
                method: best.method,
                warnings,
                failure: None,
            },
            None => ProveOutcome {
                valid: false,
                confidence: 0.0,
                steps: Vec::new(),
                method: Method::Direct,
                warnings,
                failure,
            },
        }
    }

    /// The shared core: every way the KB can satisfy `goal`.
    pub(crate) fn solve(
        &self,
        goal: &Expr,
        depth: usize,
        visited: &mut HashSet<String>,
        warnings: &mut Vec<Warning>,
        failure: &mut Option<String>,
    ) -> Vec<Solution> {
        let mut solutions: Vec<Solution> = Vec::new();

        // 1. Direct match over the operator index.
        for fact in self.kb.facts_with_operator(&goal.op) {
            let fact_expr = fact.to_expr();
            let mut bindings = Bindings::new();
            if unify_exprs(goal, &fact_expr, &mut bindings) {
                solutions.push(Solution {
                    bindings,
                    confidence: 1.0,
                    steps: vec![fact_step(StepKind::Fact, &fact_expr)],
                    method: Method::Direct,
                });
            }
        }

        // 2. Transitive closure for declared-transitive binary operators.
        if self.semantic.is_transitive(&goal.op) && goal.args.len() == 2 {
            self.transitive_solutions(goal, &mut solutions);
        }

        // 3. Reflexivity.
        if self.semantic.is_reflexive(&goal.op) && goal.args.len() == 2 {
            if let (ExprArg::Atom(a), ExprArg::Atom(b)) = (&goal.args[0], &goal.args[1]) {
                if a == b {
                    solutions.push(Solution {
                        bindings: Bindings::new(),
                        confidence: 1.0,
                        steps: vec![fact_step(StepKind::Fact, goal)],
                        method: Method::Direct,
                    });
                }
            }
        }

        // 4. Property inheritance through isA chains.
        if self.semantic.is_inheritable(&goal.op) && goal.args.len() == 2 {
            self.inheritance_solutions(goal, &mut solutions);
        }

        // 5. Backward rule chaining.
        let rules = self.kb.rules_for_conclusion(&goal.op);
        if !rules.is_empty() {
            if depth == 0 {
                warnings.push(Warning::DepthExceeded {
                    limit: self.max_depth,
                });
            } else {
                self.rule_solutions(goal, depth, visited, warnings, failure, &mut solutions);
            }
        }

        // Deduplicate by the canonical tuple the bindings produce.
        let mut seen: HashSet<String> = HashSet::new();
        solutions.retain(|sol| {
            let key = format!(
                "{}|{}",
                apply_bindings(goal, &sol.bindings).signature(),
                sol.method
            );
            seen.insert(key)
        });
        solutions
    }

    /// Chain expansion over direct facts of one transitive operator.
    fn transitive_solutions(&self, goal: &Expr, solutions: &mut Vec<Solution>) {
        let edges = self.edges(&goal.op);
        match (&goal.args[0], &goal.args[1]) {
            (ExprArg::Atom(from), ExprArg::Atom(to)) => {
                if let Some(path) = self.chain_path(&edges, from, to) {
                    if path.len() >= 2 {
                        solutions.push(chain_solution(&goal.op, &path, Bindings::new()));
                    }
                }
            }
            (ExprArg::Atom(from), ExprArg::Var(hole)) => {
                for (target, path) in self.reachable(&edges, from) {
                    if path.len() >= 2 {
                        let mut bindings = Bindings::new();
                        bindings.insert(hole.clone(), ExprArg::Atom(target.clone()));
                        solutions.push(chain_solution(&goal.op, &path, bindings));
                    }
                }
            }
            (ExprArg::Var(hole), ExprArg::Atom(to)) => {
                let reversed = reverse_edges(&edges);
                for (source, path) in self.reachable(&reversed, to) {
                    if path.len() >= 2 {
                        let forward: Vec<(String, String)> = path
                            .iter()
                            .rev()
                            .map(|(a, b)| (b.clone(), a.clone()))
                            .collect();
                        let mut bindings = Bindings::new();
                        bindings.insert(hole.clone(), ExprArg::Atom(source.clone()));
                        solutions.push(chain_solution(&goal.op, &forward, bindings));
                    }
                }
            }
            (ExprArg::Var(from_hole), ExprArg::Var(to_hole)) => {
                // Enumerate derived pairs from every chain head, in the
                // deterministic order subjects first appear.
                let mut heads: Vec<&String> = Vec::new();
                for (s, _) in &edges {
                    if !heads.contains(&s) {
                        heads.push(s);
                    }
                }
                for head in heads {
                    for (target, path) in self.reachable(&edges, head) {
                        if path.len() >= 2 {
                            let mut bindings = Bindings::new();
                            bindings.insert(from_hole.clone(), ExprArg::Atom(head.clone()));
                            bindings.insert(to_hole.clone(), ExprArg::Atom(target.clone()));
                            solutions.push(chain_solution(&goal.op, &path, bindings));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Direct (subject, object) edges of a binary operator, id-ascending.
    fn edges(&self, op: &str) -> Vec<(String, String)> {
        self.kb
            .facts_with_operator(op)
            .filter_map(|fact| {
                match (fact.atom_name(0), fact.atom_name(1)) {
                    (Some(s), Some(o)) if fact.arity() == 2 => {
                        Some((s.to_string(), o.to_string()))
                    }
                    _ => None,
                }
            })
            .collect()
    }

    /// Shortest chain between two atoms; cycle-safe via a visited set.
    fn chain_path(
        &self,
        edges: &[(String, String)],
        from: &str,
        to: &str,
    ) -> Option<Vec<(String, String)>> {
        for (target, path) in self.reachable(edges, from) {
            if target == to {
                return Some(path);
            }
        }
        None
    }

    /// BFS over edges; returns (target, path-of-links) per reachable atom
    /// in breadth-first, edge-order-deterministic order.
    fn reachable(
        &self,
        edges: &[(String, String)],
        from: &str,
    ) -> Vec<(String, Vec<(String, String)>)> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for (s, o) in edges {
            adjacency.entry(s.as_str()).or_default().push(o.as_str());
        }
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(from);
        let mut queue: VecDeque<(&str, Vec<(String, String)>)> = VecDeque::new();
        queue.push_back((from, Vec::new()));
        while let Some((node, path)) = queue.pop_front() {
            if let Some(next) = adjacency.get(node) {
                for &target in next {
                    if seen.insert(target) {
                        let mut link_path = path.clone();
                        link_path.push((node.to_string(), target.to_string()));
                        out.push((target.to_string(), link_path.clone()));
                        queue.push_back((target, link_path));
                    }
                }
            }
        }
        out
    }

    /// Properties inherited from isA ancestors, only for operators marked
    /// inheritable; every answer is justified by an isA chain plus one
    /// direct fact on the ancestor.
    fn inheritance_solutions(&self, goal: &Expr, solutions: &mut Vec<Solution>) {
        let isa_edges = self.edges("isA");
        match (&goal.args[0], &goal.args[1]) {
            (ExprArg::Atom(subject), prop) => {
                for (ancestor, path) in self.reachable(&isa_edges, subject) {
                    for fact in self.kb.facts_with_operator(&goal.op) {
                        if fact.atom_name(0) != Some(ancestor.as_str()) {
                            continue;
                        }
                        let Some(value) = fact.atom_name(1) else {
                            continue;
                        };
                        let mut bindings = Bindings::new();
                        let matched = match prop {
                            ExprArg::Atom(wanted) => wanted == value,
                            ExprArg::Var(hole) => {
                                bindings
                                    .insert(hole.clone(), ExprArg::Atom(value.to_string()));
                                true
                            }
                            ExprArg::Nested(_) => false,
                        };
                        if matched {
                            solutions.push(inherited_solution(
                                &goal.op, &path, &fact.to_expr(), bindings,
                            ));
                        }
                    }
                }
            }
            (ExprArg::Var(subject_hole), prop) => {
                // Reverse direction: descendants inherit each declared fact.
                let reversed = reverse_edges(&isa_edges);
                for fact in self.kb.facts_with_operator(&goal.op) {
                    let (Some(owner), Some(value)) = (fact.atom_name(0), fact.atom_name(1))
                    else {
                        continue;
                    };
                    let prop_matches = match prop {
                        ExprArg::Atom(wanted) => wanted == value,
                        ExprArg::Var(_) => true,
                        ExprArg::Nested(_) => false,
                    };
                    if !prop_matches {
                        continue;
                    }
                    for (descendant, path) in self.reachable(&reversed, owner) {
                        let mut bindings = Bindings::new();
                        bindings.insert(
                            subject_hole.clone(),
                            ExprArg::Atom(descendant.clone()),
                        );
                        if let ExprArg::Var(prop_hole) = prop {
                            bindings.insert(
                                prop_hole.clone(),
                                ExprArg::Atom(value.to_string()),
                            );
                        }
                        let forward: Vec<(String, String)> = path
                            .iter()
                            .rev()
                            .map(|(a, b)| (b.clone(), a.clone()))
                            .collect();
                        solutions.push(inherited_solution(
                            &goal.op, &forward, &fact.to_expr(), bindings,
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    /// Backward chaining: unify rule conclusions, then prove premises
    /// left-to-right under the extended substitution.
    fn rule_solutions(
        &self,
        goal: &Expr,
        depth: usize,
        visited: &mut HashSet<String>,
        warnings: &mut Vec<Warning>,
        failure: &mut Option<String>,
        solutions: &mut Vec<Solution>,
    ) {
        for rule in self.kb.rules_for_conclusion(&goal.op) {
            let suffix = format!("#r{}d{}", rule.fact_id, depth);
            let conclusion = freshen(&rule.conclusion, &suffix);
            let premises: Vec<Expr> = rule
                .premises()
                .iter()
                .map(|p| freshen(p, &suffix))
                .collect();

            let mut bindings = Bindings::new();
            if !unify_exprs(goal, &conclusion, &mut bindings) {
                continue;
            }
            let visit_key = format!(
                "{}|{}",
                rule.fact_id,
                apply_bindings(goal, &bindings).signature()
            );
            if !visited.insert(visit_key) {
                continue;
            }

            let rule_text = format!(
                "Implies ({}) ({})",
                rule.condition, rule.conclusion
            );
            let mut partials: Vec<(Bindings, f64, Vec<ProofStep>)> =
                vec![(bindings, 1.0, Vec::new())];
            for premise in &premises {
                let mut advanced = Vec::new();
                for (partial, confidence, steps) in &partials {
                    let grounded = apply_bindings(premise, partial);
                    let subs =
                        self.solve(&grounded, depth - 1, visited, warnings, failure);
                    for sub in subs {
                        let mut merged = partial.clone();
                        for (k, v) in &sub.bindings {
                            merged.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                        let mut all_steps = steps.clone();
                        all_steps.push(ProofStep {
                            kind: StepKind::Premise,
                            detail: apply_bindings(&grounded, &sub.bindings).to_string(),
                            bindings: Vec::new(),
                        });
                        all_steps.extend(sub.steps);
                        advanced.push((merged, confidence.min(sub.confidence), all_steps));
                    }
                }
                if advanced.is_empty() {
                    *failure = Some(format!(
                        "rule '{}' failed at premise '{}'",
                        rule_text, premise
                    ));
                }
                partials = advanced;
                if partials.is_empty() {
                    break;
                }
            }

            for (final_bindings, confidence, premise_steps) in partials {
                let rendered: Vec<(String, String)> = rule
                    .vars
                    .iter()
                    .filter_map(|v| {
                        final_bindings
                            .get(&format!("{}{}", v, suffix))
                            .map(|arg| (v.clone(), resolve_render(arg, &final_bindings)))
                    })
                    .collect();
                let mut steps = vec![ProofStep {
                    kind: StepKind::RuleApplication,
                    detail: rule_text.clone(),
                    bindings: rendered,
                }];
                steps.extend(premise_steps);
                solutions.push(Solution {
                    bindings: final_bindings,
                    confidence: confidence * CONFIDENCE_DECAY,
                    steps,
                    method: Method::Rule,
                });
            }
        }
    }
}

fn fact_step(kind: StepKind, expr: &Expr) -> ProofStep {
    ProofStep {
        kind,
        detail: expr.to_string(),
        bindings: Vec::new(),
    }
}

fn chain_solution(op: &str, path: &[(String, String)], bindings: Bindings) -> Solution {
    let steps = path
        .iter()
        .map(|(a, b)| ProofStep {
            kind: StepKind::TransitiveLink,
            detail: format!("{} {} {}", op, a, b),
            bindings: Vec::new(),
        })
        .collect();
    Solution {
        bindings,
        confidence: CONFIDENCE_DECAY.powi(path.len() as i32 - 1),
        steps,
        method: Method::Transitive,
    }
}

fn inherited_solution(
    _op: &str,
    isa_path: &[(String, String)],
    ancestor_fact: &Expr,
    bindings: Bindings,
) -> Solution {
    let mut steps: Vec<ProofStep> = isa_path
        .iter()
        .map(|(a, b)| ProofStep {
            kind: StepKind::TransitiveLink,
            detail: format!("isA {} {}", a, b),
            bindings: Vec::new(),
        })
        .collect();
    steps.push(ProofStep {
        kind: StepKind::Inherited,
        detail: ancestor_fact.to_string(),
        bindings: Vec::new(),
    });
    Solution {
        bindings,
        confidence: CONFIDENCE_DECAY.powi(isa_path.len() as i32),
        steps,
        method: Method::Inheritance,
    }
}

fn reverse_edges(edges: &[(String, String)]) -> Vec<(String, String)> {
    edges.iter().map(|(a, b)| (b.clone(), a.clone())).collect()
}

/// Render a bound argument, chasing variable links.
fn resolve_render(arg: &ExprArg, bindings: &Bindings) -> String {
    match arg {
        ExprArg::Var(name) => match bindings.get(name) {
            Some(next) => resolve_render(next, bindings),
            None => format!("?{}", name),
        },
        ExprArg::Atom(name) => name.clone(),
        ExprArg::Nested(inner) => apply_bindings(inner, bindings).to_string(),
    }
}

fn dedup_warnings(warnings: &mut Vec<Warning>) {
    let mut seen = HashSet::new();
    warnings.retain(|w| seen.insert(format!("{:?}", w)));
}
