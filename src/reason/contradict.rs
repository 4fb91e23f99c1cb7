//! Theory-driven contradiction detection.
//!
//! Consulted for every tentative fact of a learn batch, against the
//! committed KB and the batch's earlier tentative facts together.
//! Constraints come from the semantic index: mutually-exclusive value
//! sets, operator pairs that cannot share arguments, and the derived
//! variants of both through declared transitivity and isA inheritance.

use std::collections::{HashSet, VecDeque};

use crate::error::{Contradiction, ContradictionReason};
use crate::expr::{Expr, ExprArg};
use crate::kb::{Fact, KnowledgeBase};
use crate::semantic::SemanticIndex;

/// Check one tentative assertion. `None` means no conflict.
pub fn check(
    kb: &KnowledgeBase,
    semantic: &SemanticIndex,
    local: &SemanticIndex,
    tentative: &[Fact],
    candidate: &Expr,
) -> Option<Contradiction> {
    let view = View {
        kb,
        semantic,
        local,
        tentative,
    };

    if let Some(found) = view.check_exclusive_values(candidate) {
        return Some(found);
    }
    if let Some(found) = view.check_contradicting_operators(candidate) {
        return Some(found);
    }
    None
}

struct View<'a> {
    kb: &'a KnowledgeBase,
    semantic: &'a SemanticIndex,
    local: &'a SemanticIndex,
    tentative: &'a [Fact],
}

impl<'a> View<'a> {
    fn is_transitive(&self, op: &str) -> bool {
        self.semantic.is_transitive(op) || self.local.is_transitive(op)
    }

    fn is_inheritable(&self, op: &str) -> bool {
        self.semantic.is_inheritable(op) || self.local.is_inheritable(op)
    }

    /// Direct (subject, object) pairs for `op` across committed and
    /// tentative facts, each with its canonical rendering.
    fn edges(&self, op: &str) -> Vec<(String, String, String)> {
        let committed = self.kb.facts_with_operator(op);
        let pending = self.tentative.iter().filter(|f| f.operator == op);
        committed
            .chain(pending)
            .filter_map(|fact| match (fact.atom_name(0), fact.atom_name(1)) {
                (Some(s), Some(o)) if fact.arity() == 2 => {
                    Some((s.to_string(), o.to_string(), fact.signature()))
                }
                _ => None,
            })
            .collect()
    }

    /// Values held by `subject` under `op`: direct, plus closure-derived
    /// when transitive, plus inherited through isA when inheritable.
    fn held_values(&self, op: &str, subject: &str) -> Vec<HeldValue> {
        let edges = self.edges(op);
        let mut out: Vec<HeldValue> = Vec::new();

        for (s, o, sig) in &edges {
            if s == subject {
                out.push(HeldValue {
                    value: o.clone(),
                    existing: sig.clone(),
                    provenance: Provenance::Direct,
                });
            }
        }

        if self.is_transitive(op) {
            for target in reachable(&edges, subject) {
                if !out.iter().any(|h| h.value == target) {
                    out.push(HeldValue {
                        existing: format!("{} {} {}", op, subject, target),
                        value: target,
                        provenance: Provenance::Transitive,
                    });
                }
            }
        }

        if self.is_inheritable(op) {
            let isa_edges = self.edges("isA");
            for ancestor in reachable(&isa_edges, subject) {
                for (s, o, sig) in &edges {
                    if s == &ancestor && !out.iter().any(|h| &h.value == o) {
                        out.push(HeldValue {
                            value: o.clone(),
                            existing: sig.clone(),
                            provenance: Provenance::Inherited {
                                ancestor: ancestor.clone(),
                            },
                        });
                    }
                }
            }
        }

        out
    }

    /// `mutuallyExclusive(op, {V1, V2, …})`: a subject may hold at most
    /// one value from each declared set.
    fn check_exclusive_values(&self, candidate: &Expr) -> Option<Contradiction> {
        let (subject, value) = binary_atoms(candidate)?;
        let sets: Vec<_> = self
            .semantic
            .exclusive_sets(&candidate.op)
            .iter()
            .chain(self.local.exclusive_sets(&candidate.op))
            .filter(|set| set.contains(value))
            .collect();
        if sets.is_empty() {
            return None;
        }

        for held in self.held_values(&candidate.op, subject) {
            if held.value == value {
                continue;
            }
            for set in &sets {
                if set.contains(&held.value) {
                    let reason = match &held.provenance {
                        Provenance::Direct => ContradictionReason::MutuallyExclusive {
                            operator: candidate.op.clone(),
                            values: set.iter().cloned().collect(),
                        },
                        Provenance::Transitive => ContradictionReason::DerivedTransitive {
                            operator: candidate.op.clone(),
                        },
                        Provenance::Inherited { ancestor } => {
                            ContradictionReason::DerivedInherited {
                                property: held.value.clone(),
                                ancestor: ancestor.clone(),
                            }
                        }
                    };
                    return Some(Contradiction {
                        attempted: candidate.to_string(),
                        existing: held.existing,
                        reason,
                    });
                }
            }
        }
        None
    }

    /// `contradictsSameArgs(op1, op2)`: the same argument tuple may not
    /// hold under both operators, directly or through a transitive chain
    /// of the offending relation.
    fn check_contradicting_operators(&self, candidate: &Expr) -> Option<Contradiction> {
        let rendered_args: Vec<String> =
            candidate.args.iter().map(|a| a.to_string()).collect();

        let mut others: Vec<String> = self
            .semantic
            .contradicting_operators(&candidate.op)
            .map(str::to_string)
            .collect();
        for op in self.local.contradicting_operators(&candidate.op) {
            if !others.iter().any(|o| o == op) {
                others.push(op.to_string());
            }
        }

        for other in &others {
            let committed = self.kb.facts_with_operator(other);
            let pending = self.tentative.iter().filter(|f| f.operator == *other);
            for fact in committed.chain(pending) {
                let fact_args: Vec<String> = fact
                    .to_expr()
                    .args
                    .iter()
                    .map(|a| a.to_string())
                    .collect();
                if fact_args == rendered_args {
                    return Some(Contradiction {
                        attempted: candidate.to_string(),
                        existing: fact.signature(),
                        reason: ContradictionReason::ContradictsSameArgs {
                            operator: candidate.op.clone(),
                            other: other.clone(),
                        },
                    });
                }
            }

            // Derived: the contradicting relation reaches the same pair
            // through its declared transitivity.
            if self.is_transitive(other) {
                if let Some((subject, object)) = binary_atoms(candidate) {
                    let edges = self.edges(other);
                    if reachable(&edges, subject).contains(&object.to_string()) {
                        return Some(Contradiction {
                            attempted: candidate.to_string(),
                            existing: format!("{} {} {}", other, subject, object),
                            reason: ContradictionReason::DerivedTransitive {
                                operator: other.clone(),
                            },
                        });
                    }
                }
            }
        }
        None
    }
}

struct HeldValue {
    value: String,
    existing: String,
    provenance: Provenance,
}

enum Provenance {
    Direct,
    Transitive,
    Inherited { ancestor: String },
}

fn binary_atoms(expr: &Expr) -> Option<(&str, &str)> {
    if expr.args.len() != 2 {
        return None;
    }
    match (&expr.args[0], &expr.args[1]) {
        (ExprArg::Atom(a), ExprArg::Atom(b)) => Some((a, b)),
        _ => None,
    }
}

/// BFS closure over direct edges; cycle-safe, deterministic in edge order.
fn reachable(edges: &[(String, String, String)], from: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(from);
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(from);
    while let Some(node) = queue.pop_front() {
        for (s, o, _) in edges {
            if s == node && seen.insert(o.as_str()) {
                out.push(o.clone());
                queue.push_back(o);
            }
        }
    }
    out
}
