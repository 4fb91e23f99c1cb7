//! Forward chaining over the rule table.
//!
//! Invoked explicitly, never as part of learn. Rules fire in ascending
//! static conclusion-level order; each satisfying premise binding
//! materializes the conclusion as an ordinary fact unless its canonical
//! signature already exists. Runs to a fixed point or the iteration cap.
//! Derived facts still pass the contradiction gate — a conflicting
//! derivation is skipped, not committed.

use std::collections::HashSet;

use crate::compiler::encode_expr_vector;
use crate::expr::Expr;
use crate::hdc::Strategy;
use crate::kb::{Fact, FactArg, FactMeta, KnowledgeBase};
use crate::semantic::SemanticIndex;
use crate::vocab::Vocabulary;

use super::contradict;
use super::symbolic::SymbolicEngine;
use super::unify::{apply_bindings, Bindings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardChainResult {
    pub facts_added: usize,
    pub iterations: usize,
    /// True when the last iteration derived nothing new.
    pub fixpoint: bool,
}

pub fn forward_chain(
    strategy: &mut dyn Strategy,
    vocab: &mut Vocabulary,
    kb: &mut KnowledgeBase,
    semantic: &SemanticIndex,
    max_depth: usize,
    max_iterations: usize,
) -> ForwardChainResult {
    let mut total_added = 0usize;
    let mut iterations = 0usize;
    let mut fixpoint = false;

    while iterations < max_iterations {
        iterations += 1;
        let conclusions = derive_round(kb, semantic, max_depth);
        if conclusions.is_empty() {
            fixpoint = true;
            break;
        }

        let mut added_this_round = 0usize;
        for expr in conclusions {
            if kb.contains_signature(&expr.signature()) {
                continue;
            }
            if contradict::check(kb, semantic, &SemanticIndex::new(), &[], &expr).is_some() {
                tracing::debug!(fact = %expr, "forward chain skipped contradictory derivation");
                continue;
            }
            let vector = encode_expr_vector(strategy, vocab, &expr);
            let operator_atom = vocab.intern(strategy, &expr.op);
            let args: Vec<FactArg> = expr
                .args
                .iter()
                .map(|a| match a {
                    crate::expr::ExprArg::Atom(name) => FactArg::Atom {
                        id: vocab.intern(strategy, name),
                        name: name.clone(),
                    },
                    crate::expr::ExprArg::Var(name) => FactArg::Atom {
                        id: vocab.intern(strategy, &format!("?{}", name)),
                        name: format!("?{}", name),
                    },
                    crate::expr::ExprArg::Nested(inner) => FactArg::Expr((**inner).clone()),
                })
                .collect();
            let fact = Fact {
                id: kb.next_fact_id(),
                operator: expr.op.clone(),
                operator_atom,
                args,
                vector,
                level: kb.level_for(&expr),
                anchor: None,
                meta: FactMeta::default(),
            };
            kb.insert(fact);
            added_this_round += 1;
        }

        total_added += added_this_round;
        if added_this_round == 0 {
            fixpoint = true;
            break;
        }
    }

    ForwardChainResult {
        facts_added: total_added,
        iterations,
        fixpoint,
    }
}

/// One pass over all rules: every ground conclusion derivable from the
/// current KB, deduplicated, in rule-order then binding-order.
fn derive_round(kb: &KnowledgeBase, semantic: &SemanticIndex, max_depth: usize) -> Vec<Expr> {
    let engine = SymbolicEngine::new(kb, semantic, max_depth);

    // Ascending static conclusion level; stable within a level.
    let mut order: Vec<usize> = (0..kb.rules().len()).collect();
    order.sort_by_key(|&i| kb.rules()[i].conclusion_level);

    let mut out = Vec::new();
    let mut queued: HashSet<String> = HashSet::new();
    for index in order {
        let rule = &kb.rules()[index];
        let mut partials: Vec<Bindings> = vec![Bindings::new()];
        for premise in rule.premises() {
            let mut advanced = Vec::new();
            for partial in &partials {
                let grounded = apply_bindings(&premise, partial);
                let mut visited = HashSet::new();
                let mut warnings = Vec::new();
                let mut failure = None;
                for sub in
                    engine.solve(&grounded, max_depth, &mut visited, &mut warnings, &mut failure)
                {
                    let mut merged = partial.clone();
                    for (k, v) in &sub.bindings {
                        merged.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                    advanced.push(merged);
                }
            }
            partials = advanced;
            if partials.is_empty() {
                break;
            }
        }
        for bindings in partials {
            let conclusion = apply_bindings(&rule.conclusion, &bindings);
            if conclusion.is_ground() && queued.insert(conclusion.signature()) {
                out.push(conclusion);
            }
        }
    }
    out
}
