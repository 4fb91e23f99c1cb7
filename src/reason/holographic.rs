//! Holographic-priority reasoning engine.
//!
//! Queries unbind the KB bundle algebraically, decode candidate atoms, and
//! then hand every candidate to the symbolic engine for validation —
//! nothing is ever reported as valid on vector evidence alone. When
//! decoding produces nothing and fallback is enabled, the symbolic engine
//! answers and the result is labeled `symbolic_fallback`.

use std::collections::BTreeMap;

use crate::compiler::{encode_partial, EMPTY_BUNDLE};
use crate::error::Warning;
use crate::expr::{Expr, ExprArg};
use crate::hdc::{top_k_similar, DecodedCandidate, Strategy, Vector};
use crate::kb::KnowledgeBase;
use crate::semantic::SemanticIndex;
use crate::vocab::Vocabulary;

use super::symbolic::{Answer, ProveOutcome, QueryOutcome, SymbolicEngine};
use super::Method;

/// Counters read by the evaluation harness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HdcStats {
    pub hdc_unbind_attempts: u64,
    pub hdc_unbind_successes: u64,
    pub hdc_validation_attempts: u64,
    pub hdc_validation_successes: u64,
    pub symbolic_fallbacks: u64,
}

pub struct HolographicEngine<'a> {
    strategy: &'a dyn Strategy,
    vocab: &'a Vocabulary,
    kb: &'a KnowledgeBase,
    semantic: &'a SemanticIndex,
    top_k: usize,
    fallback: bool,
    max_depth: usize,
}

impl<'a> HolographicEngine<'a> {
    pub fn new(
        strategy: &'a dyn Strategy,
        vocab: &'a Vocabulary,
        kb: &'a KnowledgeBase,
        semantic: &'a SemanticIndex,
        top_k: usize,
        fallback: bool,
        max_depth: usize,
    ) -> Self {
        Self {
            strategy,
            vocab,
            kb,
            semantic,
            top_k,
            fallback,
            max_depth,
        }
    }

    /// HDC-first query with symbolic validation of every candidate.
    pub fn query(&self, goal: &Expr, stats: &mut HdcStats) -> QueryOutcome {
        let mut warnings = Vec::new();

        // Distinct holes with the first position each appears at (1-based).
        let mut holes: Vec<(String, usize)> = Vec::new();
        let mut knowns: Vec<(usize, Vector)> = Vec::new();
        let mut decodable = true;
        for (i, arg) in goal.args.iter().enumerate() {
            match arg {
                ExprArg::Var(name) => {
                    if !holes.iter().any(|(h, _)| h == name) {
                        holes.push((name.clone(), i + 1));
                    }
                }
                ExprArg::Atom(name) => match self.vocab.lookup(name) {
                    Some(id) => knowns.push((i + 1, self.vocab.vector(id).clone())),
                    None => decodable = false,
                },
                // Nested holes are beyond algebraic decoding.
                ExprArg::Nested(_) => decodable = false,
            }
        }
        let op_vec = self
            .vocab
            .lookup(&goal.op)
            .map(|id| self.vocab.vector(id).clone());

        let candidates_per_hole = if decodable && !holes.is_empty() {
            match op_vec {
                Some(op_vec) => {
                    Some(self.decode_holes(&op_vec, &knowns, &holes, stats, &mut warnings))
                }
                None => None,
            }
        } else {
            None
        };

        let mut answers: Vec<Answer> = Vec::new();
        if let Some(candidates_per_hole) = candidates_per_hole {
            let symbolic = SymbolicEngine::new(self.kb, self.semantic, self.max_depth);
            for combo in cartesian(&candidates_per_hole, self.top_k) {
                let mut bindings = BTreeMap::new();
                for ((hole, _), candidate) in holes.iter().zip(&combo) {
                    bindings.insert(hole.clone(), candidate.name.clone());
                }
                let grounded = substitute(goal, &bindings);
                stats.hdc_validation_attempts += 1;
                let proof = symbolic.prove(&grounded);
                if proof.valid {
                    stats.hdc_validation_successes += 1;
                    answers.push(Answer {
                        bindings: bindings.clone(),
                        confidence: proof.confidence,
                        method: Method::HdcValidated,
                    });
                }
            }
        }

        // Deduplicate validated combos, best-first.
        let mut seen = std::collections::HashSet::new();
        answers.retain(|a| seen.insert(format!("{:?}", a.bindings)));
        answers.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if answers.is_empty() && self.fallback {
            stats.symbolic_fallbacks += 1;
            let symbolic = SymbolicEngine::new(self.kb, self.semantic, self.max_depth);
            let mut outcome = symbolic.query(goal);
            for answer in &mut outcome.answers {
                answer.method = Method::SymbolicFallback;
            }
            outcome.warnings.extend(warnings);
            return outcome;
        }

        QueryOutcome { answers, warnings }
    }

    /// Similarity gate against the KB bundle, then symbolic validation.
    pub fn prove(&self, goal: &Expr, stats: &mut HdcStats) -> ProveOutcome {
        let symbolic = SymbolicEngine::new(self.kb, self.semantic, self.max_depth);

        let gate = self.goal_vector(goal).map(|goal_vec| {
            let bundle = self.kb_bundle(&mut Vec::new());
            self.strategy.similarity(&goal_vec, &bundle)
                > self.strategy.random_baseline()
        });

        match gate {
            Some(true) => {
                stats.hdc_validation_attempts += 1;
                let mut proof = symbolic.prove(goal);
                if proof.valid {
                    stats.hdc_validation_successes += 1;
                    proof.method = Method::HdcValidated;
                }
                proof
            }
            _ if self.fallback => {
                stats.symbolic_fallbacks += 1;
                let mut proof = symbolic.prove(goal);
                if proof.valid {
                    proof.method = Method::SymbolicFallback;
                }
                proof
            }
            _ => ProveOutcome {
                valid: false,
                confidence: 0.0,
                steps: Vec::new(),
                method: Method::SymbolicFallback,
                warnings: Vec::new(),
                failure: Some("below similarity gate and fallback disabled".to_string()),
            },
        }
    }

    /// Unbind per hole and rank candidates; empty lists mean the decoder
    /// found nothing above threshold — the engine never fabricates.
    fn decode_holes(
        &self,
        op_vec: &Vector,
        knowns: &[(usize, Vector)],
        holes: &[(String, usize)],
        stats: &mut HdcStats,
        warnings: &mut Vec<Warning>,
    ) -> Vec<Vec<DecodedCandidate>> {
        let bundle = self.kb_bundle(warnings);
        let empty = self.empty_bundle_vector();
        let partial = encode_partial(
            self.strategy,
            op_vec,
            knowns,
            &|k| self.pos_vector(k),
            &empty,
        );
        let domain = self.candidate_domain();

        holes
            .iter()
            .map(|(hole, position)| {
                stats.hdc_unbind_attempts += 1;
                let residual = self.strategy.unbind(&bundle, &partial);
                let raw = self.strategy.unbind(&residual, &self.pos_vector(*position));
                let mut candidates = match self.strategy.decode_unbound_candidates(&raw, &domain)
                {
                    Some(decoded) => decoded,
                    None => top_k_similar(
                        self.strategy,
                        &raw,
                        &domain,
                        self.top_k,
                        self.strategy.min_decode_score(),
                    ),
                };
                candidates.truncate(self.top_k);
                if candidates.is_empty() {
                    warnings.push(Warning::NoDecodeCandidates { hole: hole.clone() });
                } else {
                    stats.hdc_unbind_successes += 1;
                }
                candidates
            })
            .collect()
    }

    /// Superposition of every fact vector in the KB.
    fn kb_bundle(&self, warnings: &mut Vec<Warning>) -> Vector {
        let vectors: Vec<Vector> = self.kb.facts().iter().map(|f| f.vector.clone()).collect();
        if vectors.len() > self.strategy.soft_capacity() {
            warnings.push(Warning::Capacity {
                strategy: self.strategy.id().as_str(),
                bundled: vectors.len(),
                soft_cap: self.strategy.soft_capacity(),
            });
        }
        self.strategy.bundle(&vectors)
    }

    /// Encode a ground goal; `None` when an atom was never interned (then
    /// nothing in the KB can mention it).
    fn goal_vector(&self, goal: &Expr) -> Option<Vector> {
        let op_vec = self
            .vocab
            .lookup(&goal.op)
            .map(|id| self.vocab.vector(id).clone())?;
        let mut knowns = Vec::with_capacity(goal.args.len());
        for (i, arg) in goal.args.iter().enumerate() {
            match arg {
                ExprArg::Atom(name) => {
                    let id = self.vocab.lookup(name)?;
                    knowns.push((i + 1, self.vocab.vector(id).clone()));
                }
                _ => return None,
            }
        }
        Some(encode_partial(
            self.strategy,
            &op_vec,
            &knowns,
            &|k| self.pos_vector(k),
            &self.empty_bundle_vector(),
        ))
    }

    /// User-visible atoms only: reserved markers, sentinels, and variable
    /// atoms never decode into answers.
    fn candidate_domain(&self) -> Vec<(String, Vector)> {
        self.vocab
            .atoms_in_order()
            .filter(|(_, name, _)| {
                !name.starts_with("Pos_")
                    && !name.starts_with("__")
                    && !name.starts_with('?')
                    && *name != crate::compiler::BOTTOM_IMPOSSIBLE
                    && *name != crate::compiler::TOP_INEFFABLE
            })
            .map(|(_, name, vector)| (name.to_string(), vector.clone()))
            .collect()
    }

    fn pos_vector(&self, k: usize) -> Vector {
        self.vocab
            .lookup(&format!("Pos_{}", k))
            .map(|id| self.vocab.vector(id).clone())
            .unwrap_or_else(|| self.strategy.create_zero())
    }

    fn empty_bundle_vector(&self) -> Vector {
        self.vocab
            .lookup(EMPTY_BUNDLE)
            .map(|id| self.vocab.vector(id).clone())
            .unwrap_or_else(|| self.strategy.create_zero())
    }
}

/// Ground a goal by name substitution of its holes.
fn substitute(goal: &Expr, bindings: &BTreeMap<String, String>) -> Expr {
    Expr {
        op: goal.op.clone(),
        args: goal
            .args
            .iter()
            .map(|arg| match arg {
                ExprArg::Var(name) => match bindings.get(name) {
                    Some(atom) => ExprArg::Atom(atom.clone()),
                    None => arg.clone(),
                },
                ExprArg::Nested(inner) => {
                    ExprArg::Nested(Box::new(substitute(inner, bindings)))
                }
                ExprArg::Atom(_) => arg.clone(),
            })
            .collect(),
    }
}

/// Bounded Cartesian product over per-hole candidate lists, first list
/// outermost so ranking order is preserved.
fn cartesian(lists: &[Vec<DecodedCandidate>], cap_per_list: usize) -> Vec<Vec<DecodedCandidate>> {
    let mut combos: Vec<Vec<DecodedCandidate>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::new();
        for combo in &combos {
            for candidate in list.iter().take(cap_per_list) {
                let mut extended = combo.clone();
                extended.push(candidate.clone());
                next.push(extended);
            }
        }
        combos = next;
        if combos.is_empty() {
            break;
        }
    }
    // A goal with no holes yields one empty combo; drop it — there is
    // nothing to validate through candidate substitution.
    combos.retain(|c| c.len() == lists.len() && !lists.is_empty());
    combos
}
