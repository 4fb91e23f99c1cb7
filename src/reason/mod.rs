//! Reasoning engines.
//!
//! Two orchestrators — symbolic-priority and holographic-priority — over
//! one set of primitives: unification, direct match, transitive closure,
//! inheritance, rule chaining, unbind/decode, and symbolic validation.
//! Which one runs first is a session configuration choice; they are never
//! merged into a single algorithm.

pub mod contradict;
pub mod csp;
pub mod holographic;
pub mod rules;
pub mod symbolic;
pub mod unify;

pub use csp::{Constraint, CspProblem, CspResult, CspStats, CspVariable};
pub use holographic::HolographicEngine;
pub use rules::{forward_chain, ForwardChainResult};
pub use symbolic::{Answer, ProveOutcome, QueryOutcome, SymbolicEngine};
pub use unify::{apply_bindings, unify_args, unify_exprs, Bindings};

use std::fmt;

/// Confidence decay per derivation link; within the [0.95, 0.98] band.
pub const CONFIDENCE_DECAY: f64 = 0.97;

/// Where an answer's evidence came from. Rendered into results so the
/// phrasing layer can report the method without inspecting internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Direct,
    Transitive,
    Inheritance,
    Rule,
    Csp,
    HdcValidated,
    SymbolicFallback,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Method::Direct => "direct",
            Method::Transitive => "transitive",
            Method::Inheritance => "inheritance",
            Method::Rule => "rule",
            Method::Csp => "csp",
            Method::HdcValidated => "hdc_validated",
            Method::SymbolicFallback => "symbolic_fallback",
        };
        write!(f, "{}", label)
    }
}

/// One step of a derivation, ordered root-first.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofStep {
    pub kind: StepKind,
    /// The fact or rule cited, rendered canonically.
    pub detail: String,
    /// Variable bindings active at this step, rendered.
    pub bindings: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Fact,
    TransitiveLink,
    Inherited,
    RuleApplication,
    Premise,
    CanonicalRewrite,
    HdcDecode,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepKind::Fact => "fact",
            StepKind::TransitiveLink => "transitive-link",
            StepKind::Inherited => "inherited",
            StepKind::RuleApplication => "rule",
            StepKind::Premise => "premise",
            StepKind::CanonicalRewrite => "canonical-rewrite",
            StepKind::HdcDecode => "hdc-decode",
        };
        write!(f, "{}", label)
    }
}
