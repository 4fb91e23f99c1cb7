//! The session: one universe, one owner.
//!
//! Owns the strategy instance, vocabulary, KB, indices, graph table,
//! theory loader, and statistics. Reserved atoms intern before anything
//! else so their appearance indices are stable; Core packs load next when
//! auto-load is on. Nothing here is shared between sessions — two
//! sessions in one process have fully disjoint state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::ast::{Arg, Statement};
use crate::compiler::{
    BatchDelta, Compiler, GraphTable, BOTTOM_IMPOSSIBLE, CANONICAL_REWRITE, EMPTY_BUNDLE,
    TOP_INEFFABLE,
};
use crate::error::{Contradiction, Sys2Error, Warning};
use crate::expr::{Expr, ExprArg};
use crate::hdc::{create_strategy, check_contract, ContractReport, Geometry, Strategy, StrategyId};
use crate::kb::KnowledgeBase;
use crate::parser;
use crate::reason::csp::{self, Assignment, Constraint, CspProblem, CspResult, PredicateFn};
use crate::reason::holographic::{HdcStats, HolographicEngine};
use crate::reason::rules::{forward_chain, ForwardChainResult};
use crate::reason::symbolic::{Answer, SymbolicEngine};
use crate::reason::{Method, ProofStep};
use crate::scope::ScopeStack;
use crate::semantic::{CanonicalIndex, SemanticIndex};
use crate::theory::TheoryLoader;
use crate::vocab::Vocabulary;

/// Which engine answers first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Symbolic,
    Holographic,
}

impl Priority {
    pub fn parse(name: &str) -> Option<Priority> {
        match name {
            "symbolic" => Some(Priority::Symbolic),
            "holographic" => Some(Priority::Holographic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Substrate name (`exact`, `dense-binary`, …).
    pub strategy: String,
    /// Vector dimension; `None` takes the strategy default.
    pub geometry: Option<u32>,
    pub reasoning_priority: String,
    pub auto_load_core: bool,
    pub max_arity: usize,
    pub max_proof_depth: usize,
    pub csp_max_solutions: usize,
    pub csp_timeout_ms: u64,
    pub fallback_to_symbolic: bool,
    /// Candidate cap per hole in holographic decoding.
    pub hdc_top_k: usize,
    /// Base directory for relative `Load` paths.
    pub base_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strategy: "exact".to_string(),
            geometry: None,
            reasoning_priority: "symbolic".to_string(),
            auto_load_core: true,
            max_arity: 20,
            max_proof_depth: 5,
            csp_max_solutions: 100,
            csp_timeout_ms: 10_000,
            fallback_to_symbolic: true,
            hdc_top_k: 5,
            base_path: PathBuf::from("."),
        }
    }
}

/// Counter block; the holographic subset is read by the evaluation
/// harness.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub learns: u64,
    pub queries: u64,
    pub proves: u64,
    pub facts_added: u64,
    pub hdc: HdcStats,
}

#[derive(Debug, Default)]
pub struct LearnResult {
    pub success: bool,
    pub facts_added: usize,
    pub warnings: Vec<Warning>,
    pub errors: Vec<String>,
    pub rejected: Option<Contradiction>,
}

#[derive(Debug, Default)]
pub struct QueryResult {
    pub success: bool,
    pub all_results: Vec<Answer>,
    pub ambiguous: bool,
    pub warnings: Vec<Warning>,
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct ProveResult {
    pub valid: bool,
    pub confidence: f64,
    pub steps: Vec<ProofStep>,
    pub method: Method,
    pub warnings: Vec<Warning>,
    pub failure: Option<String>,
    pub errors: Vec<String>,
}

impl Default for ProveResult {
    fn default() -> Self {
        Self {
            valid: false,
            confidence: 0.0,
            steps: Vec::new(),
            method: Method::Direct,
            warnings: Vec::new(),
            failure: None,
            errors: Vec::new(),
        }
    }
}

pub struct Session {
    config: SessionConfig,
    strategy_id: StrategyId,
    priority: Priority,
    strategy: Box<dyn Strategy>,
    vocab: Vocabulary,
    kb: KnowledgeBase,
    semantic: SemanticIndex,
    canonical: CanonicalIndex,
    graphs: GraphTable,
    scope: ScopeStack,
    loader: TheoryLoader,
    stats: SessionStats,
    closed: bool,
}

impl Session {
    /// `open → core loaded → learn/query calls → close`.
    pub fn open(config: SessionConfig) -> Result<Session, Sys2Error> {
        let strategy_id = StrategyId::parse(&config.strategy).ok_or_else(|| {
            Sys2Error::Internal(format!("unknown strategy '{}'", config.strategy))
        })?;
        let priority = Priority::parse(&config.reasoning_priority).ok_or_else(|| {
            Sys2Error::Internal(format!(
                "unknown reasoning priority '{}'",
                config.reasoning_priority
            ))
        })?;
        let geometry = config
            .geometry
            .map(Geometry::new)
            .unwrap_or_else(|| Geometry::default_for(strategy_id));
        let strategy = create_strategy(strategy_id, geometry);
        let loader = TheoryLoader::new(config.base_path.clone());

        let mut session = Session {
            config,
            strategy_id,
            priority,
            strategy,
            vocab: Vocabulary::new(),
            kb: KnowledgeBase::new(),
            semantic: SemanticIndex::new(),
            canonical: CanonicalIndex::new(),
            graphs: GraphTable::new(),
            scope: ScopeStack::new(),
            loader,
            stats: SessionStats::default(),
            closed: false,
        };
        session.intern_reserved();
        tracing::debug!(strategy = session.strategy_id.as_str(), "session open");

        if session.config.auto_load_core {
            for (name, text) in TheoryLoader::core_packs() {
                let key = format!("core:{}", name);
                if session.loader.mark_loaded(&key) {
                    let result = session.learn(&text);
                    if !result.success {
                        return Err(Sys2Error::Internal(format!(
                            "core pack '{}' failed to load: {:?}",
                            name, result.errors
                        )));
                    }
                }
            }
            // Core loading is part of open; the counter block starts clean
            // for user operations.
            session.stats = SessionStats::default();
        }
        Ok(session)
    }

    /// Position markers first (indices 0..max_arity), then the sentinels.
    fn intern_reserved(&mut self) {
        for k in 1..=self.config.max_arity {
            self.vocab
                .intern(self.strategy.as_mut(), &format!("Pos_{}", k));
        }
        for name in [
            BOTTOM_IMPOSSIBLE,
            TOP_INEFFABLE,
            EMPTY_BUNDLE,
            CANONICAL_REWRITE,
        ] {
            self.vocab.intern(self.strategy.as_mut(), name);
        }
    }

    /// Transactional learn: all statements commit or none do. Vocabulary
    /// entries created during a rejected batch are retained.
    pub fn learn(&mut self, text: &str) -> LearnResult {
        if self.closed {
            return LearnResult {
                errors: vec![Sys2Error::SessionClosed.to_string()],
                ..LearnResult::default()
            };
        }
        self.stats.learns += 1;

        let items = match parser::parse(text) {
            Ok(items) => items,
            Err(e) => {
                return LearnResult {
                    errors: vec![e.display_with_source(text)],
                    ..LearnResult::default()
                };
            }
        };

        self.scope.clear();
        let compiler = Compiler::new(
            self.strategy.as_mut(),
            &mut self.vocab,
            &self.kb,
            &self.semantic,
            &self.canonical,
            &self.graphs,
            &mut self.scope,
            self.config.max_arity,
        );
        match compiler.run(&items) {
            Ok(delta) => {
                let mut result = LearnResult {
                    success: true,
                    ..LearnResult::default()
                };
                result.facts_added = self.commit(delta, &mut result.warnings, &mut result.errors);
                self.stats.facts_added += result.facts_added as u64;
                result
            }
            Err(Sys2Error::ContradictionRejected(contradiction)) => {
                // Full rollback: the delta is dropped, the scope dies; the
                // vocabulary keeps any atoms the attempt interned.
                self.scope.clear();
                LearnResult {
                    rejected: Some(contradiction),
                    ..LearnResult::default()
                }
            }
            Err(other) => {
                self.scope.clear();
                LearnResult {
                    errors: vec![other.to_string()],
                    ..LearnResult::default()
                }
            }
        }
    }

    fn commit(
        &mut self,
        delta: BatchDelta,
        warnings: &mut Vec<Warning>,
        errors: &mut Vec<String>,
    ) -> usize {
        for fact in &delta.facts {
            if let Some(anchor) = &fact.anchor {
                // Exported facts become referable atoms carrying the fact
                // vector.
                self.vocab.intern_with_vector(anchor, fact.vector.clone());
            }
        }
        let added = delta.facts.len();
        for fact in delta.facts {
            self.kb.insert(fact);
        }
        for rule in delta.rules {
            self.kb.insert_rule(rule);
        }
        for graph in delta.graphs {
            self.graphs.insert(graph);
        }
        for (op, args) in delta.semantic_decls {
            self.semantic.apply_declaration(&op, &args);
        }
        for (op, args) in delta.canonical_decls {
            self.canonical.apply_declaration(&op, &args);
        }
        warnings.extend(delta.warnings);
        for path in delta.loads {
            self.load_path(&path, warnings, errors);
        }
        for theory in delta.unloads {
            self.loader.unload(&theory);
        }
        added
    }

    fn load_path(&mut self, path: &str, warnings: &mut Vec<Warning>, errors: &mut Vec<String>) {
        let key = self.loader.resolve(path).display().to_string();
        if !self.loader.mark_loaded(&key) {
            return;
        }
        match self.loader.read(path) {
            Ok(text) => {
                let result = self.learn(&text);
                warnings.extend(result.warnings);
                errors.extend(result.errors);
                if let Some(contradiction) = result.rejected {
                    errors.push(contradiction.to_string());
                }
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    /// Query with holes; every successful binding set, deduplicated and
    /// confidence-ordered.
    pub fn query(&mut self, text: &str) -> QueryResult {
        if self.closed {
            return QueryResult {
                errors: vec![Sys2Error::SessionClosed.to_string()],
                ..QueryResult::default()
            };
        }
        self.stats.queries += 1;

        let goal = match self.parse_goal(text) {
            Ok(goal) => goal,
            Err(message) => {
                return QueryResult {
                    errors: vec![message],
                    ..QueryResult::default()
                };
            }
        };

        let outcome = match self.priority {
            Priority::Symbolic => {
                SymbolicEngine::new(&self.kb, &self.semantic, self.config.max_proof_depth)
                    .query(&goal)
            }
            Priority::Holographic => HolographicEngine::new(
                self.strategy.as_ref(),
                &self.vocab,
                &self.kb,
                &self.semantic,
                self.config.hdc_top_k,
                self.config.fallback_to_symbolic,
                self.config.max_proof_depth,
            )
            .query(&goal, &mut self.stats.hdc),
        };

        QueryResult {
            success: !outcome.answers.is_empty(),
            ambiguous: outcome.answers.len() > 1,
            all_results: outcome.answers,
            warnings: outcome.warnings,
            errors: Vec::new(),
        }
    }

    /// Ground-goal proof with an ordered step trace.
    pub fn prove(&mut self, text: &str) -> ProveResult {
        if self.closed {
            return ProveResult {
                errors: vec![Sys2Error::SessionClosed.to_string()],
                ..ProveResult::default()
            };
        }
        self.stats.proves += 1;

        let goal = match self.parse_goal(text) {
            Ok(goal) => goal,
            Err(message) => {
                return ProveResult {
                    errors: vec![message],
                    ..ProveResult::default()
                };
            }
        };
        if !goal.is_ground() {
            return ProveResult {
                failure: Some("prove goals must be fully ground".to_string()),
                ..ProveResult::default()
            };
        }

        let outcome = match self.priority {
            Priority::Symbolic => {
                SymbolicEngine::new(&self.kb, &self.semantic, self.config.max_proof_depth)
                    .prove(&goal)
            }
            Priority::Holographic => HolographicEngine::new(
                self.strategy.as_ref(),
                &self.vocab,
                &self.kb,
                &self.semantic,
                self.config.hdc_top_k,
                self.config.fallback_to_symbolic,
                self.config.max_proof_depth,
            )
            .prove(&goal, &mut self.stats.hdc),
        };

        ProveResult {
            valid: outcome.valid,
            confidence: outcome.confidence,
            steps: outcome.steps,
            method: outcome.method,
            warnings: outcome.warnings,
            failure: outcome.failure,
            errors: Vec::new(),
        }
    }

    /// All binding sets for a pattern, without the result wrapper.
    pub fn find_all(&mut self, pattern: &str) -> Vec<BTreeMap<String, String>> {
        self.query(pattern)
            .all_results
            .into_iter()
            .map(|a| a.bindings)
            .collect()
    }

    /// Explicit forward chaining to a fixed point.
    pub fn forward_chain(&mut self, max_iterations: usize) -> ForwardChainResult {
        let result = forward_chain(
            self.strategy.as_mut(),
            &mut self.vocab,
            &mut self.kb,
            &self.semantic,
            self.config.max_proof_depth,
            max_iterations,
        );
        self.stats.facts_added += result.facts_added as u64;
        result
    }

    pub fn create_csp_solver(&self) -> CspBuilder<'_> {
        CspBuilder::new(self)
    }

    /// Render any result type for the phrasing layer.
    pub fn describe_result<R: crate::describe::Describe>(&self, result: &R) -> String {
        result.describe()
    }

    /// Run the strategy contract tester against this session's instance.
    pub fn check_strategy_contract(&mut self) -> ContractReport {
        check_contract(self.strategy.as_mut())
    }

    pub fn close(&mut self) {
        tracing::debug!(
            facts = self.kb.len(),
            atoms = self.vocab.len(),
            "session close"
        );
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn strategy_id(&self) -> StrategyId {
        self.strategy_id
    }

    /// Parse one statement and resolve it to a canonical goal expression.
    /// Queries never touch the scope and never create facts.
    fn parse_goal(&self, text: &str) -> Result<Expr, String> {
        let stmt = parser::parse_statement(text)
            .map_err(|e| e.display_with_source(text))?;
        self.statement_to_expr(&stmt).map_err(|e| e.to_string())
    }

    fn statement_to_expr(&self, stmt: &Statement) -> Result<Expr, Sys2Error> {
        let op = self.canonical.canonicalize(&stmt.operator).to_string();
        let mut args = Vec::with_capacity(stmt.args.len());
        for arg in &stmt.args {
            args.push(match arg {
                Arg::Ident(name) => {
                    ExprArg::Atom(self.canonical.canonicalize(name).to_string())
                }
                Arg::Number(n) => ExprArg::Atom(n.to_string()),
                Arg::Hole(name) => ExprArg::Var(name.clone()),
                Arg::ScopeRef(name) => {
                    // Scopes die with their learn batch; queries cannot
                    // reference them.
                    return Err(Sys2Error::UndefinedVariable {
                        name: name.clone(),
                        span: stmt.span,
                    });
                }
                Arg::Nested(inner) => {
                    ExprArg::Nested(Box::new(self.statement_to_expr(inner)?))
                }
            });
        }
        Ok(Expr { op, args })
    }
}

/// Builder for KB-backed constraint problems.
///
/// Variables and domains can be pulled from the KB by type; constraint
/// extensions are materialized from facts at solve time in fact-id order,
/// so results are reproducible.
pub struct CspBuilder<'a> {
    session: &'a Session,
    variables: Vec<csp::CspVariable>,
    default_domain: Vec<String>,
    constraints: Vec<Constraint>,
    no_conflict_relations: Vec<String>,
    max_solutions: usize,
    timeout_ms: u64,
}

impl<'a> CspBuilder<'a> {
    fn new(session: &'a Session) -> Self {
        Self {
            session,
            variables: Vec::new(),
            default_domain: Vec::new(),
            constraints: Vec::new(),
            no_conflict_relations: Vec::new(),
            max_solutions: session.config.csp_max_solutions,
            timeout_ms: session.config.csp_timeout_ms,
        }
    }

    /// One variable per direct `isA <x> <type_name>` subject.
    pub fn variables_from_type(mut self, type_name: &str) -> Self {
        for subject in self.subjects_of_type(type_name) {
            self.variables.push(csp::CspVariable {
                name: subject,
                domain: Vec::new(),
            });
        }
        self
    }

    /// Default domain for every variable without an explicit one.
    pub fn domain_from_type(mut self, type_name: &str) -> Self {
        self.default_domain = self.subjects_of_type(type_name);
        self
    }

    pub fn add_variable(mut self, name: &str, domain: &[&str]) -> Self {
        self.variables.push(csp::CspVariable {
            name: name.to_string(),
            domain: domain.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn all_different(mut self) -> Self {
        let vars = self.variables.iter().map(|v| v.name.clone()).collect();
        self.constraints.push(Constraint::AllDifferent(vars));
        self
    }

    /// Variables whose names the KB relates under `relation` must not
    /// share a value.
    pub fn no_conflict(mut self, relation: &str) -> Self {
        self.no_conflict_relations.push(relation.to_string());
        self
    }

    pub fn predicate(mut self, vars: &[&str], test: PredicateFn) -> Self {
        self.constraints.push(Constraint::Predicate {
            vars: vars.iter().map(|s| s.to_string()).collect(),
            test,
        });
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn max_solutions(mut self, cap: usize) -> Self {
        self.max_solutions = cap;
        self
    }

    pub fn timeout_ms(mut self, cap: u64) -> Self {
        self.timeout_ms = cap;
        self
    }

    pub fn solve(self) -> CspResult {
        let variable_names: Vec<String> =
            self.variables.iter().map(|v| v.name.clone()).collect();

        let mut constraints = self.constraints;
        for relation in &self.no_conflict_relations {
            let mut pairs: Vec<(String, String)> = Vec::new();
            for fact in self.session.kb.facts_with_operator(relation) {
                if let (Some(a), Some(b)) = (fact.atom_name(0), fact.atom_name(1)) {
                    let a = a.to_string();
                    let b = b.to_string();
                    if variable_names.contains(&a)
                        && variable_names.contains(&b)
                        && !pairs.contains(&(b.clone(), a.clone()))
                        && !pairs.contains(&(a.clone(), b.clone()))
                    {
                        pairs.push((a, b));
                    }
                }
            }
            if !pairs.is_empty() {
                constraints.push(Constraint::NoConflict { pairs });
            }
        }

        let variables: Vec<csp::CspVariable> = self
            .variables
            .into_iter()
            .map(|v| csp::CspVariable {
                domain: if v.domain.is_empty() {
                    self.default_domain.clone()
                } else {
                    v.domain
                },
                name: v.name,
            })
            .collect();

        csp::solve(&CspProblem {
            variables,
            constraints,
            max_solutions: self.max_solutions,
            timeout_ms: self.timeout_ms,
        })
    }

    /// Subjects of direct `isA` facts naming `type_name`, fact-id order.
    fn subjects_of_type(&self, type_name: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for fact in self.session.kb.facts_with_operator("isA") {
            if fact.atom_name(1) == Some(type_name) {
                if let Some(subject) = fact.atom_name(0) {
                    if !out.iter().any(|s| s == subject) {
                        out.push(subject.to_string());
                    }
                }
            }
        }
        out
    }
}

/// Convenience constructor used across tests and the CLI: a session with
/// defaults except for the named strategy and priority.
pub fn open_with(strategy: &str, priority: &str) -> Result<Session, Sys2Error> {
    Session::open(SessionConfig {
        strategy: strategy.to_string(),
        reasoning_priority: priority.to_string(),
        ..SessionConfig::default()
    })
}

// Session solve_csp companion: assignments are plain maps, re-exported so
// callers need not reach into the csp module.
pub type CspAssignment = Assignment;
