//! Statement compiler and batch executor.
//!
//! Turns parsed items into compiled vectors and tentative KB records. A
//! learn batch accumulates everything into a [`BatchDelta`] first; nothing
//! touches the committed KB until the whole batch has compiled and passed
//! the contradiction detector, which makes learn transactional. Atoms
//! interned along the way stay interned even when the batch is rejected —
//! the vocabulary is monotonic by design.

use std::collections::HashMap;

use crate::ast::{Arg, Directive, GraphDecl, Item, Statement};
use crate::error::{Sys2Error, Warning};
use crate::expr::{Expr, ExprArg};
use crate::hdc::{Strategy, Vector};
use crate::kb::{Fact, FactArg, FactMeta, KnowledgeBase, Rule, IMPLIES};
use crate::reason::contradict;
use crate::scope::{ScopeEntry, ScopeStack};
use crate::semantic::{CanonicalIndex, SemanticIndex};
use crate::token::Span;
use crate::vocab::{AtomId, TypeTag, Vocabulary};

/// Reserved sentinel names, interned before any user atom.
pub const BOTTOM_IMPOSSIBLE: &str = "BOTTOM_IMPOSSIBLE";
pub const TOP_INEFFABLE: &str = "TOP_INEFFABLE";
pub const EMPTY_BUNDLE: &str = "__EMPTY_BUNDLE__";
pub const CANONICAL_REWRITE: &str = "__CANONICAL_REWRITE__";

/// Named, parameterized statement templates, append-only per session.
#[derive(Debug, Default)]
pub struct GraphTable {
    by_name: HashMap<String, usize>,
    graphs: Vec<GraphDecl>,
}

impl GraphTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decl: GraphDecl) {
        let index = self.graphs.len();
        self.by_name.entry(decl.name.clone()).or_insert(index);
        if let Some(alias) = &decl.alias {
            self.by_name.entry(alias.clone()).or_insert(index);
        }
        self.graphs.push(decl);
    }

    pub fn get(&self, name: &str) -> Option<&GraphDecl> {
        self.by_name.get(name).map(|&i| &self.graphs[i])
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

/// Everything a batch wants to commit, plus side effects for the session.
#[derive(Debug, Default)]
pub struct BatchDelta {
    pub facts: Vec<Fact>,
    pub rules: Vec<Rule>,
    pub graphs: Vec<GraphDecl>,
    /// (operator, args) declaration facts to replay into the semantic index.
    pub semantic_decls: Vec<(String, Vec<String>)>,
    pub canonical_decls: Vec<(String, Vec<String>)>,
    pub warnings: Vec<Warning>,
    /// `@_ Load` paths, processed by the session after commit.
    pub loads: Vec<String>,
    pub unloads: Vec<String>,
}

/// Borrowed view of the session pieces a batch needs.
pub struct Compiler<'a> {
    strategy: &'a mut dyn Strategy,
    vocab: &'a mut Vocabulary,
    kb: &'a KnowledgeBase,
    semantic: &'a SemanticIndex,
    canonical: &'a CanonicalIndex,
    graphs: &'a GraphTable,
    scope: &'a mut ScopeStack,
    max_arity: usize,
    delta: BatchDelta,
    /// Declarations made earlier in this batch, visible to later statements.
    local_semantic: SemanticIndex,
    local_canonical: CanonicalIndex,
    /// Anchor levels created earlier in this batch.
    local_atom_levels: HashMap<String, u32>,
}

impl<'a> Compiler<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        strategy: &'a mut dyn Strategy,
        vocab: &'a mut Vocabulary,
        kb: &'a KnowledgeBase,
        semantic: &'a SemanticIndex,
        canonical: &'a CanonicalIndex,
        graphs: &'a GraphTable,
        scope: &'a mut ScopeStack,
        max_arity: usize,
    ) -> Self {
        Self {
            strategy,
            vocab,
            kb,
            semantic,
            canonical,
            graphs,
            scope,
            max_arity,
            delta: BatchDelta::default(),
            local_semantic: SemanticIndex::new(),
            local_canonical: CanonicalIndex::new(),
            local_atom_levels: HashMap::new(),
        }
    }

    /// Execute a whole batch. On error the delta is dropped by the caller;
    /// the session scope must be cleared by the caller as well.
    pub fn run(mut self, items: &[Item]) -> Result<BatchDelta, Sys2Error> {
        for item in items {
            self.exec_item(item)?;
        }
        Ok(self.delta)
    }

    fn exec_item(&mut self, item: &Item) -> Result<(), Sys2Error> {
        match item {
            Item::Statement(stmt) => {
                self.exec_statement(stmt)?;
                Ok(())
            }
            Item::Graph(decl) => {
                self.delta.graphs.push(decl.clone());
                Ok(())
            }
            Item::Theory(decl) => {
                self.vocab.push_theory(&decl.name);
                let result = decl.body.iter().try_for_each(|item| self.exec_item(item));
                self.vocab.pop_theory();
                result
            }
            Item::Directive(directive) => self.exec_directive(directive),
        }
    }

    fn exec_directive(&mut self, directive: &Directive) -> Result<(), Sys2Error> {
        match directive {
            Directive::Load(path) => {
                self.delta.loads.push(path.clone());
                Ok(())
            }
            Directive::Unload(theory) => {
                self.delta.unloads.push(theory.clone());
                Ok(())
            }
            Directive::Export(var) => {
                let entry = self.scope.lookup(var).cloned().ok_or_else(|| {
                    Sys2Error::UndefinedVariable {
                        name: var.clone(),
                        span: Span::default(),
                    }
                })?;
                self.add_fact(
                    entry.expr,
                    entry.vector,
                    Some(var.clone()),
                    None,
                    None,
                )
            }
        }
    }

    /// Execute one statement: resolve, encode, and route the result to the
    /// scope and/or the tentative fact list per the persistence rules.
    fn exec_statement(&mut self, stmt: &Statement) -> Result<(Vector, Expr), Sys2Error> {
        // Graph invocation takes over the whole statement.
        if let Some(decl) = self.graphs.get(&stmt.operator).cloned().or_else(|| {
            self.delta
                .graphs
                .iter()
                .find(|g| {
                    g.name == stmt.operator || g.alias.as_deref() == Some(stmt.operator.as_str())
                })
                .cloned()
        }) {
            return self.invoke_graph(&decl, stmt);
        }

        let surface_op = stmt.operator.clone();
        let operator = self.canonicalize_name(&surface_op)?;

        if stmt.args.len() > self.max_arity {
            return Err(Sys2Error::ArityOverflow {
                operator: surface_op,
                arity: stmt.args.len(),
                max_arity: self.max_arity,
            });
        }

        let mut resolved: Vec<(Vector, ExprArg)> = Vec::with_capacity(stmt.args.len());
        for arg in &stmt.args {
            resolved.push(self.resolve_arg(arg, stmt.span)?);
        }

        let op_atom = self.intern(&operator);
        let op_vec = self.vocab.vector(op_atom).clone();
        let arg_vectors: Vec<(usize, Vector)> = resolved
            .iter()
            .enumerate()
            .map(|(i, (v, _))| (i + 1, v.clone()))
            .collect();
        let vector = self.encode(&op_vec, &arg_vectors);

        let expr = Expr {
            op: operator.clone(),
            args: resolved.iter().map(|(_, a)| a.clone()).collect(),
        };

        // Type-tagging: `isA X Person` tags X when the object names a type
        // from the core hierarchy.
        if operator == "isA" && expr.args.len() == 2 {
            if let (ExprArg::Atom(subject), ExprArg::Atom(object)) = (&expr.args[0], &expr.args[1])
            {
                if let Some(tag) = TypeTag::parse(object) {
                    let subject = subject.clone();
                    let id = self.intern(&subject);
                    self.vocab.set_type_tag(id, tag);
                }
            }
        }

        match &stmt.dest {
            Some(dest) => {
                let exported = dest.export.clone();
                self.scope.bind(
                    &dest.var,
                    ScopeEntry {
                        vector: vector.clone(),
                        expr: expr.clone(),
                        exported: exported.clone(),
                    },
                );
                if let Some(name) = exported {
                    self.add_fact(
                        expr.clone(),
                        vector.clone(),
                        Some(name),
                        Some(stmt.span),
                        Some(surface_op),
                    )?;
                } else if operator == IMPLIES {
                    // Rules enter the KB even when scoped: a rule bound
                    // only to a dead batch variable could never fire.
                    self.add_fact(
                        expr.clone(),
                        vector.clone(),
                        None,
                        Some(stmt.span),
                        Some(surface_op),
                    )?;
                }
            }
            None => {
                self.add_fact(
                    expr.clone(),
                    vector.clone(),
                    None,
                    Some(stmt.span),
                    Some(surface_op),
                )?;
            }
        }

        Ok((vector, expr))
    }

    /// Substitute parameters, run the body in a child scope, and hand back
    /// the `return` expression's compilation.
    fn invoke_graph(
        &mut self,
        decl: &GraphDecl,
        stmt: &Statement,
    ) -> Result<(Vector, Expr), Sys2Error> {
        if stmt.args.len() != decl.params.len() {
            return Err(Sys2Error::UnknownGraph {
                name: format!(
                    "{} (expects {} arguments, got {})",
                    decl.name,
                    decl.params.len(),
                    stmt.args.len()
                ),
                span: stmt.span,
            });
        }

        let mut bound: Vec<(String, ScopeEntry)> = Vec::with_capacity(decl.params.len());
        for (param, arg) in decl.params.iter().zip(&stmt.args) {
            let (vector, expr_arg) = self.resolve_arg(arg, stmt.span)?;
            let expr = match expr_arg {
                ExprArg::Nested(inner) => *inner,
                ExprArg::Atom(name) => Expr::new(name, Vec::new()),
                ExprArg::Var(name) => Expr {
                    op: format!("?{}", name),
                    args: Vec::new(),
                },
            };
            bound.push((
                param.clone(),
                ScopeEntry {
                    vector,
                    expr,
                    exported: None,
                },
            ));
        }

        self.scope.push_scope();
        for (param, entry) in bound {
            self.scope.bind(&param, entry);
        }
        let body_result: Result<(), Sys2Error> = decl
            .body
            .iter()
            .try_for_each(|s| self.exec_statement(s).map(|_| ()));
        let result = body_result.and_then(|_| {
            let (vector, expr_arg) = self.resolve_arg(&decl.ret, stmt.span)?;
            let expr = match expr_arg {
                ExprArg::Nested(inner) => *inner,
                ExprArg::Atom(name) => Expr::new(name, Vec::new()),
                ExprArg::Var(name) => Expr {
                    op: format!("?{}", name),
                    args: Vec::new(),
                },
            };
            Ok((vector, expr))
        });
        self.scope.pop_scope();
        let (vector, expr) = result?;

        match &stmt.dest {
            Some(dest) => {
                self.scope.bind(
                    &dest.var,
                    ScopeEntry {
                        vector: vector.clone(),
                        expr: expr.clone(),
                        exported: dest.export.clone(),
                    },
                );
                if let Some(name) = dest.export.clone() {
                    self.add_fact(expr.clone(), vector.clone(), Some(name), Some(stmt.span), None)?;
                }
            }
            None => {
                // Invocations materialize ordinary facts when ground.
                if expr.is_ground() && !expr.args.is_empty() {
                    self.add_fact(expr.clone(), vector.clone(), None, Some(stmt.span), None)?;
                }
            }
        }

        Ok((vector, expr))
    }

    fn resolve_arg(&mut self, arg: &Arg, span: Span) -> Result<(Vector, ExprArg), Sys2Error> {
        match arg {
            Arg::Ident(name) => {
                let canonical = self.canonicalize_name(name)?;
                let id = self.intern(&canonical);
                Ok((self.vocab.vector(id).clone(), ExprArg::Atom(canonical)))
            }
            Arg::Number(n) => {
                let name = n.to_string();
                let id = self.intern(&name);
                self.vocab.set_type_tag(id, TypeTag::Number);
                Ok((self.vocab.vector(id).clone(), ExprArg::Atom(name)))
            }
            Arg::ScopeRef(var) => {
                let entry =
                    self.scope
                        .lookup(var)
                        .cloned()
                        .ok_or_else(|| Sys2Error::UndefinedVariable {
                            name: var.clone(),
                            span,
                        })?;
                let expr_arg = if entry.expr.args.is_empty() && !entry.expr.op.starts_with('?') {
                    ExprArg::Atom(entry.expr.op.clone())
                } else {
                    ExprArg::Nested(Box::new(entry.expr.clone()))
                };
                Ok((entry.vector, expr_arg))
            }
            Arg::Hole(name) => {
                // Variables compile against a reserved `?name` atom so rule
                // vectors stay deterministic.
                let id = self.intern(&format!("?{}", name));
                Ok((self.vocab.vector(id).clone(), ExprArg::Var(name.clone())))
            }
            Arg::Nested(stmt) => {
                let (vector, expr) = self.compile_nested(stmt)?;
                Ok((vector, ExprArg::Nested(Box::new(expr))))
            }
        }
    }

    /// Nested statements compile to vectors but never emit facts or touch
    /// the scope on their own.
    fn compile_nested(&mut self, stmt: &Statement) -> Result<(Vector, Expr), Sys2Error> {
        let operator = self.canonicalize_name(&stmt.operator)?;
        if stmt.args.len() > self.max_arity {
            return Err(Sys2Error::ArityOverflow {
                operator: stmt.operator.clone(),
                arity: stmt.args.len(),
                max_arity: self.max_arity,
            });
        }
        let mut resolved = Vec::with_capacity(stmt.args.len());
        for arg in &stmt.args {
            resolved.push(self.resolve_arg(arg, stmt.span)?);
        }
        let op_atom = self.intern(&operator);
        let op_vec = self.vocab.vector(op_atom).clone();
        let arg_vectors: Vec<(usize, Vector)> = resolved
            .iter()
            .enumerate()
            .map(|(i, (v, _))| (i + 1, v.clone()))
            .collect();
        let vector = self.encode(&op_vec, &arg_vectors);
        let expr = Expr {
            op: operator,
            args: resolved.into_iter().map(|(_, a)| a).collect(),
        };
        Ok((vector, expr))
    }

    /// The encoding rule:
    /// `encode(op, a1..aN) = bind(op, bundle(bind(Pos_k, ak)…))`,
    /// with the empty-bundle sentinel standing in at arity 0.
    fn encode(&mut self, op_vec: &Vector, args: &[(usize, Vector)]) -> Vector {
        let arg_part = if args.is_empty() {
            let id = self.intern(EMPTY_BUNDLE);
            self.vocab.vector(id).clone()
        } else {
            let tagged: Vec<Vector> = args
                .iter()
                .map(|(k, v)| {
                    let pos = self.pos_vector(*k);
                    self.strategy.bind(&pos, v)
                })
                .collect();
            if tagged.len() > self.strategy.soft_capacity() {
                self.delta.warnings.push(Warning::Capacity {
                    strategy: self.strategy.id().as_str(),
                    bundled: tagged.len(),
                    soft_cap: self.strategy.soft_capacity(),
                });
            }
            self.strategy.bundle(&tagged)
        };
        self.strategy.bind(op_vec, &arg_part)
    }

    fn pos_vector(&mut self, k: usize) -> Vector {
        let id = self.intern(&format!("Pos_{}", k));
        self.vocab.vector(id).clone()
    }

    fn intern(&mut self, name: &str) -> AtomId {
        self.vocab.intern(self.strategy, name)
    }

    /// Session rewrites first, then batch-local declarations. Rewrites are
    /// recorded as metadata facts so proofs can cite them.
    fn canonicalize_name(&mut self, name: &str) -> Result<String, Sys2Error> {
        let step1 = self.canonical.canonicalize(name);
        let canonical = self.local_canonical.canonicalize(step1).to_string();
        if canonical != name {
            self.record_rewrite(name, &canonical)?;
        }
        Ok(canonical)
    }

    fn record_rewrite(&mut self, surface: &str, canonical: &str) -> Result<(), Sys2Error> {
        let expr = Expr::ground(CANONICAL_REWRITE, &[surface, canonical]);
        let signature = expr.signature();
        if self.kb.contains_signature(&signature)
            || self.delta.facts.iter().any(|f| f.signature() == signature)
        {
            return Ok(());
        }
        let op_atom = self.intern(CANONICAL_REWRITE);
        let op_vec = self.vocab.vector(op_atom).clone();
        let surface_id = self.intern(surface);
        let canonical_id = self.intern(canonical);
        let args = vec![
            (1, self.vocab.vector(surface_id).clone()),
            (2, self.vocab.vector(canonical_id).clone()),
        ];
        let vector = self.encode(&op_vec, &args);
        self.push_fact(expr, vector, None, FactMeta::default())
    }

    /// Queue a tentative fact: dedup by signature, gate through the
    /// contradiction detector, decompose rules and declarations.
    fn add_fact(
        &mut self,
        expr: Expr,
        vector: Vector,
        anchor: Option<String>,
        span: Option<Span>,
        surface_operator: Option<String>,
    ) -> Result<(), Sys2Error> {
        let signature = expr.signature();
        if self.kb.contains_signature(&signature)
            || self.delta.facts.iter().any(|f| f.signature() == signature)
        {
            // Idempotent learn: an existing anchor also stands.
            return Ok(());
        }

        let rewritten = surface_operator
            .as_deref()
            .map(|s| s != expr.op)
            .unwrap_or(false);
        let meta = FactMeta {
            surface_operator: surface_operator.unwrap_or_else(|| expr.op.clone()),
            surface_args: expr.args.iter().map(|a| a.to_string()).collect(),
            span,
            rewritten,
        };

        // Declarations are facts too; they update the indices at commit.
        let atom_args: Option<Vec<String>> = expr
            .args
            .iter()
            .map(|a| match a {
                ExprArg::Atom(name) => Some(name.clone()),
                _ => None,
            })
            .collect();
        if let Some(args) = &atom_args {
            let mut semantic_probe = SemanticIndex::new();
            if semantic_probe.apply_declaration(&expr.op, args) {
                self.local_semantic.apply_declaration(&expr.op, args);
                self.delta
                    .semantic_decls
                    .push((expr.op.clone(), args.clone()));
            }
            let mut canonical_probe = CanonicalIndex::new();
            if canonical_probe.apply_declaration(&expr.op, args) {
                self.local_canonical.apply_declaration(&expr.op, args);
                self.delta
                    .canonical_decls
                    .push((expr.op.clone(), args.clone()));
            }
        }

        // The contradiction gate. Declarations and metadata facts pass.
        if expr.op != CANONICAL_REWRITE && expr.op != IMPLIES {
            if let Some(contradiction) = contradict::check(
                self.kb,
                self.semantic,
                &self.local_semantic,
                &self.delta.facts,
                &expr,
            ) {
                return Err(Sys2Error::ContradictionRejected(contradiction));
            }
        }

        // Declared-symmetric relations emit their mirror image alongside.
        let mirror = if (self.semantic.is_symmetric(&expr.op)
            || self.local_semantic.is_symmetric(&expr.op))
            && expr.args.len() == 2
            && expr.is_ground()
        {
            let mut args = expr.args.clone();
            args.swap(0, 1);
            let mirrored = Expr {
                op: expr.op.clone(),
                args,
            };
            let sig = mirrored.signature();
            if self.kb.contains_signature(&sig)
                || self.delta.facts.iter().any(|f| f.signature() == sig)
            {
                None
            } else {
                Some(mirrored)
            }
        } else {
            None
        };

        self.push_fact(expr, vector, anchor, meta)?;

        if let Some(mirrored) = mirror {
            let vector = self.encode_expr(&mirrored)?;
            self.push_fact(mirrored, vector, None, FactMeta::default())?;
        }
        Ok(())
    }

    /// Encode an already-resolved ground expression (mirror emission).
    fn encode_expr(&mut self, expr: &Expr) -> Result<Vector, Sys2Error> {
        let op_atom = self.intern(&expr.op);
        let op_vec = self.vocab.vector(op_atom).clone();
        let mut args: Vec<(usize, Vector)> = Vec::with_capacity(expr.args.len());
        for (i, arg) in expr.args.iter().enumerate() {
            let vector = match arg {
                ExprArg::Atom(name) => {
                    let name = name.clone();
                    let id = self.intern(&name);
                    self.vocab.vector(id).clone()
                }
                ExprArg::Var(name) => {
                    let id = self.intern(&format!("?{}", name));
                    self.vocab.vector(id).clone()
                }
                ExprArg::Nested(inner) => {
                    let stmt_like = (**inner).clone();
                    self.encode_expr(&stmt_like)?
                }
            };
            args.push((i + 1, vector));
        }
        Ok(self.encode(&op_vec, &args))
    }

    fn push_fact(
        &mut self,
        expr: Expr,
        vector: Vector,
        anchor: Option<String>,
        meta: FactMeta,
    ) -> Result<(), Sys2Error> {
        let level = self.level_for(&expr);
        let operator_atom = self.intern(&expr.op);
        let mut args: Vec<FactArg> = Vec::with_capacity(expr.args.len());
        for a in &expr.args {
            let fact_arg = match a {
                ExprArg::Atom(name) => {
                    let name = name.clone();
                    let id = self.intern(&name);
                    FactArg::Atom { id, name }
                }
                ExprArg::Var(name) => {
                    let name = format!("?{}", name);
                    let id = self.intern(&name);
                    FactArg::Atom { id, name }
                }
                ExprArg::Nested(inner) => FactArg::Expr((**inner).clone()),
            };
            args.push(fact_arg);
        }

        let id = self.kb.next_fact_id() + self.delta.facts.len() as u64;
        let fact = Fact {
            id,
            operator: expr.op.clone(),
            operator_atom,
            args,
            vector,
            level,
            anchor: anchor.clone(),
            meta,
        };

        if let Some(name) = &anchor {
            self.local_atom_levels.insert(name.clone(), level);
        }

        // Rules ride the fact list and are decomposed for the rule engine.
        if expr.op == IMPLIES && expr.args.len() == 2 {
            if let Some(rule) = self.build_rule(&fact, &expr) {
                self.delta.rules.push(rule);
            }
        }

        self.delta.facts.push(fact);
        Ok(())
    }

    fn build_rule(&self, fact: &Fact, expr: &Expr) -> Option<Rule> {
        let to_expr = |arg: &ExprArg| -> Option<Expr> {
            match arg {
                ExprArg::Nested(inner) => Some((**inner).clone()),
                ExprArg::Atom(name) => Some(Expr::new(name.clone(), Vec::new())),
                ExprArg::Var(_) => None,
            }
        };
        let condition = to_expr(&expr.args[0])?;
        let conclusion = to_expr(&expr.args[1])?;
        let mut vars = condition.vars();
        for v in conclusion.vars() {
            if !vars.contains(&v) {
                vars.push(v);
            }
        }
        let has_vars = !vars.is_empty();
        let conclusion_op = conclusion.op.clone();
        let conclusion_level = self.level_for(&conclusion);
        let max_premise_level = condition
            .premises()
            .iter()
            .map(|p| self.level_for(p))
            .max()
            .unwrap_or(1);
        Some(Rule {
            fact_id: fact.id,
            condition,
            conclusion,
            vars,
            conclusion_op,
            has_vars,
            conclusion_level,
            max_premise_level,
        })
    }

    /// Constructivist level against committed and batch-local anchors.
    fn level_for(&self, expr: &Expr) -> u32 {
        let committed = self.kb.level_for(expr);
        let local = 1 + self.max_local_dep(expr);
        committed.max(local)
    }

    fn max_local_dep(&self, expr: &Expr) -> u32 {
        let mut max = self
            .local_atom_levels
            .get(&expr.op)
            .copied()
            .unwrap_or(0);
        for arg in &expr.args {
            let level = match arg {
                ExprArg::Atom(name) => {
                    self.local_atom_levels.get(name).copied().unwrap_or(0)
                }
                ExprArg::Var(_) => 0,
                ExprArg::Nested(inner) => self.max_local_dep(inner),
            };
            max = max.max(level);
        }
        max
    }
}

/// Encode a resolved expression outside a batch (forward chaining
/// materializes conclusions through this). Interns atoms as needed.
pub fn encode_expr_vector(
    strategy: &mut dyn Strategy,
    vocab: &mut Vocabulary,
    expr: &Expr,
) -> Vector {
    let op_id = vocab.intern(strategy, &expr.op);
    let op_vec = vocab.vector(op_id).clone();
    let arg_part = if expr.args.is_empty() {
        let id = vocab.intern(strategy, EMPTY_BUNDLE);
        vocab.vector(id).clone()
    } else {
        let mut tagged = Vec::with_capacity(expr.args.len());
        for (i, arg) in expr.args.iter().enumerate() {
            let arg_vec = match arg {
                ExprArg::Atom(name) => {
                    let name = name.clone();
                    let id = vocab.intern(strategy, &name);
                    vocab.vector(id).clone()
                }
                ExprArg::Var(name) => {
                    let id = vocab.intern(strategy, &format!("?{}", name));
                    vocab.vector(id).clone()
                }
                ExprArg::Nested(inner) => encode_expr_vector(strategy, vocab, inner),
            };
            let pos_id = vocab.intern(strategy, &format!("Pos_{}", i + 1));
            let pos_vec = vocab.vector(pos_id).clone();
            tagged.push(strategy.bind(&pos_vec, &arg_vec));
        }
        strategy.bundle(&tagged)
    };
    strategy.bind(&op_vec, &arg_part)
}

/// Shared encoding primitive for the holographic engine: same rule as the
/// compiler, but positions are explicit so partial encodings skip holes.
pub fn encode_partial(
    strategy: &dyn Strategy,
    op_vec: &Vector,
    args: &[(usize, Vector)],
    pos_vectors: &dyn Fn(usize) -> Vector,
    empty_bundle: &Vector,
) -> Vector {
    let arg_part = if args.is_empty() {
        empty_bundle.clone()
    } else {
        let tagged: Vec<Vector> = args
            .iter()
            .map(|(k, v)| strategy.bind(&pos_vectors(*k), v))
            .collect();
        strategy.bundle(&tagged)
    };
    strategy.bind(op_vec, &arg_part)
}
