//! Fact store and indices.
//!
//! Facts are immutable once inserted; ids are session-monotonic and double
//! as positions in the store. Every index keeps its postings in id order
//! so iteration is deterministic across runs.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::expr::{Expr, ExprArg};
use crate::hdc::Vector;
use crate::token::Span;
use crate::vocab::AtomId;

pub type FactId = u64;

/// Reserved operator that turns a fact into a rule.
pub const IMPLIES: &str = "Implies";

#[derive(Debug, Clone, PartialEq)]
pub enum FactArg {
    Atom { id: AtomId, name: String },
    /// Ground nested statement, kept structurally.
    Expr(Expr),
}

impl FactArg {
    fn to_expr_arg(&self) -> ExprArg {
        match self {
            FactArg::Atom { name, .. } => ExprArg::Atom(name.clone()),
            FactArg::Expr(e) => ExprArg::Nested(Box::new(e.clone())),
        }
    }
}

/// Provenance carried for proofs and rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactMeta {
    /// Operator as written, before canonical rewriting.
    pub surface_operator: String,
    pub surface_args: Vec<String>,
    pub span: Option<Span>,
    /// Set when the surface form was rewritten through the canonical index.
    pub rewritten: bool,
}

#[derive(Debug, Clone)]
pub struct Fact {
    pub id: FactId,
    /// Canonical operator name.
    pub operator: String,
    pub operator_atom: AtomId,
    pub args: Vec<FactArg>,
    pub vector: Vector,
    /// Constructivist level: 1 + max level of dependencies.
    pub level: u32,
    /// Present for `@var:name` exports.
    pub anchor: Option<String>,
    pub meta: FactMeta,
}

impl Fact {
    pub fn to_expr(&self) -> Expr {
        Expr {
            op: self.operator.clone(),
            args: self.args.iter().map(FactArg::to_expr_arg).collect(),
        }
    }

    /// Canonical signature for deduplication.
    pub fn signature(&self) -> String {
        self.to_expr().signature()
    }

    /// Atom name at an argument position, if that position holds an atom.
    pub fn atom_name(&self, position: usize) -> Option<&str> {
        match self.args.get(position) {
            Some(FactArg::Atom { name, .. }) => Some(name),
            _ => None,
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// A fact whose operator is `Implies`, decomposed for the rule engine.
#[derive(Debug, Clone)]
pub struct Rule {
    pub fact_id: FactId,
    pub condition: Expr,
    pub conclusion: Expr,
    /// Free variables across condition and conclusion, first-seen order.
    pub vars: Vec<String>,
    pub conclusion_op: String,
    pub has_vars: bool,
    /// Static level bounds from ground dependencies; necessary, not
    /// sufficient — precise levels exist only after unification.
    pub conclusion_level: u32,
    pub max_premise_level: u32,
}

impl Rule {
    pub fn premises(&self) -> Vec<Expr> {
        self.condition.premises()
    }
}

#[derive(Default)]
pub struct KnowledgeBase {
    facts: Vec<Fact>,
    by_operator: HashMap<String, Vec<FactId>>,
    by_component: HashMap<String, Vec<FactId>>,
    by_level: BTreeMap<u32, Vec<FactId>>,
    signatures: HashSet<String>,
    rules: Vec<Rule>,
    rules_by_conclusion: HashMap<String, Vec<usize>>,
    anchors: HashMap<String, FactId>,
    /// Levels of atoms that name exported facts; unlisted atoms are
    /// primitive (level 0).
    atom_levels: HashMap<String, u32>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_fact_id(&self) -> FactId {
        self.facts.len() as FactId
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id as usize)
    }

    pub fn contains_signature(&self, signature: &str) -> bool {
        self.signatures.contains(signature)
    }

    pub fn anchor(&self, name: &str) -> Option<FactId> {
        self.anchors.get(name).copied()
    }

    /// Level of an atom: exported facts give their anchor atom the fact's
    /// level; everything else is primitive.
    pub fn atom_level(&self, name: &str) -> u32 {
        self.atom_levels.get(name).copied().unwrap_or(0)
    }

    /// Constructivist level a fact with these dependencies would get.
    /// Variables bound later count as level-0 dependencies.
    pub fn level_for(&self, expr: &Expr) -> u32 {
        1 + self.max_dep_level(expr)
    }

    fn max_dep_level(&self, expr: &Expr) -> u32 {
        let mut max = self.atom_level(&expr.op);
        for arg in &expr.args {
            let level = match arg {
                ExprArg::Atom(name) => self.atom_level(name),
                ExprArg::Var(_) => 0,
                ExprArg::Nested(inner) => self.max_dep_level(inner),
            };
            max = max.max(level);
        }
        max
    }

    /// Insert a compiled fact. The caller assigns the id via
    /// [`KnowledgeBase::next_fact_id`]; insertion must keep ids dense.
    pub fn insert(&mut self, fact: Fact) {
        debug_assert_eq!(fact.id, self.next_fact_id());
        self.signatures.insert(fact.signature());
        self.by_operator
            .entry(fact.operator.clone())
            .or_default()
            .push(fact.id);
        for name in component_names(&fact) {
            self.by_component.entry(name).or_default().push(fact.id);
        }
        self.by_level.entry(fact.level).or_default().push(fact.id);
        if let Some(anchor) = &fact.anchor {
            self.anchors.entry(anchor.clone()).or_insert(fact.id);
            self.atom_levels
                .entry(anchor.clone())
                .or_insert(fact.level);
        }
        tracing::debug!(id = fact.id, fact = %fact.signature(), level = fact.level, "kb insert");
        self.facts.push(fact);
    }

    pub fn insert_rule(&mut self, rule: Rule) {
        let index = self.rules.len();
        self.rules_by_conclusion
            .entry(rule.conclusion_op.clone())
            .or_default()
            .push(index);
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rules_for_conclusion(&self, op: &str) -> Vec<&Rule> {
        self.rules_by_conclusion
            .get(op)
            .map(|indices| indices.iter().map(|&i| &self.rules[i]).collect())
            .unwrap_or_default()
    }

    /// Facts under one operator, id-ascending.
    pub fn facts_with_operator<'a>(&'a self, op: &str) -> impl Iterator<Item = &'a Fact> {
        self.by_operator
            .get(op)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.fact(id))
    }

    /// Facts mentioning an atom at any position, id-ascending.
    pub fn facts_with_component<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Fact> {
        self.by_component
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.fact(id))
    }

    pub fn facts_at_level<'a>(&'a self, level: u32) -> impl Iterator<Item = &'a Fact> {
        self.by_level
            .get(&level)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.fact(id))
    }

    pub fn levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_level.keys().copied()
    }
}

/// Atom names a fact touches: operator plus every atom argument, nested
/// expressions included.
fn component_names(fact: &Fact) -> Vec<String> {
    let mut out = vec![fact.operator.clone()];
    for arg in &fact.args {
        match arg {
            FactArg::Atom { name, .. } => push_unique(&mut out, name),
            FactArg::Expr(e) => collect_expr_atoms(e, &mut out),
        }
    }
    out
}

fn collect_expr_atoms(expr: &Expr, out: &mut Vec<String>) {
    push_unique(out, &expr.op);
    for arg in &expr.args {
        match arg {
            ExprArg::Atom(name) => push_unique(out, name),
            ExprArg::Nested(inner) => collect_expr_atoms(inner, out),
            ExprArg::Var(_) => {}
        }
    }
}

fn push_unique(out: &mut Vec<String>, name: &str) {
    if !out.iter().any(|n| n == name) {
        out.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdc::{create_strategy, Geometry, Strategy, StrategyId};
    use crate::vocab::Vocabulary;

    fn make_fact(
        kb: &KnowledgeBase,
        vocab: &mut Vocabulary,
        strat: &mut dyn Strategy,
        op: &str,
        args: &[&str],
    ) -> Fact {
        let operator_atom = vocab.intern(strat, op);
        let fact_args = args
            .iter()
            .map(|a| FactArg::Atom {
                id: vocab.intern(strat, a),
                name: a.to_string(),
            })
            .collect();
        Fact {
            id: kb.next_fact_id(),
            operator: op.to_string(),
            operator_atom,
            args: fact_args,
            vector: strat.create_zero(),
            level: 1,
            anchor: None,
            meta: FactMeta::default(),
        }
    }

    fn setup() -> (KnowledgeBase, Vocabulary, Box<dyn Strategy>) {
        (
            KnowledgeBase::new(),
            Vocabulary::new(),
            create_strategy(StrategyId::Exact, Geometry::new(0)),
        )
    }

    #[test]
    fn ids_are_dense_and_monotonic() {
        let (mut kb, mut vocab, mut strat) = setup();
        for i in 0..3 {
            let fact = make_fact(&kb, &mut vocab, strat.as_mut(), "isA", &["X", &format!("T{}", i)]);
            assert_eq!(fact.id, i as FactId);
            kb.insert(fact);
        }
        assert_eq!(kb.len(), 3);
    }

    #[test]
    fn operator_index_iterates_in_id_order() {
        let (mut kb, mut vocab, mut strat) = setup();
        let f1 = make_fact(&kb, &mut vocab, strat.as_mut(), "loves", &["A", "B"]);
        kb.insert(f1);
        let f2 = make_fact(&kb, &mut vocab, strat.as_mut(), "isA", &["A", "Person"]);
        kb.insert(f2);
        let f3 = make_fact(&kb, &mut vocab, strat.as_mut(), "loves", &["C", "D"]);
        kb.insert(f3);
        let ids: Vec<FactId> = kb.facts_with_operator("loves").map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn component_index_covers_all_positions() {
        let (mut kb, mut vocab, mut strat) = setup();
        let fact = make_fact(&kb, &mut vocab, strat.as_mut(), "loves", &["John", "Mary"]);
        kb.insert(fact);
        assert_eq!(kb.facts_with_component("John").count(), 1);
        assert_eq!(kb.facts_with_component("Mary").count(), 1);
        assert_eq!(kb.facts_with_component("loves").count(), 1);
        assert_eq!(kb.facts_with_component("Bob").count(), 0);
    }

    #[test]
    fn signatures_deduplicate() {
        let (mut kb, mut vocab, mut strat) = setup();
        let fact = make_fact(&kb, &mut vocab, strat.as_mut(), "loves", &["John", "Mary"]);
        let sig = fact.signature();
        kb.insert(fact);
        assert!(kb.contains_signature(&sig));
        assert!(!kb.contains_signature("loves Mary John"));
    }

    #[test]
    fn anchored_fact_raises_atom_level() {
        let (mut kb, mut vocab, mut strat) = setup();
        let mut fact = make_fact(&kb, &mut vocab, strat.as_mut(), "loves", &["John", "Mary"]);
        fact.anchor = Some("romance".to_string());
        fact.level = 1;
        kb.insert(fact);
        assert_eq!(kb.atom_level("romance"), 1);
        assert_eq!(kb.atom_level("John"), 0);
        // A fact depending on the anchor lands one level higher.
        let expr = Expr::ground("about", &["romance", "Book"]);
        assert_eq!(kb.level_for(&expr), 2);
    }

    #[test]
    fn rule_index_by_conclusion_operator() {
        let (mut kb, _vocab, _strat) = setup();
        kb.insert_rule(Rule {
            fact_id: 0,
            condition: Expr::ground("isA", &["?x", "Human"]),
            conclusion: Expr::new(
                "isA",
                vec![
                    ExprArg::Var("x".into()),
                    ExprArg::Atom("Mortal".into()),
                ],
            ),
            vars: vec!["x".into()],
            conclusion_op: "isA".into(),
            has_vars: true,
            conclusion_level: 1,
            max_premise_level: 1,
        });
        assert_eq!(kb.rules_for_conclusion("isA").len(), 1);
        assert!(kb.rules_for_conclusion("loves").is_empty());
    }

    #[test]
    fn level_index_partitions_facts() {
        let (mut kb, mut vocab, mut strat) = setup();
        let mut f1 = make_fact(&kb, &mut vocab, strat.as_mut(), "isA", &["A", "B"]);
        f1.level = 1;
        kb.insert(f1);
        let mut f2 = make_fact(&kb, &mut vocab, strat.as_mut(), "about", &["r", "B"]);
        f2.level = 2;
        kb.insert(f2);
        assert_eq!(kb.facts_at_level(1).count(), 1);
        assert_eq!(kb.facts_at_level(2).count(), 1);
        assert_eq!(kb.levels().collect::<Vec<_>>(), vec![1, 2]);
    }
}
