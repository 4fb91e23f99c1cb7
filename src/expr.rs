//! Reasoning-side expressions.
//!
//! Surface statements (`ast::Statement`) resolve into `Expr` trees once
//! scope references are substituted and names are canonicalized. Rules
//! keep their condition and conclusion in this form; queries and proof
//! goals are compiled into it as well. Owned and `Box`-free at the top
//! level so bindings and results can outlive any borrow of the session.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprArg {
    /// A canonical atom name.
    Atom(String),
    /// A free variable (`?x` in rules and queries).
    Var(String),
    /// A nested expression.
    Nested(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr {
    pub op: String,
    pub args: Vec<ExprArg>,
}

impl Expr {
    pub fn new(op: impl Into<String>, args: Vec<ExprArg>) -> Self {
        Self {
            op: op.into(),
            args,
        }
    }

    /// Ground expression over plain atom names.
    pub fn ground(op: impl Into<String>, atoms: &[&str]) -> Self {
        Self {
            op: op.into(),
            args: atoms.iter().map(|a| ExprArg::Atom(a.to_string())).collect(),
        }
    }

    /// Free variables in first-occurrence order, deduplicated.
    pub fn vars(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<String>) {
        for arg in &self.args {
            match arg {
                ExprArg::Var(name) => {
                    if !out.iter().any(|v| v == name) {
                        out.push(name.clone());
                    }
                }
                ExprArg::Nested(inner) => inner.collect_vars(out),
                ExprArg::Atom(_) => {}
            }
        }
    }

    pub fn is_ground(&self) -> bool {
        self.vars().is_empty()
    }

    /// Conjunctive premises: an `And` splits into its nested conjuncts,
    /// anything else is a single premise.
    pub fn premises(&self) -> Vec<Expr> {
        if self.op == "And" {
            self.args
                .iter()
                .filter_map(|arg| match arg {
                    ExprArg::Nested(inner) => Some((**inner).clone()),
                    // A bare atom inside And is a zero-arity premise.
                    ExprArg::Atom(name) => Some(Expr::new(name.clone(), Vec::new())),
                    ExprArg::Var(_) => None,
                })
                .collect()
        } else {
            vec![self.clone()]
        }
    }

    /// Canonical signature used for deduplication and idempotence checks.
    pub fn signature(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExprArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprArg::Atom(name) => write!(f, "{}", name),
            ExprArg::Var(name) => write!(f, "?{}", name),
            ExprArg::Nested(inner) => write!(f, "({})", inner),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_expr_has_no_vars() {
        let e = Expr::ground("loves", &["John", "Mary"]);
        assert!(e.is_ground());
        assert_eq!(e.to_string(), "loves John Mary");
    }

    #[test]
    fn vars_in_first_occurrence_order() {
        let e = Expr::new(
            "rel",
            vec![
                ExprArg::Var("y".into()),
                ExprArg::Nested(Box::new(Expr::new(
                    "inner",
                    vec![ExprArg::Var("x".into()), ExprArg::Var("y".into())],
                ))),
            ],
        );
        assert_eq!(e.vars(), vec!["y".to_string(), "x".to_string()]);
    }

    #[test]
    fn and_splits_into_premises() {
        let a = Expr::ground("isA", &["x", "Human"]);
        let b = Expr::ground("hasProperty", &["x", "Wise"]);
        let conj = Expr::new(
            "And",
            vec![
                ExprArg::Nested(Box::new(a.clone())),
                ExprArg::Nested(Box::new(b.clone())),
            ],
        );
        assert_eq!(conj.premises(), vec![a, b]);
    }

    #[test]
    fn non_and_is_a_single_premise() {
        let e = Expr::ground("isA", &["Rex", "Dog"]);
        assert_eq!(e.premises(), vec![e.clone()]);
    }

    #[test]
    fn signatures_distinguish_argument_order() {
        let xy = Expr::ground("loves", &["X", "Y"]);
        let yx = Expr::ground("loves", &["Y", "X"]);
        assert_ne!(xy.signature(), yx.signature());
    }
}
