//! First-order unification over reasoning expressions.
//!
//! Robinson-style with an occurs check. Substitutions map variable names
//! to expression arguments; a `BTreeMap` keeps rendering and signature
//! generation deterministic. Both sides may contain variables — stored
//! facts with variables act as universals and unify like any pattern.

use std::collections::BTreeMap;

use crate::expr::{Expr, ExprArg};

/// Variable name → bound argument.
pub type Bindings = BTreeMap<String, ExprArg>;

/// Unify two expressions under an existing substitution, extending it in
/// place on success. On failure the bindings are left untouched.
pub fn unify_exprs(left: &Expr, right: &Expr, bindings: &mut Bindings) -> bool {
    if left.op != right.op || left.args.len() != right.args.len() {
        return false;
    }
    let snapshot = bindings.clone();
    for (l, r) in left.args.iter().zip(&right.args) {
        if !unify_args(l, r, bindings) {
            *bindings = snapshot;
            return false;
        }
    }
    true
}

/// Unify a pair of arguments under the substitution.
pub fn unify_args(left: &ExprArg, right: &ExprArg, bindings: &mut Bindings) -> bool {
    let left = resolve(left, bindings);
    let right = resolve(right, bindings);
    match (&left, &right) {
        (ExprArg::Var(l), ExprArg::Var(r)) if l == r => true,
        (ExprArg::Var(name), other) | (other, ExprArg::Var(name)) => {
            bind(name, other, bindings)
        }
        (ExprArg::Atom(l), ExprArg::Atom(r)) => l == r,
        (ExprArg::Nested(l), ExprArg::Nested(r)) => unify_exprs(l, r, bindings),
        _ => false,
    }
}

/// Walk a variable to its current binding, one level at a time.
fn resolve(arg: &ExprArg, bindings: &Bindings) -> ExprArg {
    let mut current = arg.clone();
    // Chains are short; the bound walk guards against accidental cycles.
    for _ in 0..bindings.len() + 1 {
        match &current {
            ExprArg::Var(name) => match bindings.get(name) {
                Some(next) => current = next.clone(),
                None => break,
            },
            _ => break,
        }
    }
    current
}

/// Bind `name` to `value`, refusing bindings that contain the variable
/// itself (occurs check).
fn bind(name: &str, value: &ExprArg, bindings: &mut Bindings) -> bool {
    if occurs(name, value, bindings) {
        return false;
    }
    bindings.insert(name.to_string(), value.clone());
    true
}

fn occurs(name: &str, value: &ExprArg, bindings: &Bindings) -> bool {
    match value {
        ExprArg::Var(v) => {
            if v == name {
                return true;
            }
            match bindings.get(v) {
                Some(next) => occurs(name, next, bindings),
                None => false,
            }
        }
        ExprArg::Atom(_) => false,
        ExprArg::Nested(inner) => inner
            .args
            .iter()
            .any(|arg| occurs(name, arg, bindings)),
    }
}

/// Apply a substitution to an expression, leaving unbound variables in
/// place.
pub fn apply_bindings(expr: &Expr, bindings: &Bindings) -> Expr {
    Expr {
        op: expr.op.clone(),
        args: expr.args.iter().map(|a| apply_arg(a, bindings)).collect(),
    }
}

fn apply_arg(arg: &ExprArg, bindings: &Bindings) -> ExprArg {
    match arg {
        ExprArg::Var(name) => match bindings.get(name) {
            Some(bound) => apply_arg(&bound.clone(), bindings),
            None => arg.clone(),
        },
        ExprArg::Atom(_) => arg.clone(),
        ExprArg::Nested(inner) => ExprArg::Nested(Box::new(apply_bindings(inner, bindings))),
    }
}

/// Rename every variable in an expression with a suffix; rule variables
/// are freshened per application so they never collide with query holes.
pub fn freshen(expr: &Expr, suffix: &str) -> Expr {
    Expr {
        op: expr.op.clone(),
        args: expr
            .args
            .iter()
            .map(|a| freshen_arg(a, suffix))
            .collect(),
    }
}

fn freshen_arg(arg: &ExprArg, suffix: &str) -> ExprArg {
    match arg {
        ExprArg::Var(name) => ExprArg::Var(format!("{}{}", name, suffix)),
        ExprArg::Atom(_) => arg.clone(),
        ExprArg::Nested(inner) => ExprArg::Nested(Box::new(freshen(inner, suffix))),
    }
}
