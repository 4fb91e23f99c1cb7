//! Owned AST for the Sys2DSL surface.
//!
//! The shapes here are the contract between the parser and the statement
//! compiler: `Statement { dest?, operator, args[], export? }` where each
//! arg is an atom reference, a scope variable, a hole, or a nested
//! statement. Trees are owned (`Box`, `String`) so compiled facts and
//! reasoning results can outlive the parse.

use std::fmt;

use crate::token::Span;

/// A top-level parsed unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Statement(Statement),
    Graph(GraphDecl),
    Theory(TheoryDecl),
    Directive(Directive),
}

/// `@var` / `@var:export` destination prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Dest {
    pub var: String,
    /// Present for `@var:name`: also insert a KB fact anchored as `name`.
    pub export: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub dest: Option<Dest>,
    pub operator: String,
    pub args: Vec<Arg>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Bare identifier, resolved as an atom by name.
    Ident(String),
    /// `$var` scope reference.
    ScopeRef(String),
    /// `?hole` query hole.
    Hole(String),
    /// Numeric literal; interned as an atom with the literal's text as name.
    Number(u64),
    /// Parenthesized nested statement.
    Nested(Box<Statement>),
}

/// `@Name[:alias] graph p1 … pK … return $expr end`
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDecl {
    pub name: String,
    pub alias: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub ret: Arg,
    pub span: Span,
}

/// `@Name theory <geometry> <init-strategy> … end`
#[derive(Debug, Clone, PartialEq)]
pub struct TheoryDecl {
    pub name: String,
    pub geometry: Option<u64>,
    pub strategy: Option<String>,
    pub body: Vec<Item>,
    pub span: Span,
}

/// Top-level `@_` directives.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `@_ Load "<path>"`
    Load(String),
    /// `@_ Unload "<theory>"`
    Unload(String),
    /// `@_ Export $var`
    Export(String),
}

impl Statement {
    /// Hole names in argument order, depth-first through nesting.
    pub fn holes(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_holes(&mut out);
        out
    }

    fn collect_holes(&self, out: &mut Vec<String>) {
        for arg in &self.args {
            match arg {
                Arg::Hole(name) => {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
                Arg::Nested(inner) => inner.collect_holes(out),
                _ => {}
            }
        }
    }

    pub fn has_holes(&self) -> bool {
        !self.holes().is_empty()
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Ident(name) => write!(f, "{}", name),
            Arg::ScopeRef(name) => write!(f, "${}", name),
            Arg::Hole(name) => write!(f, "?{}", name),
            Arg::Number(n) => write!(f, "{}", n),
            Arg::Nested(stmt) => write!(f, "({})", stmt),
        }
    }
}

impl fmt::Display for Statement {
    /// Canonical rendering: operator + arguments, destinations elided.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operator)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(op: &str, args: Vec<Arg>) -> Statement {
        Statement {
            dest: None,
            operator: op.into(),
            args,
            span: Span::default(),
        }
    }

    #[test]
    fn display_renders_canonical_form() {
        let s = stmt(
            "loves",
            vec![Arg::Ident("John".into()), Arg::Ident("Mary".into())],
        );
        assert_eq!(s.to_string(), "loves John Mary");
    }

    #[test]
    fn display_parenthesizes_nested() {
        let inner = stmt(
            "loves",
            vec![Arg::Ident("Mary".into()), Arg::Ident("Bob".into())],
        );
        let outer = stmt(
            "believes",
            vec![Arg::Ident("John".into()), Arg::Nested(Box::new(inner))],
        );
        assert_eq!(outer.to_string(), "believes John (loves Mary Bob)");
    }

    #[test]
    fn holes_are_ordered_and_deduplicated() {
        let inner = stmt("knows", vec![Arg::Hole("x".into()), Arg::Hole("y".into())]);
        let s = stmt(
            "and",
            vec![Arg::Hole("x".into()), Arg::Nested(Box::new(inner))],
        );
        assert_eq!(s.holes(), vec!["x".to_string(), "y".to_string()]);
    }
}
