#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both operands.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Token kinds for the Sys2DSL surface syntax.
///
/// One statement per line; `(` `)` nest statements inside a line.
/// Sigils: `@dest[:export]` routes a result, `$var` reads the scope,
/// `?hole` marks a query hole.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    /// Bare identifier: an operator or atom name.
    Ident(String),

    /// `$var` — reference to a scope entry.
    ScopeRef(String),

    /// `?hole` — a query hole to be bound by the engine.
    Hole(String),

    /// `@var` or `@var:name` — destination prefix. `@_` is the
    /// directive destination.
    Dest { var: String, export: Option<String> },

    /// Double-quoted string literal (used by `Load` paths).
    Str(String),

    /// Unsigned integer literal (geometry in theory headers, numeric atoms).
    Number(u64),

    LParen,
    RParen,

    KwGraph,
    KwReturn,
    KwEnd,
    KwTheory,

    /// Statement boundary.
    Newline,
    Eof,
}

impl TokenType {
    /// Human-readable label for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenType::Ident(_) => "identifier",
            TokenType::ScopeRef(_) => "scope reference",
            TokenType::Hole(_) => "query hole",
            TokenType::Dest { .. } => "destination",
            TokenType::Str(_) => "string literal",
            TokenType::Number(_) => "number",
            TokenType::LParen => "'('",
            TokenType::RParen => "')'",
            TokenType::KwGraph => "'graph'",
            TokenType::KwReturn => "'return'",
            TokenType::KwEnd => "'end'",
            TokenType::KwTheory => "'theory'",
            TokenType::Newline => "end of line",
            TokenType::Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ttype: TokenType,
    pub span: Span,
}

impl Token {
    pub fn new(ttype: TokenType, span: Span) -> Self {
        Self { ttype, span }
    }
}
