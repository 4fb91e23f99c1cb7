use std::fmt;

use crate::token::Span;

// ============================================================================
// Parse errors
// ============================================================================

#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ParseErrorKind {
    /// A character the lexer has no rule for.
    UnexpectedCharacter { found: char },

    /// A sigil (`@`, `$`, `?`) with no identifier after it.
    EmptySigil { sigil: char },

    /// `@var:` with nothing after the colon.
    EmptyExportName,

    /// String literal ran to end of line without a closing quote.
    UnterminatedString,

    /// The parser wanted one kind of token and found another.
    UnexpectedToken { expected: &'static str, found: String },

    /// A statement with no operator (e.g. a bare `@x` line).
    MissingOperator,

    /// Nested statements must close on the same line.
    UnclosedParen,

    /// `graph` or `theory` block without a matching `end`.
    UnterminatedBlock { block: &'static str },

    /// `graph` body missing its final `return`.
    MissingReturn { graph: String },

    /// A directive (`@_ ...`) with an operator the runtime does not know.
    UnknownDirective { name: String },

    /// A directive with the wrong argument shape.
    MalformedDirective { name: &'static str, expected: &'static str },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Render the error with the offending source line and a caret underline.
    pub fn display_with_source(&self, source: &str) -> String {
        let (line_num, line_start, line_content) = self.find_context(source);
        let col = self.span.start.saturating_sub(line_start);
        let len = (self.span.end - self.span.start).max(1).min(line_content.len().saturating_sub(col).max(1));
        let underline = format!("{}{}", " ".repeat(col), "^".repeat(len));
        format!(
            "error: {}\n{:4} | {}\n     | {}",
            self, line_num, line_content, underline
        )
    }

    fn find_context<'a>(&self, source: &'a str) -> (usize, usize, &'a str) {
        let mut line_num = 1;
        let mut line_start = 0;
        for (i, c) in source.char_indices() {
            if i >= self.span.start {
                break;
            }
            if c == '\n' {
                line_num += 1;
                line_start = i + 1;
            }
        }
        let line_end = source[line_start..]
            .find('\n')
            .map(|off| line_start + off)
            .unwrap_or(source.len());
        (line_num, line_start, &source[line_start..line_end])
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::UnexpectedCharacter { found } => {
                write!(f, "unexpected character '{}'", found)
            }
            ParseErrorKind::EmptySigil { sigil } => {
                write!(f, "'{}' must be followed by a name", sigil)
            }
            ParseErrorKind::EmptyExportName => write!(f, "export name after ':' is empty"),
            ParseErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            ParseErrorKind::UnexpectedToken { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ParseErrorKind::MissingOperator => write!(f, "statement has no operator"),
            ParseErrorKind::UnclosedParen => write!(f, "nested statement is missing ')'"),
            ParseErrorKind::UnterminatedBlock { block } => {
                write!(f, "{} block is missing 'end'", block)
            }
            ParseErrorKind::MissingReturn { graph } => {
                write!(f, "graph '{}' has no 'return' statement", graph)
            }
            ParseErrorKind::UnknownDirective { name } => {
                write!(f, "unknown directive '{}'", name)
            }
            ParseErrorKind::MalformedDirective { name, expected } => {
                write!(f, "directive '{}' expects {}", name, expected)
            }
        }
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Runtime errors
// ============================================================================

/// A contradiction found by the detector during `learn`.
///
/// Carries enough structure for the phrasing layer to render the conflict
/// without inspecting engine internals.
#[derive(Debug, Clone, PartialEq)]
pub struct Contradiction {
    /// The statement the batch tried to add, rendered canonically.
    pub attempted: String,
    /// The committed (or earlier-in-batch) statement it conflicts with.
    pub existing: String,
    /// Which constraint was violated.
    pub reason: ContradictionReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContradictionReason {
    /// Two values from a declared mutually-exclusive set on the same subject.
    MutuallyExclusive { operator: String, values: Vec<String> },
    /// Declared operator pair that cannot hold over the same arguments.
    ContradictsSameArgs { operator: String, other: String },
    /// The conflict only appears after expanding a declared transitive chain.
    DerivedTransitive { operator: String },
    /// The conflict comes from a property inherited through an isA chain.
    DerivedInherited { property: String, ancestor: String },
}

impl fmt::Display for Contradiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match &self.reason {
            ContradictionReason::MutuallyExclusive { operator, values } => {
                format!("'{}' values {{{}}} are mutually exclusive", operator, values.join(", "))
            }
            ContradictionReason::ContradictsSameArgs { operator, other } => {
                format!("'{}' contradicts '{}' over the same arguments", operator, other)
            }
            ContradictionReason::DerivedTransitive { operator } => {
                format!("contradiction derived through transitive '{}'", operator)
            }
            ContradictionReason::DerivedInherited { property, ancestor } => {
                format!("property '{}' inherited from '{}' conflicts", property, ancestor)
            }
        };
        write!(
            f,
            "cannot assert '{}': conflicts with '{}' ({})",
            self.attempted, self.existing, why
        )
    }
}

/// Errors reported by session operations.
///
/// Reasoning-time "failures" (unprovable goals, exhausted depth, CSP
/// timeouts) are result fields, not errors; see the result types in
/// `session`.
#[derive(Debug)]
pub enum Sys2Error {
    /// Surfaced verbatim from the parser.
    Parse(ParseError),

    /// A `$var` reference with no binding in the current scope.
    UndefinedVariable { name: String, span: Span },

    /// Statement arity exceeds the session's `max_arity`.
    ArityOverflow { operator: String, arity: usize, max_arity: usize },

    /// Invocation of a graph name that is not in the graph table.
    UnknownGraph { name: String, span: Span },

    /// A learn batch violated a theory constraint; the batch was rolled back.
    ContradictionRejected(Contradiction),

    /// Theory file could not be read.
    TheoryIo { path: String, detail: String },

    /// The session was asked for an operation after `close`.
    SessionClosed,

    /// Invariant breakage that should never surface in normal operation.
    Internal(String),
}

impl fmt::Display for Sys2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sys2Error::Parse(e) => write!(f, "parse error: {}", e),
            Sys2Error::UndefinedVariable { name, .. } => {
                write!(f, "undefined variable '${}'", name)
            }
            Sys2Error::ArityOverflow { operator, arity, max_arity } => write!(
                f,
                "operator '{}' has {} arguments; the session maximum is {}",
                operator, arity, max_arity
            ),
            Sys2Error::UnknownGraph { name, .. } => write!(f, "unknown graph '{}'", name),
            Sys2Error::ContradictionRejected(c) => write!(f, "contradiction: {}", c),
            Sys2Error::TheoryIo { path, detail } => {
                write!(f, "cannot load theory '{}': {}", path, detail)
            }
            Sys2Error::SessionClosed => write!(f, "session is closed"),
            Sys2Error::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Sys2Error {}

impl From<ParseError> for Sys2Error {
    fn from(e: ParseError) -> Self {
        Sys2Error::Parse(e)
    }
}

// ============================================================================
// Warnings
// ============================================================================

/// Non-fatal conditions attached to results.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Bundle size is at or past the strategy's soft capacity cap.
    Capacity { strategy: &'static str, bundled: usize, soft_cap: usize },

    /// Backward chaining gave up at the depth limit; results may be partial.
    DepthExceeded { limit: usize },

    /// CSP search hit its wall-time cap; solutions may be partial.
    Timeout { elapsed_ms: u64 },

    /// Holographic decoding produced no candidate above threshold.
    NoDecodeCandidates { hole: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Capacity { strategy, bundled, soft_cap } => write!(
                f,
                "{} bundle holds {} items (soft cap {}); similarity margins degrade",
                strategy, bundled, soft_cap
            ),
            Warning::DepthExceeded { limit } => {
                write!(f, "proof search stopped at depth {}", limit)
            }
            Warning::Timeout { elapsed_ms } => {
                write!(f, "constraint search timed out after {}ms", elapsed_ms)
            }
            Warning::NoDecodeCandidates { hole } => {
                write!(f, "no decode candidate for hole '?{}'", hole)
            }
        }
    }
}
