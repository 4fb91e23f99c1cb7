//! Sys2: a hyperdimensional-computing reasoning runtime.
//!
//! A session-scoped universe ingests Sys2DSL statements, compiles each
//! into a high-dimensional vector under a pluggable substrate, and
//! answers queries and proofs either by algebraic unbinding over those
//! vectors (holographic mode) or by symbolic traversal over an indexed
//! knowledge base (symbolic mode).
//!
//! ```
//! use sys2::{Session, SessionConfig};
//!
//! let mut session = Session::open(SessionConfig::default()).unwrap();
//! session.learn("loves John Mary");
//! let result = session.query("@q loves ?who Mary");
//! assert_eq!(result.all_results[0].bindings["who"], "John");
//! session.close();
//! ```

pub mod ast;
pub mod compiler;
pub mod describe;
pub mod error;
pub mod expr;
pub mod hdc;
pub mod kb;
pub mod lexer;
pub mod parser;
pub mod reason;
pub mod scope;
pub mod semantic;
pub mod session;
pub mod theory;
pub mod token;
pub mod vocab;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Arg, Dest, Directive, GraphDecl, Item, Statement, TheoryDecl};
pub use describe::Describe;
pub use error::{Contradiction, ContradictionReason, ParseError, Sys2Error, Warning};
pub use expr::{Expr, ExprArg};
pub use hdc::{
    check_contract, create_strategy, ContractReport, DecodedCandidate, Geometry, Strategy,
    StrategyId, Vector,
};
pub use kb::{Fact, FactId, KnowledgeBase, Rule};
pub use lexer::Lexer;
pub use reason::csp::{Constraint, CspResult, CspStats};
pub use reason::{Method, ProofStep, StepKind};
pub use session::{
    open_with, CspBuilder, LearnResult, Priority, ProveResult, QueryResult, Session,
    SessionConfig, SessionStats,
};
pub use vocab::{AtomId, TypeTag, Vocabulary};

/// Parse Sys2DSL source into top-level items without a session.
pub fn parse(source: &str) -> Result<Vec<Item>, ParseError> {
    parser::parse(source)
}
