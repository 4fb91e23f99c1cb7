//! Recursive-descent parser for the Sys2DSL surface.
//!
//! One statement per line; `graph` and `theory` blocks span lines and are
//! closed by `end`. The parser works over the full token stream with a
//! single token of lookahead and never backtracks.


use crate::ast::{Arg, Dest, Directive, GraphDecl, Item, Statement, TheoryDecl};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenType};

pub(crate) type ParseResult<T> = Result<T, ParseError>;

/// Parse a full Sys2DSL source text into top-level items.
pub fn parse(source: &str) -> ParseResult<Vec<Item>> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_items(false)
}

/// Parse a single statement (query/prove/find_all input).
///
/// Rejects trailing content so callers cannot silently drop a second line.
pub fn parse_statement(source: &str) -> ParseResult<Statement> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.skip_newlines();
    let stmt = parser.parse_statement_line()?;
    parser.skip_newlines();
    if !parser.at(&TokenType::Eof) {
        return Err(ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: "end of input",
                found: parser.peek().ttype.describe().to_string(),
            },
            parser.peek().span,
        ));
    }
    Ok(stmt)
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse items until EOF, or until `end` when `inside_block` is set.
    fn parse_items(&mut self, inside_block: bool) -> ParseResult<Vec<Item>> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(&TokenType::Eof) {
                if inside_block {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedBlock { block: "theory" },
                        self.peek().span,
                    ));
                }
                return Ok(items);
            }
            if inside_block && self.at(&TokenType::KwEnd) {
                return Ok(items);
            }
            items.push(self.parse_item()?);
        }
    }

    fn parse_item(&mut self) -> ParseResult<Item> {
        if let TokenType::Dest { var, export } = &self.peek().ttype {
            let var = var.clone();
            let export = export.clone();
            // Destination followed by a block keyword opens a declaration.
            match self.peek_ahead(1).map(|t| &t.ttype) {
                Some(TokenType::KwGraph) => {
                    return self.parse_graph(var, export).map(Item::Graph);
                }
                Some(TokenType::KwTheory) => {
                    return self.parse_theory(var).map(Item::Theory);
                }
                _ => {}
            }
            if var == "_" {
                return self.parse_directive().map(Item::Directive);
            }
        }
        self.parse_statement_line().map(Item::Statement)
    }

    /// `[@dest[:export]] OPERATOR arg1 … argN <newline>`
    fn parse_statement_line(&mut self) -> ParseResult<Statement> {
        let start_span = self.peek().span;
        let dest = match &self.peek().ttype {
            TokenType::Dest { var, export } => {
                let d = Dest {
                    var: var.clone(),
                    export: export.clone(),
                };
                self.advance();
                Some(d)
            }
            _ => None,
        };

        let operator = match &self.peek().ttype {
            TokenType::Ident(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingOperator,
                    self.peek().span,
                ));
            }
        };

        let mut args = Vec::new();
        loop {
            match &self.peek().ttype {
                TokenType::Newline | TokenType::Eof => break,
                _ => args.push(self.parse_arg()?),
            }
        }
        let end_span = self
            .tokens
            .get(self.current.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or(start_span);

        Ok(Statement {
            dest,
            operator,
            args,
            span: start_span.merge(end_span),
        })
    }

    fn parse_arg(&mut self) -> ParseResult<Arg> {
        let token = self.peek().clone();
        match token.ttype {
            TokenType::Ident(name) => {
                self.advance();
                Ok(Arg::Ident(name))
            }
            TokenType::ScopeRef(name) => {
                self.advance();
                Ok(Arg::ScopeRef(name))
            }
            TokenType::Hole(name) => {
                self.advance();
                Ok(Arg::Hole(name))
            }
            TokenType::Number(n) => {
                self.advance();
                Ok(Arg::Number(n))
            }
            TokenType::LParen => self.parse_nested(),
            _ => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected: "argument",
                    found: token.ttype.describe().to_string(),
                },
                token.span,
            )),
        }
    }

    /// `( OPERATOR arg1 … argN )` — nested statements carry no destination
    /// and must close on the same line.
    fn parse_nested(&mut self) -> ParseResult<Arg> {
        let open = self.peek().span;
        self.advance(); // '('

        let operator = match &self.peek().ttype {
            TokenType::Ident(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingOperator,
                    self.peek().span,
                ));
            }
        };

        let mut args = Vec::new();
        loop {
            match &self.peek().ttype {
                TokenType::RParen => {
                    let close = self.peek().span;
                    self.advance();
                    return Ok(Arg::Nested(Box::new(Statement {
                        dest: None,
                        operator,
                        args,
                        span: open.merge(close),
                    })));
                }
                TokenType::Newline | TokenType::Eof => {
                    return Err(ParseError::new(ParseErrorKind::UnclosedParen, open));
                }
                _ => args.push(self.parse_arg()?),
            }
        }
    }

    /// `@Name[:alias] graph p1 … pK <body> return <arg> end`
    fn parse_graph(&mut self, name: String, alias: Option<String>) -> ParseResult<GraphDecl> {
        let start = self.peek().span;
        self.advance(); // dest
        self.advance(); // 'graph'

        let mut params = Vec::new();
        loop {
            match &self.peek().ttype {
                TokenType::Ident(p) => {
                    params.push(p.clone());
                    self.advance();
                }
                TokenType::Newline => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken {
                            expected: "graph parameter",
                            found: self.peek().ttype.describe().to_string(),
                        },
                        self.peek().span,
                    ));
                }
            }
        }

        let mut body = Vec::new();
        let ret;
        loop {
            self.skip_newlines();
            match &self.peek().ttype {
                TokenType::KwReturn => {
                    self.advance();
                    ret = self.parse_arg()?;
                    break;
                }
                TokenType::Eof | TokenType::KwEnd => {
                    return Err(ParseError::new(
                        ParseErrorKind::MissingReturn { graph: name },
                        self.peek().span,
                    ));
                }
                _ => body.push(self.parse_statement_line()?),
            }
        }

        self.skip_newlines();
        let end_span = self.expect_end("graph")?;
        Ok(GraphDecl {
            name,
            alias,
            params,
            body,
            ret,
            span: start.merge(end_span),
        })
    }

    /// `@Name theory [<geometry>] [<strategy>] <items> end`
    fn parse_theory(&mut self, name: String) -> ParseResult<TheoryDecl> {
        let start = self.peek().span;
        self.advance(); // dest
        self.advance(); // 'theory'

        let geometry = match &self.peek().ttype {
            TokenType::Number(n) => {
                let n = *n;
                self.advance();
                Some(n)
            }
            _ => None,
        };
        let strategy = match &self.peek().ttype {
            TokenType::Ident(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        };

        let body = self.parse_items(true)?;
        let end_span = self.expect_end("theory")?;
        Ok(TheoryDecl {
            name,
            geometry,
            strategy,
            body,
            span: start.merge(end_span),
        })
    }

    /// `@_ Load "<path>"` | `@_ Unload "<theory>"` | `@_ Export $var`
    fn parse_directive(&mut self) -> ParseResult<Directive> {
        self.advance(); // '@_'
        let token = self.peek().clone();
        let name = match token.ttype {
            TokenType::Ident(name) => {
                self.advance();
                name
            }
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingOperator,
                    token.span,
                ));
            }
        };

        let directive = match name.as_str() {
            "Load" => match self.peek().ttype.clone() {
                TokenType::Str(path) => {
                    self.advance();
                    Directive::Load(path)
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::MalformedDirective {
                            name: "Load",
                            expected: "a quoted path",
                        },
                        self.peek().span,
                    ));
                }
            },
            "Unload" => match self.peek().ttype.clone() {
                TokenType::Str(theory) => {
                    self.advance();
                    Directive::Unload(theory)
                }
                TokenType::Ident(theory) => {
                    self.advance();
                    Directive::Unload(theory)
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::MalformedDirective {
                            name: "Unload",
                            expected: "a theory name",
                        },
                        self.peek().span,
                    ));
                }
            },
            "Export" => match self.peek().ttype.clone() {
                TokenType::ScopeRef(var) => {
                    self.advance();
                    Directive::Export(var)
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::MalformedDirective {
                            name: "Export",
                            expected: "a $var scope reference",
                        },
                        self.peek().span,
                    ));
                }
            },
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownDirective { name },
                    token.span,
                ));
            }
        };
        Ok(directive)
    }

    fn expect_end(&mut self, block: &'static str) -> ParseResult<Span> {
        self.skip_newlines();
        if self.at(&TokenType::KwEnd) {
            let span = self.peek().span;
            self.advance();
            Ok(span)
        } else {
            Err(ParseError::new(
                ParseErrorKind::UnterminatedBlock { block },
                self.peek().span,
            ))
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenType::Newline) {
            self.advance();
        }
    }

    fn at(&self, ttype: &TokenType) -> bool {
        &self.peek().ttype == ttype
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.current + n)
    }

    fn advance(&mut self) {
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
    }
}
