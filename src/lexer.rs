use crate::error::{ParseError, ParseErrorKind};
use crate::token::{Span, Token, TokenType};

/// Single-pass lexer for the Sys2DSL surface.
///
/// Byte-indexed scanning over UTF-8 input. Comments start with `#` and run
/// to end of line. Consecutive blank lines collapse into one `Newline`
/// token so the parser never sees empty statements.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: 0,
        }
    }

    /// Tokenize the whole input. Always ends with a single `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();

        while self.position < self.bytes.len() {
            let start = self.position;
            match self.bytes[self.position] {
                b' ' | b'\t' | b'\r' => {
                    self.position += 1;
                }
                b'#' => {
                    self.skip_to_eol();
                }
                b'\n' => {
                    self.position += 1;
                    // Collapse runs of newlines.
                    if !matches!(
                        tokens.last().map(|t| &t.ttype),
                        Some(TokenType::Newline) | None
                    ) {
                        tokens.push(Token::new(TokenType::Newline, Span::new(start, start + 1)));
                    }
                }
                b'(' => {
                    self.position += 1;
                    tokens.push(Token::new(TokenType::LParen, Span::new(start, start + 1)));
                }
                b')' => {
                    self.position += 1;
                    tokens.push(Token::new(TokenType::RParen, Span::new(start, start + 1)));
                }
                b'@' => {
                    tokens.push(self.lex_dest()?);
                }
                b'$' => {
                    self.position += 1;
                    let name = self.read_word();
                    if name.is_empty() {
                        return Err(ParseError::new(
                            ParseErrorKind::EmptySigil { sigil: '$' },
                            Span::new(start, self.position),
                        ));
                    }
                    tokens.push(Token::new(
                        TokenType::ScopeRef(name),
                        Span::new(start, self.position),
                    ));
                }
                b'?' => {
                    self.position += 1;
                    let name = self.read_word();
                    if name.is_empty() {
                        return Err(ParseError::new(
                            ParseErrorKind::EmptySigil { sigil: '?' },
                            Span::new(start, self.position),
                        ));
                    }
                    tokens.push(Token::new(
                        TokenType::Hole(name),
                        Span::new(start, self.position),
                    ));
                }
                b'"' => {
                    tokens.push(self.lex_string()?);
                }
                b'0'..=b'9' => {
                    let word = self.read_word();
                    match word.parse::<u64>() {
                        Ok(n) => tokens.push(Token::new(
                            TokenType::Number(n),
                            Span::new(start, self.position),
                        )),
                        // Mixed alphanumerics like `3rd` lex as identifiers.
                        Err(_) => tokens.push(Token::new(
                            TokenType::Ident(word),
                            Span::new(start, self.position),
                        )),
                    }
                }
                c if c.is_ascii_alphabetic() || c == b'_' => {
                    let word = self.read_word();
                    let ttype = match word.as_str() {
                        "graph" => TokenType::KwGraph,
                        "return" => TokenType::KwReturn,
                        "end" => TokenType::KwEnd,
                        "theory" => TokenType::KwTheory,
                        _ => TokenType::Ident(word),
                    };
                    tokens.push(Token::new(ttype, Span::new(start, self.position)));
                }
                other => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedCharacter { found: other as char },
                        Span::new(start, start + 1),
                    ));
                }
            }
        }

        // Trailing newline keeps the statement-per-line invariant simple.
        if !matches!(tokens.last().map(|t| &t.ttype), Some(TokenType::Newline) | None) {
            let end = self.bytes.len();
            tokens.push(Token::new(TokenType::Newline, Span::new(end, end)));
        }
        let end = self.bytes.len();
        tokens.push(Token::new(TokenType::Eof, Span::new(end, end)));
        Ok(tokens)
    }

    /// `@var`, `@var:export`, or `@_`.
    fn lex_dest(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        self.position += 1; // consume '@'
        let var = self.read_word();
        if var.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::EmptySigil { sigil: '@' },
                Span::new(start, self.position),
            ));
        }
        let export = if self.peek() == Some(b':') {
            self.position += 1;
            let name = self.read_word();
            if name.is_empty() {
                return Err(ParseError::new(
                    ParseErrorKind::EmptyExportName,
                    Span::new(start, self.position),
                ));
            }
            Some(name)
        } else {
            None
        };
        Ok(Token::new(
            TokenType::Dest { var, export },
            Span::new(start, self.position),
        ))
    }

    fn lex_string(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        self.position += 1; // opening quote
        let content_start = self.position;
        while self.position < self.bytes.len() {
            match self.bytes[self.position] {
                b'"' => {
                    let text = self.source[content_start..self.position].to_string();
                    self.position += 1;
                    return Ok(Token::new(
                        TokenType::Str(text),
                        Span::new(start, self.position),
                    ));
                }
                b'\n' => break,
                _ => self.position += 1,
            }
        }
        Err(ParseError::new(
            ParseErrorKind::UnterminatedString,
            Span::new(start, self.position),
        ))
    }

    fn read_word(&mut self) -> String {
        let start = self.position;
        while self.position < self.bytes.len() {
            let c = self.bytes[self.position];
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.position += 1;
            } else {
                break;
            }
        }
        self.source[start..self.position].to_string()
    }

    fn skip_to_eol(&mut self) {
        while self.position < self.bytes.len() && self.bytes[self.position] != b'\n' {
            self.position += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenType> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.ttype)
            .collect()
    }

    #[test]
    fn plain_statement() {
        let toks = lex("loves John Mary");
        assert_eq!(
            toks,
            vec![
                TokenType::Ident("loves".into()),
                TokenType::Ident("John".into()),
                TokenType::Ident("Mary".into()),
                TokenType::Newline,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn dest_with_export() {
        let toks = lex("@r:mortality Implies $c $k");
        assert_eq!(
            toks[0],
            TokenType::Dest {
                var: "r".into(),
                export: Some("mortality".into())
            }
        );
        assert_eq!(toks[2], TokenType::ScopeRef("c".into()));
    }

    #[test]
    fn directive_dest() {
        let toks = lex("@_ Load \"core/base.sys2\"");
        assert_eq!(
            toks[0],
            TokenType::Dest {
                var: "_".into(),
                export: None
            }
        );
        assert_eq!(toks[2], TokenType::Str("core/base.sys2".into()));
    }

    #[test]
    fn holes_and_nesting() {
        let toks = lex("query believes John (loves ?who Mary)");
        assert!(toks.contains(&TokenType::LParen));
        assert!(toks.contains(&TokenType::Hole("who".into())));
        assert!(toks.contains(&TokenType::RParen));
    }

    #[test]
    fn comments_are_skipped() {
        let toks = lex("isA Rex Dog # Rex is a dog\n# full line comment\nisA Dog Mammal");
        let idents: Vec<_> = toks
            .iter()
            .filter(|t| matches!(t, TokenType::Ident(_)))
            .collect();
        assert_eq!(idents.len(), 6);
    }

    #[test]
    fn blank_lines_collapse() {
        let toks = lex("isA Rex Dog\n\n\nisA Dog Mammal");
        let newlines = toks
            .iter()
            .filter(|t| matches!(t, TokenType::Newline))
            .count();
        assert_eq!(newlines, 2);
    }

    #[test]
    fn keywords_recognized() {
        let toks = lex("@Pair graph a b\nreturn $a\nend");
        assert!(toks.contains(&TokenType::KwGraph));
        assert!(toks.contains(&TokenType::KwReturn));
        assert!(toks.contains(&TokenType::KwEnd));
    }

    #[test]
    fn theory_header() {
        let toks = lex("@Family theory 2048 dense_binary");
        assert!(toks.contains(&TokenType::KwTheory));
        assert!(toks.contains(&TokenType::Number(2048)));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(Lexer::new("@_ Load \"oops").tokenize().is_err());
    }

    #[test]
    fn bare_sigil_is_an_error() {
        assert!(Lexer::new("loves $ Mary").tokenize().is_err());
    }

    #[test]
    fn spans_index_into_source() {
        let src = "loves John Mary";
        let toks = Lexer::new(src).tokenize().unwrap();
        assert_eq!(&src[toks[1].span.start..toks[1].span.end], "John");
    }
}
