//! # SCAD Parser
//!
//! Recursive descent parser producing the untyped SYN tree.
//!
//! ```text
//! body    := call*
//! call    := mod* (ident '(' args ')' | '{' body '}') tail
//! tail    := ';' | '{' body '}' | call
//! args    := ε | arg (',' arg)*
//! arg     := ident '=' value | value
//! value   := INT | FLOAT | STRING | IDENT | '[' range_or_array ']'
//! mod     := '*' | '%' | '!' | '#'
//! ```
//!
//! The parser stops at the first error; the error carries the offending
//! token's span.

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Token, TokenKind};
use crate::span::Span;
use crate::syn::{Modifiers, SynArg, SynNode, SynValue, SynValueKind};

// =============================================================================
// PARSER
// =============================================================================

/// Recursive descent parser over a token stream.
///
/// ## Example
///
/// ```rust
/// use scad_parser::lexer::Lexer;
/// use scad_parser::parser::Parser;
///
/// let src = "cube(10);";
/// let tokens = Lexer::new(src).tokenize().unwrap();
/// let body = Parser::new(src, &tokens).parse().unwrap();
/// assert_eq!(body.len(), 1);
/// ```
pub struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser. The token stream must end with an EOF token.
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Self { source, tokens, current: 0 }
    }

    /// Parse the whole token stream into a top-level body.
    pub fn parse(&mut self) -> Result<Vec<SynNode>, ParseError> {
        let body = self.parse_body()?;
        if !self.is_at_end() {
            return Err(ParseError::new(
                ParseErrorKind::TrailingInput,
                self.peek().span,
            ));
        }
        Ok(body)
    }

    // =========================================================================
    // TOKEN ACCESS
    // =========================================================================

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.current)
            .unwrap_or_else(|| self.tokens.last().expect("token stream has EOF"))
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = *self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    /// Consume the current token if it matches.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind` or fail with an expected/found error.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(kind.display()))
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        ParseError::new(
            ParseErrorKind::Expected {
                expected: what.to_string(),
                found: self.found_desc(),
            },
            self.peek().span,
        )
    }

    /// Human description of the current token for error messages.
    fn found_desc(&self) -> String {
        let token = self.peek();
        match token.kind {
            TokenKind::Int | TokenKind::Float | TokenKind::Ident => {
                format!("'{}'", token.text(self.source))
            }
            other => other.display().to_string(),
        }
    }

    // =========================================================================
    // GRAMMAR
    // =========================================================================

    fn looking_at_call(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Ident | TokenKind::Semicolon | TokenKind::LBrace
        ) || self.peek_kind().is_modifier()
    }

    fn parse_body(&mut self) -> Result<Vec<SynNode>, ParseError> {
        let mut body = Vec::new();
        while self.looking_at_call() {
            // A lone ';' is an empty statement.
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            body.push(self.parse_call()?);
        }
        Ok(body)
    }

    fn parse_call(&mut self) -> Result<SynNode, ParseError> {
        let mut node = if self.check(TokenKind::LBrace) {
            // Brace group; the brace itself is consumed by the tail below.
            SynNode {
                functor: "{".to_string(),
                modifiers: Modifiers::default(),
                args: Vec::new(),
                body: Vec::new(),
                span: self.peek().span,
            }
        } else {
            let modifiers = self.parse_modifiers();
            let functor = self.expect_ident("object or operator name")?;
            self.expect(TokenKind::LParen)?;
            let args = self.parse_args()?;
            self.expect(TokenKind::RParen)?;
            SynNode {
                functor: functor.0,
                modifiers,
                args,
                body: Vec::new(),
                span: functor.1,
            }
        };

        // tail := ';' | '{' body '}' | call
        if self.eat(TokenKind::Semicolon) {
            // no body
        } else if self.eat(TokenKind::LBrace) {
            node.body = self.parse_body()?;
            self.expect(TokenKind::RBrace)?;
        } else {
            node.body.push(self.parse_call()?);
        }
        Ok(node)
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            match self.peek_kind() {
                TokenKind::Star => modifiers.disable = true,
                TokenKind::Percent => modifiers.background = true,
                TokenKind::Bang => modifiers.root = true,
                TokenKind::Hash => modifiers.highlight = true,
                _ => return modifiers,
            }
            self.advance();
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        if !self.check(TokenKind::Ident) {
            return Err(self.expected(what));
        }
        let token = self.advance();
        Ok((token.text(self.source).to_string(), token.span))
    }

    fn looking_at_value(&self) -> bool {
        self.peek_kind().starts_value()
    }

    fn parse_args(&mut self) -> Result<Vec<SynArg>, ParseError> {
        let mut args = Vec::new();
        loop {
            if !self.looking_at_value() {
                return Ok(args);
            }
            args.push(self.parse_arg()?);
            if self.check(TokenKind::RParen) {
                return Ok(args);
            }
            self.expect(TokenKind::Comma)?;
        }
    }

    fn parse_arg(&mut self) -> Result<SynArg, ParseError> {
        if self.check(TokenKind::Ident) {
            let (name, span) = self.expect_ident("identifier")?;
            if self.eat(TokenKind::Eq) {
                let value = self.parse_value()?;
                return Ok(SynArg { key: Some(name), value });
            }
            // Bare identifier argument.
            return Ok(SynArg {
                key: None,
                value: SynValue { kind: SynValueKind::Ident(name), span },
            });
        }
        Ok(SynArg { key: None, value: self.parse_value()? })
    }

    fn parse_value(&mut self) -> Result<SynValue, ParseError> {
        match self.peek_kind() {
            TokenKind::Int => {
                let token = self.advance();
                let text = token.text(self.source);
                let value = text.parse::<i64>().map_err(|_| {
                    ParseError::new(
                        ParseErrorKind::InvalidNumber { text: text.to_string() },
                        token.span,
                    )
                })?;
                Ok(SynValue { kind: SynValueKind::Int(value), span: token.span })
            }
            TokenKind::Float => {
                let token = self.advance();
                let text = token.text(self.source);
                let value = text.parse::<f64>().map_err(|_| {
                    ParseError::new(
                        ParseErrorKind::InvalidNumber { text: text.to_string() },
                        token.span,
                    )
                })?;
                Ok(SynValue { kind: SynValueKind::Float(value), span: token.span })
            }
            TokenKind::Str => {
                let token = self.advance();
                Ok(SynValue {
                    kind: SynValueKind::Str(token.text(self.source).to_string()),
                    span: token.span,
                })
            }
            TokenKind::Ident => {
                let (name, span) = self.expect_ident("identifier")?;
                Ok(SynValue { kind: SynValueKind::Ident(name), span })
            }
            TokenKind::LBracket => self.parse_range_or_array(),
            _ => Err(ParseError::new(
                ParseErrorKind::ExpectedValue { found: self.found_desc() },
                self.peek().span,
            )),
        }
    }

    /// Either a range `[a:b]` / `[a:b:c]` or an array `[]`, `[a]`, `[a,b,...]`.
    ///
    /// Distinguishing the two needs one value of lookahead.
    fn parse_range_or_array(&mut self) -> Result<SynValue, ParseError> {
        let open = self.expect(TokenKind::LBracket)?;

        if self.check(TokenKind::RBracket) {
            let close = self.advance();
            return Ok(SynValue {
                kind: SynValueKind::Array(Vec::new()),
                span: open.span.merge(close.span),
            });
        }

        let first = self.parse_value()?;

        let kind = if self.eat(TokenKind::Colon) {
            // range
            let second = self.parse_value()?;
            if self.eat(TokenKind::Colon) {
                let end = self.parse_value()?;
                SynValueKind::Range {
                    start: Box::new(first),
                    inc: Some(Box::new(second)),
                    end: Box::new(end),
                }
            } else {
                SynValueKind::Range {
                    start: Box::new(first),
                    inc: None,
                    end: Box::new(second),
                }
            }
        } else {
            // array; a trailing comma is tolerated
            let mut items = vec![first];
            while self.eat(TokenKind::Comma) {
                if !self.looking_at_value() {
                    break;
                }
                items.push(self.parse_value()?);
            }
            SynValueKind::Array(items)
        };

        let close = self.expect(TokenKind::RBracket)?;
        Ok(SynValue { kind, span: open.span.merge(close.span) })
    }
}

// =============================================================================
// TESTS
// =============================================================================
