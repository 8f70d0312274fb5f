//! # SCAD Lexer
//!
//! Tokenizes SCAD source into span-handle tokens over the retained buffer.
//! No text is copied out of the buffer.
//!
//! Two multi-character tokens may not directly abut: `9.9foo` is a lex
//! error at `foo`.
//!
//! ## Example
//!
//! ```rust
//! use scad_parser::lexer::{Lexer, TokenKind};
//!
//! let tokens = Lexer::new("cube(10);").tokenize().unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Ident);
//! ```

mod cursor;
mod token;

pub use cursor::Cursor;
pub use token::{Token, TokenKind};

use crate::error::{ParseError, ParseErrorKind};
use crate::span::Span;

// =============================================================================
// LEXER
// =============================================================================

/// SCAD lexer. Converts source text into a token stream, stopping at the
/// first error.
pub struct Lexer<'a> {
    source: &'a str,
    cursor: Cursor<'a>,
    tokens: Vec<Token>,
    /// End offset of the last number/identifier token, for the adjacency rule.
    glued_end: Option<usize>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over a source buffer.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: Cursor::new(source),
            tokens: Vec::new(),
            glued_end: None,
        }
    }

    /// Tokenize the entire source, appending a final EOF token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            self.skip_whitespace_and_comments()?;
            if self.cursor.is_eof() {
                break;
            }
            self.scan_token()?;
        }
        let eof = self.cursor.pos();
        self.tokens.push(Token::new(TokenKind::Eof, Span::at(eof)));
        Ok(self.tokens)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            self.cursor.advance_while(|b| b.is_ascii_whitespace());

            if self.cursor.peek() == Some(b'/') && self.cursor.peek_next() == Some(b'/') {
                self.cursor.advance_while(|b| b != b'\n');
                continue;
            }

            if self.cursor.peek() == Some(b'/') && self.cursor.peek_next() == Some(b'*') {
                let start = self.cursor.pos();
                self.cursor.advance();
                self.cursor.advance();
                let mut prev = 0u8;
                loop {
                    match self.cursor.advance() {
                        None => {
                            return Err(ParseError::new(
                                ParseErrorKind::UnterminatedComment,
                                Span::new(start, start + 2),
                            ));
                        }
                        Some(b'/') if prev == b'*' => break,
                        Some(b) => prev = b,
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    fn scan_token(&mut self) -> Result<(), ParseError> {
        let start = self.cursor.pos();
        let b = match self.cursor.peek() {
            Some(b) => b,
            None => return Ok(()),
        };

        // Adjacency rule: a number, identifier or string may not start
        // exactly where the previous number/identifier ended.
        if self.glued_end == Some(start) {
            let kind = match b {
                b'+' | b'-' | b'.' | b'0'..=b'9' => Some(ParseErrorKind::AdjacentNumber),
                b'$' | b'_' => Some(ParseErrorKind::AdjacentIdent),
                b'"' => Some(ParseErrorKind::AdjacentString),
                _ if b.is_ascii_alphabetic() => Some(ParseErrorKind::AdjacentIdent),
                _ => None,
            };
            if let Some(kind) = kind {
                return Err(ParseError::new(kind, Span::at(start)));
            }
        }
        self.glued_end = None;

        match b {
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.scan_number(),
            b'$' | b'_' => self.scan_ident(start),
            _ if b.is_ascii_alphabetic() => self.scan_ident(start),
            b'"' => self.scan_string(start),
            _ => self.scan_punct(start, b),
        }
    }

    fn scan_number(&mut self) -> Result<(), ParseError> {
        // A leading '+' is dropped from the token text.
        if self.cursor.peek() == Some(b'+') {
            self.cursor.advance();
        }
        let start = self.cursor.pos();
        let mut kind = TokenKind::Int;
        let mut has_digits = false;

        if self.cursor.peek() == Some(b'-') {
            self.cursor.advance();
        }
        while matches!(self.cursor.peek(), Some(b'0'..=b'9')) {
            self.cursor.advance();
            has_digits = true;
        }
        if self.cursor.peek() == Some(b'.') {
            kind = TokenKind::Float;
            self.cursor.advance();
            while matches!(self.cursor.peek(), Some(b'0'..=b'9')) {
                self.cursor.advance();
                has_digits = true;
            }
        }
        if matches!(self.cursor.peek(), Some(b'e') | Some(b'E')) && has_digits {
            kind = TokenKind::Float;
            self.cursor.advance();
            if matches!(self.cursor.peek(), Some(b'+') | Some(b'-')) {
                self.cursor.advance();
            }
            while matches!(self.cursor.peek(), Some(b'0'..=b'9')) {
                self.cursor.advance();
            }
        }

        let span = Span::new(start, self.cursor.pos());
        if !has_digits {
            return Err(ParseError::new(
                ParseErrorKind::InvalidNumber { text: self.source[start..self.cursor.pos()].to_string() },
                span,
            ));
        }
        self.glued_end = Some(span.end());
        self.tokens.push(Token::new(kind, span));
        Ok(())
    }

    fn scan_ident(&mut self, start: usize) -> Result<(), ParseError> {
        if self.cursor.peek() == Some(b'$') {
            self.cursor.advance();
        }
        self.cursor
            .advance_while(|b| b.is_ascii_alphanumeric() || b == b'_');

        let span = Span::new(start, self.cursor.pos());
        self.glued_end = Some(span.end());
        self.tokens.push(Token::new(TokenKind::Ident, span));
        Ok(())
    }

    fn scan_string(&mut self, start: usize) -> Result<(), ParseError> {
        self.cursor.advance(); // opening quote
        let content = self.cursor.pos();
        loop {
            match self.cursor.advance() {
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedString,
                        Span::at(start),
                    ));
                }
                Some(b'"') => break,
                Some(b'\\') => {
                    if self.cursor.advance().is_none() {
                        return Err(ParseError::new(
                            ParseErrorKind::UnterminatedString,
                            Span::at(start),
                        ));
                    }
                }
                Some(_) => {}
            }
        }
        // The span covers the content between the quotes.
        let span = Span::new(content, self.cursor.pos() - 1);
        self.tokens.push(Token::new(TokenKind::Str, span));
        Ok(())
    }

    fn scan_punct(&mut self, start: usize, b: u8) -> Result<(), ParseError> {
        let kind = match b {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'=' => TokenKind::Eq,
            b':' => TokenKind::Colon,
            b'*' => TokenKind::Star,
            b'%' => TokenKind::Percent,
            b'!' => TokenKind::Bang,
            b'#' => TokenKind::Hash,
            _ => {
                let byte = self.source[start..].chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedByte { byte },
                    Span::new(start, start + byte.len_utf8()),
                ));
            }
        };
        self.cursor.advance();
        self.tokens.push(Token::new(kind, Span::new(start, start + 1)));
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
