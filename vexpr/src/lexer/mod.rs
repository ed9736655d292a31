//! Lexer implementation using logos

mod token;

pub use token::{LexError, Token};

use crate::ast::Span;
use crate::error::{EngineError, Result};
use logos::Logos;

/// Lazy token stream over a source string
///
/// Yields `(Token, Span)` pairs; the exhausted iterator is end of input.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, Token>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: Token::lexer(source),
        }
    }

    pub fn source(&self) -> &'src str {
        self.inner.source()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<(Token, Span)>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.inner.next()?;
        let span = Span::from(self.inner.span());
        Some(match result {
            Ok(token) => Ok((token, span)),
            Err(kind) => Err(lex_error(kind, self.inner.slice(), span)),
        })
    }
}

fn lex_error(kind: LexError, slice: &str, span: Span) -> EngineError {
    let message = match kind {
        LexError::InvalidNumber => format!("could not parse number: '{slice}'"),
        LexError::InvalidEscape(c) => format!("Undefined escape sequence '\\{c}'"),
        LexError::UnterminatedString => "Unterminated string constant".to_string(),
        LexError::UnexpectedCharacter => match slice.chars().next() {
            Some(c @ ('|' | '&')) => format!("unexpected character after '{c}' sign"),
            Some(c) => format!("unexpected character '{c}'"),
            None => "unexpected end of input".to_string(),
        },
    };
    EngineError::at(message, span)
}

/// Tokenize source code
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    Lexer::new(source).collect()
}
