//! Token definitions

use logos::Logos;

/// Lexical error kinds produced by the token callbacks
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexError {
    /// No token pattern matched
    #[default]
    UnexpectedCharacter,
    /// Numeric text that does not parse as a number
    InvalidNumber,
    /// Backslash followed by an unknown escape character
    InvalidEscape(char),
    /// End of input inside a string literal
    UnterminatedString,
}

/// Expression token
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
#[logos(error = LexError)]
pub enum Token {
    // Literals
    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]*)([eE][+-]?[0-9]*)?", |lex| {
        lex.slice().parse::<f64>().map_err(|_| LexError::InvalidNumber)
    })]
    Number(f64),

    #[token("\"", |lex| lex_string(lex, '"'))]
    #[token("'", |lex| lex_string(lex, '\''))]
    Str(String),

    #[regex(r"[\p{L}_][\p{L}\p{Nd}_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Statement separators
    #[token(";")]
    #[token("\n")]
    #[token("\r")]
    #[token("\r\n")]
    EndOfStatement,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,

    // Ternary
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    // Assignment and comparison
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    // Logical
    #[token("!")]
    Bang,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
}

/// Scan a string literal after its opening quote
fn lex_string(lex: &mut logos::Lexer<Token>, quote: char) -> Result<String, LexError> {
    let mut result = String::new();
    let mut chars = lex.remainder().char_indices();

    while let Some((offset, c)) = chars.next() {
        if c == quote {
            lex.bump(offset + c.len_utf8());
            return Ok(result);
        }
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some((_, '\\')) => result.push('\\'),
            Some((_, '\'')) => result.push('\''),
            Some((_, '"')) => result.push('"'),
            Some((_, 'r')) => result.push('\r'),
            Some((_, 'n')) => result.push('\n'),
            Some((_, 't')) => result.push('\t'),
            Some((escape_offset, other)) => {
                lex.bump(escape_offset + other.len_utf8());
                return Err(LexError::InvalidEscape(other));
            }
            None => break,
        }
    }

    lex.bump(lex.remainder().len());
    Err(LexError::UnterminatedString)
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Ident(s) => write!(f, "{s}"),
            Token::EndOfStatement => write!(f, "end of statement"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::Eq => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::Bang => write!(f, "!"),
            Token::AmpAmp => write!(f, "&&"),
            Token::PipePipe => write!(f, "||"),
        }
    }
}
