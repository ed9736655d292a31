//! Recursive-descent parser
//!
//! Precedence, lowest to highest:
//!
//! ```text
//! assignment   name = expr            (right-associative)
//! ternary      cond ? a : b
//! or           ||
//! and          &&
//! relational   < <= > >=
//! equality     == !=
//! additive     + -
//! multiplicative * /
//! unary        + - !                  (prefix, right-recursive)
//! postfix      x ^ y, x[i]            (chainable)
//! leaf
//! ```

use crate::ast::{BinaryOp, Node, Span, TernaryOp, UnaryOp};
use crate::error::{EngineError, Result};
use crate::interp::Value;
use crate::lexer::{Lexer, Token};


/// Stack growth parameters for deeply nested input
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Parse a source string into its statement list
///
/// Statement separators produce empty statements; those are dropped unless
/// the very last statement is empty.
pub fn parse(source: &str) -> Result<Vec<Node>> {
    Parser::new(source)?.parse_statements()
}

/// Parse a source string that must hold exactly one statement
pub fn parse_single(source: &str) -> Result<Node> {
    let mut statements = parse(source)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(EngineError::new(format!(
            "expected exactly one statement, found {n}"
        ))),
    }
}

/// Parser over a lazy token stream with one token of lookahead
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Option<(Token, Span)>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next().transpose()?;
        Ok(Self { lexer, current })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> Option<&Token> {
        self.current.as_ref().map(|(token, _)| token)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next().transpose()?;
        Ok(())
    }

    /// Consume `token` or fail with `message`
    fn expect(&mut self, token: &Token, message: &str) -> Result<()> {
        if !self.at(token) {
            return Err(self.error(message));
        }
        self.advance()
    }

    fn span(&self) -> Span {
        match &self.current {
            Some((_, span)) => *span,
            None => Span::point(self.lexer.source().len()),
        }
    }

    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::at(message, self.span())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn parse_statements(&mut self) -> Result<Vec<Node>> {
        let mut statements = Vec::new();
        loop {
            while self.at(&Token::EndOfStatement) {
                statements.push(Node::Empty);
                self.advance()?;
            }
            if self.current.is_none() {
                break;
            }

            statements.push(self.parse_assignment()?);

            match self.peek() {
                None => break,
                Some(Token::EndOfStatement) => continue,
                Some(_) => return Err(self.error("Unexpected characters at end of expression")),
            }
        }

        let last = statements.len().saturating_sub(1);
        Ok(statements
            .into_iter()
            .enumerate()
            .filter(|(i, node)| *node != Node::Empty || *i == last)
            .map(|(_, node)| node)
            .collect())
    }

    fn parse_assignment(&mut self) -> Result<Node> {
        let mut targets = Vec::new();
        let mut value = self.parse_ternary()?;

        while self.at(&Token::Eq) {
            let Node::Variable(name) = value else {
                return Err(self.error("Cannot assign value to non variable node"));
            };
            targets.push(name);
            self.advance()?;
            value = self.parse_ternary()?;
        }

        Ok(targets
            .into_iter()
            .rev()
            .fold(value, |value, name| Node::assignment(name, value)))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn parse_ternary(&mut self) -> Result<Node> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.parse_ternary_inner())
    }

    fn parse_ternary_inner(&mut self) -> Result<Node> {
        let mut cond = self.parse_or()?;
        while self.at(&Token::Question) {
            self.advance()?;
            let then_branch = self.parse_or()?;
            self.expect(&Token::Colon, "missing ternary else operator")?;
            let else_branch = self.parse_or()?;
            cond = Node::ternary(TernaryOp::Select, cond, then_branch, else_branch);
        }
        Ok(cond)
    }

    /// Left-associative binary tier
    fn parse_binary(
        &mut self,
        next: fn(&mut Self) -> Result<Node>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Node> {
        let mut left = next(self)?;
        while let Some(op) = self.peek().and_then(operator) {
            self.advance()?;
            let right = next(self)?;
            left = Node::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_and, |token| match token {
            Token::PipePipe => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_relational, |token| match token {
            Token::AmpAmp => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_equality, |token| match token {
            Token::Lt => Some(BinaryOp::Lt),
            Token::LtEq => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::GtEq => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_additive, |token| match token {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Node> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> Result<Node> {
        while self.at(&Token::Plus) {
            self.advance()?;
        }
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Node::unary(op, operand))
    }

    /// Exponentiation and element access
    fn parse_postfix(&mut self) -> Result<Node> {
        let mut node = self.parse_leaf()?;
        loop {
            match self.peek() {
                Some(Token::LBracket) => {
                    self.advance()?;
                    let index = self.parse_ternary()?;
                    self.expect(&Token::RBracket, "Missing close bracket")?;
                    node = Node::binary(BinaryOp::Index, node, index);
                }
                Some(Token::Caret) => {
                    self.advance()?;
                    let exponent = self.parse_unary()?;
                    node = Node::binary(BinaryOp::Pow, node, exponent);
                }
                _ => return Ok(node),
            }
        }
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    fn parse_leaf(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let node = Node::Literal(Value::Number(*n));
                self.advance()?;
                Ok(node)
            }
            Some(Token::Str(s)) => {
                let node = Node::Literal(Value::Text(s.clone()));
                self.advance()?;
                Ok(node)
            }
            Some(Token::LParen) => {
                self.advance()?;
                let node = self.parse_ternary()?;
                self.expect(&Token::RParen, "Missing close parenthesis")?;
                Ok(node)
            }
            Some(Token::LBracket) => self.parse_array(),
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance()?;
                self.parse_identifier(name)
            }
            Some(token) => Err(self.error(format!("Unexpected token: {token}"))),
            None => Err(self.error("Unexpected token: end of file")),
        }
    }

    fn parse_array(&mut self) -> Result<Node> {
        self.advance()?;
        let mut elements = Vec::new();
        if !self.at(&Token::RBracket) {
            loop {
                elements.push(self.parse_ternary()?);
                if !self.at(&Token::Comma) {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(&Token::RBracket, "Missing close bracket")?;
        Ok(Node::Array(elements))
    }

    /// Call, element access, boolean literal, or variable
    fn parse_identifier(&mut self, name: String) -> Result<Node> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance()?;
                let mut args = Vec::new();
                while !self.at(&Token::RParen) {
                    args.push(self.parse_ternary()?);
                    if !self.at(&Token::Comma) {
                        break;
                    }
                    self.advance()?;
                }
                self.expect(&Token::RParen, "Missing close parenthesis")?;
                Ok(Node::Call { name, args })
            }
            Some(Token::LBracket) => {
                self.advance()?;
                let index = self.parse_ternary()?;
                self.expect(&Token::RBracket, "Missing close bracket")?;
                Ok(Node::binary(BinaryOp::Index, Node::Variable(name), index))
            }
            _ => Ok(match name.as_str() {
                "true" => Node::Literal(Value::Bool(true)),
                "false" => Node::Literal(Value::Bool(false)),
                _ => Node::Variable(name),
            }),
        }
    }
}
