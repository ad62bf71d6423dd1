//! Parser for the filter condition language.
//!
//! ```text
//! condition := or
//! or        := and ("or" and)*
//! and       := cmp ("and" cmp)*
//! cmp       := "(" condition ")" | chain (op literal)?
//! chain     := ("(" kind ")")? ("x" ".")? step* ("as" kind)?
//! ```
//!
//! Any `and`/`or` produces a [`LogicalSpec`]; the parser accepts it so the
//! canonical text can be reported, the compiler refuses it.
//!
//! Chains read the same as in [`crate::selector`]: `x` alone is the element,
//! identifiers may contain `-`, and keywords are field names after a `.`
//! (`x.null`, `meta.as`). Two differences remain. A chain cannot start with
//! a bare keyword, since `null` or `true` there is a literal. An unterminated
//! `[` is a parse error here rather than a trailing field hop.

use std::mem;

use thiserror::Error;

use crate::{
    ast::{AccessStep, CompareOp, Condition, LogicalOp, LogicalSpec, Token, ValueChain},
    lexer::{LexError, Lexer, Position},
    value::{Value, ValueKind},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected}, got {found:?} at {position}")]
    UnexpectedToken {
        expected: &'static str,
        found: Token,
        position: Position,
    },

    #[error("unknown type name '{name}' at {position}")]
    UnknownKind { name: String, position: Position },

    #[error("empty selector")]
    Empty,
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    position: Position,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let position = lexer.position();
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            position,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.position = self.lexer.position();
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.current_token.clone(),
            position: self.position,
        }
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(what));
        }
        self.advance()
    }

    /// Looks `n` tokens past the current one without consuming anything.
    fn peek_token(&self, n: usize) -> Result<Token, ParseError> {
        let mut lexer = self.lexer.clone();
        let mut token = self.current_token.clone();
        for _ in 0..n {
            token = lexer.next_token()?;
        }
        Ok(token)
    }

    fn parse_kind(&mut self) -> Result<ValueKind, ParseError> {
        match &self.current_token {
            Token::Identifier(name) | Token::String(name) => {
                let kind = name.parse::<ValueKind>().map_err(|_| ParseError::UnknownKind {
                    name: name.clone(),
                    position: self.position,
                })?;
                self.advance()?;
                Ok(kind)
            }
            Token::Null => {
                self.advance()?;
                Ok(ValueKind::Null)
            }
            _ => Err(self.unexpected("type name")),
        }
    }

    /// `(kind)` immediately followed by something that can start a chain.
    fn at_arg_cast(&self) -> Result<bool, ParseError> {
        if !self.check(&Token::LParen) {
            return Ok(false);
        }
        let is_kind = matches!(
            self.peek_token(1)?,
            Token::Identifier(ref name) if name.parse::<ValueKind>().is_ok()
        );
        Ok(is_kind
            && self.peek_token(2)? == Token::RParen
            && matches!(self.peek_token(3)?, Token::Identifier(_) | Token::LBracket))
    }

    /// Parse a value chain: `(object)x.items[0]['key'] as int`
    pub fn parse_chain(&mut self) -> Result<ValueChain, ParseError> {
        let mut chain = ValueChain::default();

        if self.at_arg_cast()? {
            self.advance()?; // consume '('
            chain.arg_cast = Some(self.parse_kind()?);
            self.expect(Token::RParen, "')'")?;
        }

        // `x` is the element itself; a keyword after `x.` names a field.
        let mut first = None;
        if matches!(&self.current_token, Token::Identifier(name) if name == "x") {
            self.advance()?;
            if self.check(&Token::Dot) {
                self.advance()?;
                let name = field_name(&self.current_token)
                    .ok_or_else(|| self.unexpected("field name after '.'"))?;
                first = Some(name);
            }
        } else if let Token::Identifier(name) = &self.current_token {
            first = Some(name.clone());
        } else if !self.check(&Token::LBracket) {
            return Err(self.unexpected("field name"));
        }
        if let Some(name) = first {
            self.advance()?;
            chain.steps.push(AccessStep::Field(name));
        }

        loop {
            if self.check(&Token::Dot) {
                self.advance()?;
                let name = field_name(&self.current_token)
                    .ok_or_else(|| self.unexpected("field name after '.'"))?;
                self.advance()?;
                chain.steps.push(AccessStep::Field(name));
            } else if self.check(&Token::LBracket) {
                self.advance()?;
                let step = match mem::replace(&mut self.current_token, Token::Eof) {
                    Token::Integer(n) => AccessStep::Index(n),
                    Token::String(key) | Token::Identifier(key) => AccessStep::Key(key),
                    token => {
                        self.current_token = token;
                        return Err(self.unexpected("index or key"));
                    }
                };
                self.advance()?;
                self.expect(Token::RBracket, "']'")?;
                chain.steps.push(step);
            } else {
                break;
            }
        }

        if self.check(&Token::As) {
            self.advance()?;
            chain.out_cast = Some(self.parse_kind()?);
        }

        Ok(chain)
    }

    fn parse_literal(&mut self) -> Result<Value, ParseError> {
        let value = match &self.current_token {
            Token::Integer(n) => Value::Integer(*n),
            Token::Float(n) => Value::Float(*n),
            Token::String(s) => Value::String(s.clone()),
            Token::Boolean(b) => Value::Boolean(*b),
            Token::Null => Value::Null,
            _ => return Err(self.unexpected("literal")),
        };
        self.advance()?;
        Ok(value)
    }

    fn parse_comparison(&mut self) -> Result<Condition, ParseError> {
        if self.check(&Token::LParen) && !self.at_arg_cast()? {
            self.advance()?;
            let inner = self.parse_or()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(inner);
        }

        let chain = self.parse_chain()?;

        let op = match &self.current_token {
            Token::EqEq => CompareOp::Equal,
            Token::NotEq => CompareOp::NotEqual,
            Token::Lt => CompareOp::LessThan,
            Token::Gt => CompareOp::GreaterThan,
            Token::LtEq => CompareOp::LessEqual,
            Token::GtEq => CompareOp::GreaterEqual,
            Token::Match => CompareOp::Matches,
            _ => return Ok(Condition::Chain(chain)),
        };
        self.advance()?;

        if op == CompareOp::Matches && !matches!(self.current_token, Token::String(_)) {
            return Err(self.unexpected("pattern string"));
        }
        let literal = self.parse_literal()?;

        Ok(Condition::Compare { chain, op, literal })
    }

    fn parse_logical(
        &mut self,
        op: LogicalOp,
        token: Token,
        next: fn(&mut Self) -> Result<Condition, ParseError>,
    ) -> Result<Condition, ParseError> {
        let first = next(self)?;
        if !self.check(&token) {
            return Ok(first);
        }

        let mut children = vec![first];
        while self.check(&token) {
            self.advance()?;
            children.push(next(self)?);
        }
        Ok(Condition::Logical(LogicalSpec { op, children }))
    }

    fn parse_and(&mut self) -> Result<Condition, ParseError> {
        self.parse_logical(LogicalOp::And, Token::And, Self::parse_comparison)
    }

    fn parse_or(&mut self) -> Result<Condition, ParseError> {
        self.parse_logical(LogicalOp::Or, Token::Or, Self::parse_and)
    }

    /// Parse a complete condition, requiring all input to be consumed.
    pub fn parse(&mut self) -> Result<Condition, ParseError> {
        if self.check(&Token::Eof) {
            return Err(ParseError::Empty);
        }
        let condition = self.parse_or()?;
        self.expect(Token::Eof, "end of condition")?;
        Ok(condition)
    }
}

/// Field name spelled by `token` when it follows a `.`, keywords included.
fn field_name(token: &Token) -> Option<String> {
    match token {
        Token::Identifier(name) => Some(name.clone()),
        Token::Boolean(b) => Some(b.to_string()),
        Token::Null => Some("null".to_string()),
        Token::And => Some("and".to_string()),
        Token::Or => Some("or".to_string()),
        Token::As => Some("as".to_string()),
        _ => None,
    }
}

/// Parses condition text such as `age >= 18`.
pub fn parse_condition(text: &str) -> Result<Condition, ParseError> {
    Parser::new(Lexer::new(text))?.parse()
}
