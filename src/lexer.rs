use std::fmt;

use thiserror::Error;

use crate::ast::Token;

/// Character offset into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position {}", self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedChar { ch: char, position: Position },

    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },

    #[error("invalid escape sequence '\\{ch}' at {position}")]
    InvalidEscape { ch: char, position: Position },

    #[error("invalid number '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },

    #[error("unexpected '=' at {position} (did you mean '==' or '=~'?)")]
    LoneEquals { position: Position },
}

#[derive(Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.position,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '-' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position();
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c @ ('"' | '\'' | '\\')) => result.push(c),
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                ch,
                                position: self.position(),
                            });
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position();
        let mut number = String::new();
        let mut is_float = false;

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = |text: String| LexError::InvalidNumber {
            text,
            position: start,
        };
        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| invalid(number))
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| invalid(number))
        }
    }

    fn single(&mut self, token: Token) -> Result<Token, LexError> {
        self.advance();
        Ok(token)
    }

    fn pair(&mut self, second: char, matched: Token, otherwise: Token) -> Result<Token, LexError> {
        if self.peek_char(1) == Some(second) {
            self.advance();
            self.advance();
            Ok(matched)
        } else {
            self.single(otherwise)
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        match self.current_char() {
            None => Ok(Token::Eof),
            Some('.') => self.single(Token::Dot),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('=') => match self.peek_char(1) {
                Some('=') => {
                    self.advance();
                    self.single(Token::EqEq)
                }
                Some('~') => {
                    self.advance();
                    self.single(Token::Match)
                }
                _ => Err(LexError::LoneEquals {
                    position: self.position(),
                }),
            },
            Some('!') if self.peek_char(1) == Some('=') => {
                self.advance();
                self.single(Token::NotEq)
            }
            Some('>') => self.pair('=', Token::GtEq, Token::Gt),
            Some('<') => self.pair('=', Token::LtEq, Token::Lt),
            Some('&') if self.peek_char(1) == Some('&') => {
                self.advance();
                self.single(Token::And)
            }
            Some('|') if self.peek_char(1) == Some('|') => {
                self.advance();
                self.single(Token::Or)
            }
            Some('"') => self.read_string('"').map(Token::String),
            Some('\'') => self.read_string('\'').map(Token::String),
            Some('-') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                Ok(match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "as" => Token::As,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => Token::Identifier(ident),
                })
            }
            Some(ch) => Err(LexError::UnexpectedChar {
                ch,
                position: self.position(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens("and or as true false null"),
            vec![
                Token::And,
                Token::Or,
                Token::As,
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
            ]
        );
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            tokens("x.items[0]['k'] >= -2.5"),
            vec![
                Token::Identifier("x".into()),
                Token::Dot,
                Token::Identifier("items".into()),
                Token::LBracket,
                Token::Integer(0),
                Token::RBracket,
                Token::LBracket,
                Token::String("k".into()),
                Token::RBracket,
                Token::GtEq,
                Token::Float(-2.5),
            ]
        );
    }

    #[test]
    fn test_symbolic_logic_and_match() {
        assert_eq!(
            tokens("a && b || name =~ \"^A\""),
            vec![
                Token::Identifier("a".into()),
                Token::And,
                Token::Identifier("b".into()),
                Token::Or,
                Token::Identifier("name".into()),
                Token::Match,
                Token::String("^A".into()),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Lexer::new("= 1").next_token(),
            Err(LexError::LoneEquals { .. })
        ));
        assert!(matches!(
            Lexer::new("'open").next_token(),
            Err(LexError::UnterminatedString { .. })
        ));
        assert!(matches!(
            Lexer::new("#").next_token(),
            Err(LexError::UnexpectedChar { ch: '#', .. })
        ));
        // `*` only means "everything" to the filter front end
        assert!(matches!(
            Lexer::new("*").next_token(),
            Err(LexError::UnexpectedChar { ch: '*', .. })
        ));
    }

    #[test]
    fn test_hyphenated_identifier() {
        assert_eq!(
            tokens("user-id > -1"),
            vec![
                Token::Identifier("user-id".into()),
                Token::Gt,
                Token::Integer(-1),
            ]
        );
    }
}
