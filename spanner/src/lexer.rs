//! Tokenizer shared by the DDL and query parsers.

use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    /// Identifier or keyword, as written.
    Ident(String),
    /// Backquoted identifier; never treated as a keyword.
    Quoted(String),
    Integer(i64),
    Float(f64),
    StringLiteral(String),
    /// `@name`
    Param(String),
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Star,
    Dot,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Token {
    /// Case-insensitive keyword match; quoted identifiers never match.
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Quoted(s) => write!(f, "`{}`", s),
            Token::Integer(v) => write!(f, "{}", v),
            Token::Float(v) => write!(f, "{}", v),
            Token::StringLiteral(s) => write!(f, "'{}'", s),
            Token::Param(s) => write!(f, "@{}", s),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Star => write!(f, "*"),
            Token::Dot => write!(f, "."),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub(crate) enum LexError {
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated literal starting at offset {0}")]
    Unterminated(usize),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        if ch.is_whitespace() {
            pos += 1;
            continue;
        }
        // comments run to end of line
        if ch == '-' && chars.get(pos + 1) == Some(&'-') || ch == '#' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }
        if ch.is_ascii_digit() || ch == '-' && chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit()) {
            let start = pos;
            pos += 1;
            let mut is_float = false;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                is_float |= chars[pos] == '.';
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let token = if is_float {
                text.parse().map(Token::Float).map_err(|_| LexError::InvalidNumber(text))?
            } else {
                text.parse().map(Token::Integer).map_err(|_| LexError::InvalidNumber(text))?
            };
            tokens.push(token);
            continue;
        }
        match ch {
            '\'' | '"' | '`' => {
                let start = pos;
                pos += 1;
                let mut text = String::new();
                loop {
                    match chars.get(pos) {
                        None => return Err(LexError::Unterminated(start)),
                        Some('\\') if ch != '`' => {
                            if let Some(escaped) = chars.get(pos + 1) {
                                text.push(*escaped);
                            }
                            pos += 2;
                        }
                        Some(c) if *c == ch => {
                            pos += 1;
                            break;
                        }
                        Some(c) => {
                            text.push(*c);
                            pos += 1;
                        }
                    }
                }
                tokens.push(if ch == '`' {
                    Token::Quoted(text)
                } else {
                    Token::StringLiteral(text)
                });
            }
            '@' => {
                let start = pos + 1;
                pos += 1;
                while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                if pos == start {
                    return Err(LexError::UnexpectedChar('@', start - 1));
                }
                tokens.push(Token::Param(chars[start..pos].iter().collect()));
            }
            '(' => {
                tokens.push(Token::LeftParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                pos += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                pos += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                pos += 1;
            }
            '!' if chars.get(pos + 1) == Some(&'=') => {
                tokens.push(Token::NotEq);
                pos += 2;
            }
            '<' => match chars.get(pos + 1) {
                Some('=') => {
                    tokens.push(Token::LtEq);
                    pos += 2;
                }
                Some('>') => {
                    tokens.push(Token::NotEq);
                    pos += 2;
                }
                _ => {
                    tokens.push(Token::Lt);
                    pos += 1;
                }
            },
            '>' => {
                if chars.get(pos + 1) == Some(&'=') {
                    tokens.push(Token::GtEq);
                    pos += 2;
                } else {
                    tokens.push(Token::Gt);
                    pos += 1;
                }
            }
            c => return Err(LexError::UnexpectedChar(c, pos)),
        }
    }
    Ok(tokens)
}

/// Cursor over a token stream with the helpers both parsers need.
pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(input: &str) -> Result<Self, String> {
        let tokens = tokenize(input).map_err(|e| e.to_string())?;
        Ok(Parser { tokens, pos: 0 })
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    pub(crate) fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(format!("expected {} but found {}", keyword, self.describe_next()))
        }
    }

    pub(crate) fn consume(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: &Token) -> Result<(), String> {
        if self.consume(token) {
            Ok(())
        } else {
            Err(format!("expected {} but found {}", token, self.describe_next()))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, String> {
        match self.next_token() {
            Some(Token::Ident(s)) | Some(Token::Quoted(s)) => Ok(s),
            Some(other) => Err(format!("expected identifier but found {}", other)),
            None => Err("expected identifier but found end of statement".to_string()),
        }
    }

    /// True once only optional trailing semicolons remain.
    pub(crate) fn at_end(&mut self) -> bool {
        while self.consume(&Token::Semicolon) {}
        self.pos >= self.tokens.len()
    }

    pub(crate) fn expect_end(&mut self) -> Result<(), String> {
        if self.at_end() {
            Ok(())
        } else {
            Err(format!("unexpected {}", self.describe_next()))
        }
    }

    fn describe_next(&self) -> String {
        match self.peek() {
            Some(t) => t.to_string(),
            None => "end of statement".to_string(),
        }
    }
}
