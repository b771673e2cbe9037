use std::fmt;

use fxchain_core::{FxError, FxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering `self` through `other`, positioned at `self`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Effect,
    Let,
    Pipe, // ->

    Identifier(String),
    NumberLiteral(f64),
    ColorLiteral(String),

    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    Comma,
    Colon,
    Equals,

    Plus,
    Minus,
    Star,
    Slash,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Effect => write!(f, "@effect"),
            TokenKind::Let => write!(f, "let"),
            TokenKind::Pipe => write!(f, "->"),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::NumberLiteral(n) => write!(f, "{}", n),
            TokenKind::ColorLiteral(c) => write!(f, "#{}", c),
            TokenKind::LeftBrace => write!(f, "{{"),
            TokenKind::RightBrace => write!(f, "}}"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Equals => write!(f, "="),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> FxResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_next() == Some('/') {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn next_token(&mut self) -> FxResult<Token> {
        self.skip_whitespace_and_comments();

        let start = self.pos;
        let line = self.line;
        let column = self.column;

        let Some(ch) = self.peek() else {
            return Ok(Token::new(
                TokenKind::Eof,
                Span::new(start, start, line, column),
            ));
        };

        let kind = match ch {
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '=' => self.single(TokenKind::Equals),
            '+' => self.single(TokenKind::Plus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '-' => {
                self.advance();
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Pipe
                } else {
                    TokenKind::Minus
                }
            }
            '@' => {
                self.advance();
                let ident = self.read_while(|c| c.is_alphabetic());
                if ident != "effect" {
                    return Err(FxError::parse(
                        format!("unknown decorator: @{}", ident),
                        line,
                        column,
                    ));
                }
                TokenKind::Effect
            }
            '#' => {
                self.advance();
                let hex = self.read_while(|c| c.is_ascii_hexdigit());
                if !matches!(hex.len(), 3 | 6 | 8) {
                    return Err(FxError::parse(
                        format!("invalid hex color: #{}", hex),
                        line,
                        column,
                    ));
                }
                TokenKind::ColorLiteral(hex)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let num_str = self.read_while(|c| c.is_ascii_digit() || c == '.');
                match num_str.parse::<f64>() {
                    Ok(value) => TokenKind::NumberLiteral(value),
                    Err(_) => {
                        return Err(FxError::parse(
                            format!("invalid number: {}", num_str),
                            line,
                            column,
                        ));
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_while(|c| c.is_alphanumeric() || c == '_');
                match ident.as_str() {
                    "let" => TokenKind::Let,
                    _ => TokenKind::Identifier(ident),
                }
            }
            _ => {
                return Err(FxError::parse(
                    format!("unexpected character: '{}'", ch),
                    line,
                    column,
                ));
            }
        };

        Ok(Token::new(kind, Span::new(start, self.pos, line, column)))
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            result.push(ch);
            self.advance();
        }
        result
    }
}
