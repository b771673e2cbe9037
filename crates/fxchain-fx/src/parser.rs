use fxchain_core::{FxError, FxResult};

use crate::ast::*;
use crate::lexer::{Span, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// `tokens` must end with `Eof`, as produced by [`crate::lexer::Lexer::tokenize`].
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> FxResult<EffectDef> {
        let def = self.parse_effect_def()?;
        let trailing = self.peek();
        if trailing.kind != TokenKind::Eof {
            return Err(error_at(
                format!("unexpected {} after effect body", trailing.kind),
                trailing.span,
            ));
        }
        Ok(def)
    }

    fn peek(&self) -> Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Token {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens
            .get((self.pos + offset).min(last))
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, Span::new(0, 0, 1, 1)))
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> FxResult<Token> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(error_at(
                format!("expected {}, found {}", kind, token.kind),
                token.span,
            ))
        }
    }

    fn expect_ident(&mut self, what: &str) -> FxResult<(String, Span)> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier(name) => Ok((name, token.span)),
            other => Err(error_at(
                format!("expected {}, found {}", what, other),
                token.span,
            )),
        }
    }

    fn parse_effect_def(&mut self) -> FxResult<EffectDef> {
        let start_span = self.expect(TokenKind::Effect)?.span;
        let (name, _) = self.expect_ident("effect name")?;

        let mut params = Vec::new();
        if self.check(&TokenKind::LeftParen) {
            self.advance();
            while !self.check(&TokenKind::RightParen) {
                params.push(self.parse_param()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(TokenKind::RightParen)?;
        }

        self.expect(TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        let end_span = self.expect(TokenKind::RightBrace)?.span;

        Ok(EffectDef {
            name,
            params,
            body,
            span: start_span.to(end_span),
        })
    }

    fn parse_param(&mut self) -> FxResult<Param> {
        let (name, span) = self.expect_ident("parameter name")?;

        let mut default_value = None;
        if self.check(&TokenKind::Colon) {
            self.advance();
            let negative = self.check(&TokenKind::Minus);
            if negative {
                self.advance();
            }
            let val_tok = self.advance();
            match val_tok.kind {
                TokenKind::NumberLiteral(val) => {
                    default_value = Some(if negative { -val } else { val });
                }
                other => {
                    return Err(error_at(
                        format!("expected number literal for default, found {}", other),
                        val_tok.span,
                    ));
                }
            }
        }

        Ok(Param {
            name,
            default_value,
            span,
        })
    }

    fn parse_statement(&mut self) -> FxResult<Statement> {
        if !self.check(&TokenKind::Let) {
            return Ok(Statement::Expr(self.parse_expr()?));
        }
        let start_span = self.advance().span;
        let (name, _) = self.expect_ident("identifier after let")?;
        self.expect(TokenKind::Equals)?;
        let value = self.parse_expr()?;
        let span = start_span.to(value.span());
        Ok(Statement::Let { name, value, span })
    }

    fn parse_expr(&mut self) -> FxResult<Expr> {
        self.parse_pipe()
    }

    fn parse_pipe(&mut self) -> FxResult<Expr> {
        let mut left = self.parse_additive()?;
        while self.check(&TokenKind::Pipe) {
            self.advance();
            let right = self.parse_additive()?;
            if !matches!(right, Expr::Call { .. } | Expr::Ident(..)) {
                return Err(error_at(
                    "right side of '->' must be a function",
                    right.span(),
                ));
            }
            let span = left.span().to(right.span());
            left = Expr::Pipe {
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> FxResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => Op::Add,
                TokenKind::Minus => Op::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let span = left.span().to(right.span());
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FxResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => Op::Mul,
                TokenKind::Slash => Op::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = left.span().to(right.span());
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> FxResult<Expr> {
        if self.check(&TokenKind::Minus) {
            let span = self.advance().span;
            let inner = self.parse_unary()?;
            let span = span.to(inner.span());
            return Ok(Expr::Neg(Box::new(inner), span));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> FxResult<Expr> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Identifier(name) => {
                if !self.check(&TokenKind::LeftParen) {
                    return Ok(Expr::Ident(name, tok.span));
                }
                self.advance();
                let mut args = Vec::new();
                while !self.check(&TokenKind::RightParen) {
                    args.push(self.parse_expr()?);
                    if !self.check(&TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
                let end_span = self.expect(TokenKind::RightParen)?.span;
                Ok(Expr::Call {
                    name,
                    args,
                    span: tok.span.to(end_span),
                })
            }
            TokenKind::NumberLiteral(val) => Ok(Expr::Number(val, tok.span)),
            TokenKind::ColorLiteral(val) => Ok(Expr::ColorHex(val, tok.span)),
            TokenKind::LeftParen => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            other => Err(error_at(format!("unexpected token: {}", other), tok.span)),
        }
    }
}

fn error_at(message: impl Into<String>, span: Span) -> FxError {
    FxError::parse(message, span.line, span.column)
}
