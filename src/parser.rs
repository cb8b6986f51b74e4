// nyl -- a small compiled and interpreted programming language
// Copyright (C) 2025  The nyl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Predictive recursive-descent parser with precedence climbing for
//! expressions.
//!
//! The parser always returns a `Program` root; syntax errors become
//! diagnostics and put the parser into panic mode, during which further
//! errors are suppressed until it re-synchronizes at a newline, an `end`, or
//! a declaration boundary.

use std::iter::Peekable;

use logos::Logos;

use crate::ast::{self, Node};
use crate::diag::Diagnostic;
use crate::lexer::{Span, Token};
use crate::line_map::LineMap;
use crate::types::Type;

#[cfg(test)]
mod expect_tests;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct Prec(u16);

impl Prec {
    const ASSIGN: Prec = Prec(0);
    const DISJUNCTIVE: Prec = Prec(1);
    const CONJUNCTIVE: Prec = Prec(2);
    const EQUALITY: Prec = Prec(3);
    const COMPARISON: Prec = Prec(4);
    const BIT_OR: Prec = Prec(5);
    const BIT_XOR: Prec = Prec(6);
    const BIT_AND: Prec = Prec(7);
    const SHIFT: Prec = Prec(8);
    const ADDITIVE: Prec = Prec(9);
    const MULTIPLICATIVE: Prec = Prec(10);
    const UNARY: Prec = Prec(11);
    /// `x |> f` sits between unary and the other postfix forms so that the
    /// rewrite is left-associative while `f.g(y)[i]` still binds tighter.
    const PIPE: Prec = Prec(12);
    const POSTFIX: Prec = Prec(13);
    const HIGHEST: Prec = Prec(14);

    pub fn succ(self) -> Prec {
        // this would be a parser bug:
        assert!(self < Self::HIGHEST);
        Prec(self.0 + 1)
    }
}

/// The infix precedence of a binary operator token.
fn binary_op(token: Token) -> Option<(ast::BinaryOp, Prec)> {
    use ast::BinaryOp::*;
    Some(match token {
        Token::Or => (Or, Prec::DISJUNCTIVE),
        Token::And => (And, Prec::CONJUNCTIVE),
        Token::EqEq => (Eq, Prec::EQUALITY),
        Token::Ne => (Ne, Prec::EQUALITY),
        Token::Lt => (Lt, Prec::COMPARISON),
        Token::Le => (Le, Prec::COMPARISON),
        Token::Gt => (Gt, Prec::COMPARISON),
        Token::Ge => (Ge, Prec::COMPARISON),
        Token::Pipe => (BitOr, Prec::BIT_OR),
        Token::Caret => (BitXor, Prec::BIT_XOR),
        Token::Amp => (BitAnd, Prec::BIT_AND),
        Token::Shl => (Shl, Prec::SHIFT),
        Token::Shr => (Shr, Prec::SHIFT),
        Token::Plus => (Add, Prec::ADDITIVE),
        Token::Minus => (Sub, Prec::ADDITIVE),
        Token::Star => (Mul, Prec::MULTIPLICATIVE),
        Token::Slash => (Div, Prec::MULTIPLICATIVE),
        Token::Percent => (Mod, Prec::MULTIPLICATIVE),
        _ => return None,
    })
}

pub type Parse<T> = Result<Node<T>, Diagnostic>;

/// Result of parsing one buffer. `program` is never absent, even when the
/// input was hopeless; `diagnostics` holds the reported errors in order.
pub struct ParseOutcome {
    pub program: Node<ast::Program>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn had_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

pub struct Parser<'a> {
    source: &'a str,
    stream: Peekable<logos::SpannedIter<'a, Token>>,
    line_map: LineMap<'a>,
    diagnostics: Vec<Diagnostic>,
    panic_mode: bool,
    /// End offset of the most recently consumed token, for node spans.
    last_end: usize,
}

impl<'a> Parser<'a> {
    // Public interface

    pub fn parse(source: &'a str) -> ParseOutcome {
        let mut parser = Parser::new(source);
        let mut decls = Vec::new();

        parser.skip_newlines();
        loop {
            parser.panic_mode = false;
            if parser.peek().0.is_none() {
                break;
            }
            match parser.parse_decl() {
                Ok(decl) => decls.push(decl),
                Err(diag) => {
                    parser.report(diag);
                    parser.synchronize_decl();
                }
            }
            parser.skip_newlines();
        }

        ParseOutcome {
            program: Node {
                span: 0..source.len(),
                data: ast::Program { decls },
            },
            diagnostics: parser.diagnostics,
        }
    }

    // Private helpers

    fn new(source: &'a str) -> Self {
        Parser {
            source,
            stream: Token::lexer(source).spanned().peekable(),
            line_map: LineMap::new(source),
            diagnostics: Vec::new(),
            panic_mode: false,
            last_end: 0,
        }
    }

    /// Report lexer error tokens sitting at the front of the stream and drop
    /// them, so the grammar only ever sees well-formed tokens.
    fn drain_error_tokens(&mut self) {
        while let Some((token, span)) = self.stream.peek() {
            match token.error_message() {
                Some(message) => {
                    let diag = Diagnostic::new(span.clone(), &self.line_map, message);
                    self.stream.next();
                    self.report(diag);
                }
                None => break,
            }
        }
    }

    fn peek(&mut self) -> (Option<Token>, Span) {
        self.drain_error_tokens();
        match self.stream.peek() {
            Some((token, span)) => (Some(*token), span.clone()),
            None => (None, self.eof()),
        }
    }

    fn consume(&mut self) -> Option<(Token, Span)> {
        self.drain_error_tokens();
        let result = self.stream.next();
        if let Some((_, span)) = &result {
            self.last_end = span.end;
        }
        result
    }

    fn eof(&self) -> Span {
        self.source.len()..self.source.len()
    }

    fn report(&mut self, diag: Diagnostic) {
        if !self.panic_mode {
            self.diagnostics.push(diag);
        }
        self.panic_mode = true;
    }

    /// Skip to the next statement boundary. Stops *before* `end` so that the
    /// enclosing block still sees its terminator.
    fn synchronize_stmt(&mut self) {
        loop {
            match self.peek().0 {
                None | Some(Token::End) | Some(Token::Elif) | Some(Token::Else) => break,
                Some(Token::Newline) => {
                    self.consume();
                    break;
                }
                Some(_) => {
                    self.consume();
                }
            }
        }
    }

    /// Skip to the next declaration boundary, consuming the offending tokens.
    fn synchronize_decl(&mut self) {
        while let Some((token, _)) = self.consume() {
            if let Token::Newline | Token::End = token {
                break;
            }
        }
        // Stray terminators left behind by the broken declaration would only
        // produce follow-on errors; skip those too.
        loop {
            match self.peek().0 {
                Some(Token::Newline) | Some(Token::End) => {
                    self.consume();
                }
                _ => break,
            }
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(Token::Newline) {
            self.consume();
        }
    }

    fn at(&mut self, expected: Token) -> bool {
        self.peek().0 == Some(expected)
    }

    fn eat(&mut self, expected: Token) -> Option<Span> {
        if self.at(expected) {
            self.consume().map(|(_, span)| span)
        } else {
            None
        }
    }

    fn expect(&mut self, expected: Token, message: &str) -> Parse<()> {
        let (token, span) = self.peek();
        if token == Some(expected) {
            self.consume();
            Ok(Node { span, data: () })
        } else {
            Err(self.error(span, message))
        }
    }

    fn error(&self, span: Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(span, &self.line_map, message)
    }

    fn expect_ident(&mut self, message: &str) -> Parse<String> {
        let (token, span) = self.peek();
        if token == Some(Token::Ident) {
            self.consume();
            Ok(Node {
                data: self.source[span.clone()].to_string(),
                span,
            })
        } else {
            Err(self.error(span, message))
        }
    }

    fn expect_int(&mut self, message: &str) -> Parse<i64> {
        match self.peek() {
            (Some(Token::LitInt(value)), span) => {
                self.consume();
                Ok(Node { span, data: value })
            }
            (_, span) => Err(self.error(span, message)),
        }
    }

    /// Consume a string literal and decode its escape sequences.
    fn expect_string(&mut self, message: &str) -> Parse<String> {
        let (token, span) = self.peek();
        if token == Some(Token::LitString) {
            self.consume();
            let raw = &self.source[span.start + 1..span.end - 1];
            Ok(Node {
                span,
                data: decode_escapes(raw),
            })
        } else {
            Err(self.error(span, message))
        }
    }

    // Parse rules: declarations

    fn parse_decl(&mut self) -> Parse<ast::Decl> {
        self.skip_newlines();
        match self.peek().0 {
            Some(Token::DirUse) => self.parse_use(),
            Some(Token::DirExtern) => self.parse_extern(),
            Some(Token::Fn) => {
                let f = self.parse_fn_decl(false)?;
                Ok(Node {
                    span: f.span,
                    data: ast::Decl::Fn(f.data),
                })
            }
            Some(Token::Struct) => self.parse_struct_decl(),
            Some(Token::Enum) => self.parse_enum_decl(),
            _ => {
                let stmt = self.parse_stmt()?;
                Ok(Node {
                    span: stmt.span,
                    data: ast::Decl::Stmt(stmt.data),
                })
            }
        }
    }

    fn parse_use(&mut self) -> Parse<ast::Decl> {
        let start = self.peek().1.start;
        self.consume();
        let path = self.expect_string("Expected path string after @use.")?;
        let alias = if self.eat(Token::As).is_some() {
            Some(self.expect_ident("Expected alias name after 'as'.")?)
        } else {
            None
        };
        Ok(Node {
            span: start..self.last_end,
            data: ast::Decl::Use(ast::UseDecl { path, alias }),
        })
    }

    fn parse_extern(&mut self) -> Parse<ast::Decl> {
        let start = self.peek().1.start;
        self.consume();
        let abi = self.expect_string("Expected ABI string after @extern.")?;
        self.expect(Token::Do, "Expected 'do' after @extern ABI.")?;
        self.skip_newlines();

        let mut fns = Vec::new();
        while !self.at(Token::End) && self.peek().0.is_some() {
            fns.push(self.parse_fn_decl(true)?);
            self.skip_newlines();
        }
        self.expect(Token::End, "Expected 'end' after extern block.")?;
        Ok(Node {
            span: start..self.last_end,
            data: ast::Decl::Extern(ast::ExternBlock { abi, fns }),
        })
    }

    fn parse_fn_decl(&mut self, is_extern: bool) -> Parse<ast::FnDecl> {
        let start = self.peek().1.start;
        self.expect(Token::Fn, "Expected 'fn'.")?;
        let name = self.expect_ident("Expected function name.")?;
        self.expect(Token::LParen, "Expected '(' after function name.")?;

        let mut params = Vec::new();
        if !self.at(Token::RParen) {
            loop {
                let param_start = self.peek().1.start;
                let param_name = self.expect_ident("Expected parameter name.")?;
                self.expect(Token::ColonColon, "Expected '::' before parameter type.")?;
                let ty = self.parse_type()?;
                params.push(Node {
                    span: param_start..self.last_end,
                    data: ast::Param {
                        name: param_name.data,
                        ty,
                    },
                });
                if self.eat(Token::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "Expected ')' after parameters.")?;

        let ret = if self.eat(Token::Arrow).is_some() {
            self.parse_type()?
        } else {
            Node {
                span: self.last_end..self.last_end,
                data: Type::Void,
            }
        };

        let body = if self.eat(Token::Do).is_some() {
            let block = self.parse_block()?;
            self.expect(Token::End, "Expected 'end' after function body.")?;
            Some(block)
        } else {
            None
        };

        Ok(Node {
            span: start..self.last_end,
            data: ast::FnDecl {
                name,
                params,
                ret,
                body,
                is_extern,
            },
        })
    }

    fn parse_struct_decl(&mut self) -> Parse<ast::Decl> {
        let start = self.peek().1.start;
        self.consume();
        let name = self.expect_ident("Expected struct name.")?;
        self.expect(Token::Do, "Expected 'do' after struct name.")?;
        self.skip_newlines();

        let mut fields = Vec::new();
        while !self.at(Token::End) && self.peek().0.is_some() {
            let field_name = self.expect_ident("Expected field name.")?;
            self.expect(Token::ColonColon, "Expected '::' after field name.")?;
            let field_type = self.parse_type()?;
            fields.push((field_name, field_type));
            self.skip_newlines();
        }
        self.expect(Token::End, "Expected 'end' after struct body.")?;
        Ok(Node {
            span: start..self.last_end,
            data: ast::Decl::Struct(ast::StructDecl { name, fields }),
        })
    }

    fn parse_enum_decl(&mut self) -> Parse<ast::Decl> {
        let start = self.peek().1.start;
        self.consume();
        let name = self.expect_ident("Expected enum name.")?;
        self.expect(Token::Do, "Expected 'do' after enum name.")?;
        self.skip_newlines();

        let mut variants = Vec::new();
        let mut next_value = 0i64;
        while !self.at(Token::End) && self.peek().0.is_some() {
            let variant = self.expect_ident("Expected variant name.")?;
            let value = if self.eat(Token::Eq).is_some() {
                self.expect_int("Expected integer value for enum variant.")?
                    .data
            } else {
                next_value
            };
            next_value = value + 1;
            variants.push((variant, value));
            self.skip_newlines();
        }
        self.expect(Token::End, "Expected 'end' after enum body.")?;
        Ok(Node {
            span: start..self.last_end,
            data: ast::Decl::Enum(ast::EnumDecl { name, variants }),
        })
    }

    fn parse_var_decl(&mut self) -> Parse<ast::Stmt> {
        let start = self.peek().1.start;
        let bind = if self.eat(Token::Mut).is_some() {
            ast::BindKind::Mut
        } else if self.eat(Token::Const).is_some() {
            ast::BindKind::Const
        } else {
            self.expect(Token::Let, "Expected 'let', 'mut', or 'const'.")?;
            ast::BindKind::Let
        };

        let name = self.expect_ident("Expected variable name.")?;
        let ty = if self.eat(Token::ColonColon).is_some() {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(Token::Eq, "Expected '=' in variable declaration.")?;
        let init = self.parse_expr()?;

        Ok(Node {
            span: start..self.last_end,
            data: ast::Stmt::Var(ast::VarDecl {
                bind,
                name,
                ty,
                init,
            }),
        })
    }

    fn parse_type(&mut self) -> Parse<Type> {
        let (token, span) = self.peek();
        let simple = match token {
            Some(Token::Void) => Some(Type::Void),
            Some(Token::Bool) => Some(Type::Bool),
            Some(Token::I8) => Some(Type::I8),
            Some(Token::I16) => Some(Type::I16),
            Some(Token::I32) => Some(Type::I32),
            Some(Token::I64) => Some(Type::I64),
            Some(Token::U8) => Some(Type::U8),
            Some(Token::U16) => Some(Type::U16),
            Some(Token::U32) => Some(Type::U32),
            Some(Token::U64) => Some(Type::U64),
            Some(Token::F32) => Some(Type::F32),
            Some(Token::F64) => Some(Type::F64),
            _ => None,
        };
        if let Some(ty) = simple {
            self.consume();
            return Ok(Node { span, data: ty });
        }

        match token {
            Some(Token::Ptr) => {
                self.consume();
                self.expect(Token::Lt, "Expected '<' after 'ptr'.")?;
                let inner = self.parse_type()?;
                self.expect(Token::Gt, "Expected '>' after pointer type.")?;
                Ok(Node {
                    span: span.start..self.last_end,
                    data: Type::Ptr(Box::new(inner.data)),
                })
            }
            Some(Token::LBracket) => {
                self.consume();
                let elem = self.parse_type()?;
                if self.eat(Token::Semi).is_some() {
                    let size = self.expect_int("Expected array size.")?;
                    if size.data < 0 || size.data > i64::from(u32::MAX) {
                        return Err(self.error(size.span, "Array size out of range."));
                    }
                    self.expect(Token::RBracket, "Expected ']'.")?;
                    Ok(Node {
                        span: span.start..self.last_end,
                        data: Type::Array(Box::new(elem.data), size.data as u32),
                    })
                } else {
                    self.expect(Token::RBracket, "Expected ']'.")?;
                    Ok(Node {
                        span: span.start..self.last_end,
                        data: Type::Slice(Box::new(elem.data)),
                    })
                }
            }
            Some(Token::Ident) => {
                self.consume();
                Ok(Node {
                    data: Type::named(&self.source[span.clone()]),
                    span,
                })
            }
            _ => Err(self.error(span, "Expected type.")),
        }
    }

    // Parse rules: statements

    fn parse_block(&mut self) -> Parse<ast::Block> {
        let start = self.last_end;
        let mut stmts = Vec::new();

        self.skip_newlines();
        loop {
            match self.peek().0 {
                None | Some(Token::End) | Some(Token::Elif) | Some(Token::Else) => break,
                Some(_) => match self.parse_stmt() {
                    Ok(stmt) => {
                        stmts.push(stmt);
                        self.skip_newlines();
                    }
                    Err(diag) => {
                        self.report(diag);
                        self.synchronize_stmt();
                    }
                },
            }
        }

        Ok(Node {
            span: start..self.last_end,
            data: ast::Block { stmts },
        })
    }

    fn parse_stmt(&mut self) -> Parse<ast::Stmt> {
        self.skip_newlines();
        match self.peek().0 {
            Some(Token::Let) | Some(Token::Mut) | Some(Token::Const) => self.parse_var_decl(),
            Some(Token::Ret) => self.parse_return(),
            Some(Token::Break) => {
                let span = self.consume().map(|(_, s)| s).unwrap_or_else(|| self.eof());
                Ok(Node {
                    span,
                    data: ast::Stmt::Break,
                })
            }
            Some(Token::Continue) => {
                let span = self.consume().map(|(_, s)| s).unwrap_or_else(|| self.eof());
                Ok(Node {
                    span,
                    data: ast::Stmt::Continue,
                })
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::For) => self.parse_for(),
            _ => {
                let expr = self.parse_expr()?;
                Ok(Node {
                    span: expr.span.clone(),
                    data: ast::Stmt::Expr(expr),
                })
            }
        }
    }

    fn parse_return(&mut self) -> Parse<ast::Stmt> {
        let start = self.peek().1.start;
        self.consume();
        let value = match self.peek().0 {
            None | Some(Token::Newline) | Some(Token::End) => None,
            Some(_) => Some(self.parse_expr()?),
        };
        Ok(Node {
            span: start..self.last_end,
            data: ast::Stmt::Ret(value),
        })
    }

    fn parse_if(&mut self) -> Parse<ast::Stmt> {
        let start = self.peek().1.start;
        self.consume();
        let cond = self.parse_expr()?;
        self.expect(Token::Do, "Expected 'do' after if condition.")?;
        let then_block = self.parse_block()?;

        let mut elifs = Vec::new();
        while self.eat(Token::Elif).is_some() {
            let elif_cond = self.parse_expr()?;
            self.expect(Token::Do, "Expected 'do' after elif condition.")?;
            let elif_block = self.parse_block()?;
            elifs.push((elif_cond, elif_block));
        }

        let else_block = if self.eat(Token::Else).is_some() {
            self.expect(Token::Do, "Expected 'do' after else.")?;
            Some(self.parse_block()?)
        } else {
            None
        };

        self.expect(Token::End, "Expected 'end' after if statement.")?;
        Ok(Node {
            span: start..self.last_end,
            data: ast::Stmt::If(ast::IfStmt {
                cond,
                then_block,
                elifs,
                else_block,
            }),
        })
    }

    fn parse_while(&mut self) -> Parse<ast::Stmt> {
        let start = self.peek().1.start;
        self.consume();
        let cond = self.parse_expr()?;
        self.expect(Token::Do, "Expected 'do' after while condition.")?;
        let body = self.parse_block()?;
        self.expect(Token::End, "Expected 'end' after while body.")?;
        Ok(Node {
            span: start..self.last_end,
            data: ast::Stmt::While(ast::WhileStmt { cond, body }),
        })
    }

    fn parse_for(&mut self) -> Parse<ast::Stmt> {
        let start = self.peek().1.start;
        self.consume();
        let var = self.expect_ident("Expected loop variable.")?;
        self.expect(Token::In, "Expected 'in' in for loop.")?;
        let range_start = self.parse_expr()?;
        self.expect(Token::DotDot, "Expected '..' in range.")?;
        let range_end = self.parse_expr()?;
        self.expect(Token::Do, "Expected 'do' after for range.")?;
        let body = self.parse_block()?;
        self.expect(Token::End, "Expected 'end' after for body.")?;
        Ok(Node {
            span: start..self.last_end,
            data: ast::Stmt::For(ast::ForStmt {
                var,
                start: range_start,
                end: range_end,
                body,
            }),
        })
    }

    // Parse rules: expressions

    fn parse_expr(&mut self) -> Parse<ast::Expr> {
        self.parse_prec_expr(Prec::ASSIGN)
    }

    fn parse_prec_expr(&mut self, min_prec: Prec) -> Parse<ast::Expr> {
        // Prefix rules
        let mut left = self.parse_prefix_expr()?;

        // Infix/postfix rules
        loop {
            // The expression could already be complete here, so EOF is fine.
            let (token, span) = match self.peek() {
                (None, _) => break,
                (Some(token), span) => (token, span),
            };

            if let Some((op, prec)) = binary_op(token) {
                if min_prec <= prec {
                    left = self.parse_binary_operand(left, op, span, prec.succ())?;
                    continue;
                }
                break;
            }

            left = match token {
                // `=` is right-associative: the value parses at the same level.
                Token::Eq if min_prec <= Prec::ASSIGN => {
                    self.consume();
                    let value = self.parse_prec_expr(Prec::ASSIGN)?;
                    Node {
                        span: left.span.start..value.span.end,
                        data: ast::Expr::Assign {
                            target: Box::new(left),
                            value: Box::new(value),
                        },
                    }
                }
                // `x |> f` becomes `f(x)`; the callee parses one level up so
                // that chained pipes stay left-associative.
                Token::PipeGt if min_prec <= Prec::PIPE => {
                    self.consume();
                    let callee = self.parse_prec_expr(Prec::PIPE.succ())?;
                    Node {
                        span: left.span.start..callee.span.end,
                        data: ast::Expr::Call {
                            callee: Box::new(callee),
                            args: vec![left],
                        },
                    }
                }
                Token::LParen if min_prec <= Prec::POSTFIX => {
                    self.consume();
                    let mut args = Vec::new();
                    if !self.at(Token::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.eat(Token::Comma).is_none() {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RParen, "Expected ')' after arguments.")?;
                    Node {
                        span: left.span.start..self.last_end,
                        data: ast::Expr::Call {
                            callee: Box::new(left),
                            args,
                        },
                    }
                }
                Token::Dot if min_prec <= Prec::POSTFIX => {
                    self.consume();
                    let field = self.expect_ident("Expected member name after '.'")?;
                    Node {
                        span: left.span.start..field.span.end,
                        data: ast::Expr::Member {
                            object: Box::new(left),
                            field,
                        },
                    }
                }
                Token::LBracket if min_prec <= Prec::POSTFIX => {
                    self.consume();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket, "Expected ']' after index.")?;
                    Node {
                        span: left.span.start..self.last_end,
                        data: ast::Expr::Index {
                            object: Box::new(left),
                            index: Box::new(index),
                        },
                    }
                }
                // any unexpected token is not consumed, that is the caller's
                // problem
                _ => break,
            }
        }

        Ok(left)
    }

    fn parse_binary_operand(
        &mut self,
        left: Node<ast::Expr>,
        op: ast::BinaryOp,
        op_span: Span,
        right_prec: Prec,
    ) -> Parse<ast::Expr> {
        // assumes that the caller did not consume the operator yet
        self.consume();
        let right = self.parse_prec_expr(right_prec)?;
        Ok(Node {
            span: left.span.start..right.span.end,
            data: ast::Expr::Binary {
                op: Node {
                    span: op_span,
                    data: op,
                },
                left: Box::new(left),
                right: Box::new(right),
            },
        })
    }

    fn parse_prefix_expr(&mut self) -> Parse<ast::Expr> {
        let (token, span) = match self.peek() {
            (None, span) => return Err(self.error(span, "Expected expression.")),
            (Some(token), span) => (token, span),
        };

        match token {
            Token::Minus => self.parse_unary_operand(ast::UnaryOp::Neg, span),
            Token::Not => self.parse_unary_operand(ast::UnaryOp::Not, span),
            Token::Tilde => self.parse_unary_operand(ast::UnaryOp::BitNot, span),
            Token::Amp => self.parse_unary_operand(ast::UnaryOp::Addr, span),
            Token::Star => self.parse_unary_operand(ast::UnaryOp::Deref, span),
            Token::LParen => {
                self.consume();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "Expected ')' after expression.")?;
                Ok(expr)
            }
            Token::LitInt(value) => {
                self.consume();
                Ok(Node {
                    span,
                    data: ast::Expr::Int(value),
                })
            }
            Token::LitFloat(value) => {
                self.consume();
                Ok(Node {
                    span,
                    data: ast::Expr::Float(value),
                })
            }
            Token::LitString => {
                let lit = self.expect_string("Expected expression.")?;
                Ok(Node {
                    span: lit.span,
                    data: ast::Expr::Str(lit.data),
                })
            }
            Token::True | Token::False => {
                self.consume();
                Ok(Node {
                    span,
                    data: ast::Expr::Bool(token == Token::True),
                })
            }
            Token::Ident => {
                let name = self.expect_ident("Expected expression.")?;

                if self.eat(Token::ColonColon).is_some() {
                    let variant = self.expect_ident("Expected variant name after '::'.")?;
                    return Ok(Node {
                        span: name.span.start..variant.span.end,
                        data: ast::Expr::EnumVariant {
                            enum_name: name,
                            variant,
                        },
                    });
                }

                if self.eat(Token::LBrace).is_some() {
                    return self.parse_struct_init(name);
                }

                Ok(Node {
                    span: name.span.clone(),
                    data: ast::Expr::Ident(name.data),
                })
            }
            Token::LBracket => {
                self.consume();
                let mut elems = Vec::new();
                if !self.at(Token::RBracket) {
                    loop {
                        elems.push(self.parse_expr()?);
                        if self.eat(Token::Comma).is_none() {
                            break;
                        }
                    }
                }
                self.expect(Token::RBracket, "Expected ']' after array elements.")?;
                Ok(Node {
                    span: span.start..self.last_end,
                    data: ast::Expr::ArrayInit { elems },
                })
            }
            _ => Err(self.error(span, "Expected expression.")),
        }
    }

    fn parse_unary_operand(&mut self, op: ast::UnaryOp, op_span: Span) -> Parse<ast::Expr> {
        // assumes that the caller did not consume the operator yet
        self.consume();
        let operand = self.parse_prec_expr(Prec::UNARY)?;
        Ok(Node {
            span: op_span.start..operand.span.end,
            data: ast::Expr::Unary {
                op: Node {
                    span: op_span,
                    data: op,
                },
                operand: Box::new(operand),
            },
        })
    }

    /// The opening brace is already consumed.
    fn parse_struct_init(&mut self, name: Node<String>) -> Parse<ast::Expr> {
        let mut fields = Vec::new();
        if !self.at(Token::RBrace) {
            loop {
                let field = self.expect_ident("Expected field name.")?;
                self.expect(Token::Eq, "Expected '=' after field name.")?;
                let value = self.parse_expr()?;
                fields.push((field, value));
                if self.eat(Token::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(Token::RBrace, "Expected '}' after struct initializer.")?;
        Ok(Node {
            span: name.span.start..self.last_end,
            data: ast::Expr::StructInit { name, fields },
        })
    }
}

/// Decode the escape sequences of a string literal body (quotes stripped).
/// Unknown escapes keep the escaped character as-is.
fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
