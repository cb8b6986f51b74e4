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

//! The abstract syntax tree.
//!
//! Every node carries its byte span into the preprocessed buffer; line and
//! column positions are recovered through [`crate::line_map::LineMap`] when a
//! diagnostic needs them. Parents own their children exclusively, so dropping
//! the root drops the whole tree.

use std::fmt::Write;

use crate::lexer::Span;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub span: Span,
    pub data: T,
}

pub type NodePtr<T> = Box<Node<T>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<Node<Decl>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Fn(FnDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Use(UseDecl),
    Extern(ExternBlock),
    /// Top-level statement (script-style code outside any function).
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: Node<String>,
    pub params: Vec<Node<Param>>,
    pub ret: Node<Type>,
    /// Absent for functions declared inside `@extern` blocks.
    pub body: Option<Node<Block>>,
    pub is_extern: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Node<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: Node<String>,
    pub fields: Vec<(Node<String>, Node<Type>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Node<String>,
    /// Variant names with resolved discriminants (auto-increment applied).
    pub variants: Vec<(Node<String>, i64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    pub path: Node<String>,
    pub alias: Option<Node<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternBlock {
    pub abi: Node<String>,
    pub fns: Vec<Node<FnDecl>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    Let,
    Mut,
    Const,
}

impl BindKind {
    pub fn is_mut(self) -> bool {
        matches!(self, BindKind::Mut)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub bind: BindKind,
    pub name: Node<String>,
    /// The annotated type, or the inferred one once analysis has run.
    pub ty: Option<Node<Type>>,
    pub init: Node<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Node<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    Ret(Option<Node<Expr>>),
    Break,
    Continue,
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Expr(Node<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Node<Expr>,
    pub then_block: Node<Block>,
    pub elifs: Vec<(Node<Expr>, Node<Block>)>,
    pub else_block: Option<Node<Block>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Node<Expr>,
    pub body: Node<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var: Node<String>,
    pub start: Node<Expr>,
    pub end: Node<Expr>,
    pub body: Node<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    /// Escape sequences already decoded.
    Str(String),
    Bool(bool),
    Ident(String),
    Unary {
        op: Node<UnaryOp>,
        operand: NodePtr<Expr>,
    },
    Binary {
        op: Node<BinaryOp>,
        left: NodePtr<Expr>,
        right: NodePtr<Expr>,
    },
    Assign {
        target: NodePtr<Expr>,
        value: NodePtr<Expr>,
    },
    Call {
        callee: NodePtr<Expr>,
        args: Vec<Node<Expr>>,
    },
    Member {
        object: NodePtr<Expr>,
        field: Node<String>,
    },
    Index {
        object: NodePtr<Expr>,
        index: NodePtr<Expr>,
    },
    StructInit {
        name: Node<String>,
        fields: Vec<(Node<String>, Node<Expr>)>,
    },
    ArrayInit {
        elems: Vec<Node<Expr>>,
    },
    EnumVariant {
        enum_name: Node<String>,
        variant: Node<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Addr,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

/// Render the tree back to parseable source.
///
/// Expressions come out fully parenthesized, so reparsing the result yields
/// the same structure regardless of the original spelling. Only trees that
/// have not been analyzed round-trip: inferred annotations added later may
/// name types the surface grammar cannot spell.
pub fn to_source(program: &Node<Program>) -> String {
    let mut out = String::new();
    for decl in &program.data.decls {
        emit_decl(&mut out, &decl.data);
        out.push('\n');
    }
    out
}

fn emit_decl(out: &mut String, decl: &Decl) {
    match decl {
        Decl::Fn(f) => emit_fn(out, f),
        Decl::Struct(s) => {
            writeln!(out, "struct {} do", s.name.data).unwrap();
            for (name, ty) in &s.fields {
                writeln!(out, "    {} :: {}", name.data, ty.data).unwrap();
            }
            writeln!(out, "end").unwrap();
        }
        Decl::Enum(e) => {
            writeln!(out, "enum {} do", e.name.data).unwrap();
            for (name, value) in &e.variants {
                writeln!(out, "    {} = {}", name.data, value).unwrap();
            }
            writeln!(out, "end").unwrap();
        }
        Decl::Use(u) => {
            write!(out, "@use \"{}\"", escape_str(&u.path.data)).unwrap();
            if let Some(alias) = &u.alias {
                write!(out, " as {}", alias.data).unwrap();
            }
            out.push('\n');
        }
        Decl::Extern(ext) => {
            writeln!(out, "@extern \"{}\" do", escape_str(&ext.abi.data)).unwrap();
            for f in &ext.fns {
                emit_fn(out, &f.data);
            }
            writeln!(out, "end").unwrap();
        }
        Decl::Stmt(stmt) => emit_stmt(out, stmt),
    }
}

fn emit_fn(out: &mut String, f: &FnDecl) {
    write!(out, "fn {}(", f.name.data).unwrap();
    for (i, p) in f.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write!(out, "{} :: {}", p.data.name, p.data.ty.data).unwrap();
    }
    write!(out, ") -> {}", f.ret.data).unwrap();
    match &f.body {
        Some(body) => {
            out.push_str(" do\n");
            emit_block(out, body);
            out.push_str("end\n");
        }
        None => out.push('\n'),
    }
}

fn emit_block(out: &mut String, block: &Node<Block>) {
    for stmt in &block.data.stmts {
        emit_stmt(out, &stmt.data);
    }
}

fn emit_stmt(out: &mut String, stmt: &Stmt) {
    match stmt {
        Stmt::Var(v) => {
            let bind = match v.bind {
                BindKind::Let => "let",
                BindKind::Mut => "mut",
                BindKind::Const => "const",
            };
            write!(out, "{} {}", bind, v.name.data).unwrap();
            if let Some(ty) = &v.ty {
                write!(out, " :: {}", ty.data).unwrap();
            }
            writeln!(out, " = {}", emit_expr(&v.init.data)).unwrap();
        }
        Stmt::Ret(None) => writeln!(out, "ret").unwrap(),
        Stmt::Ret(Some(value)) => writeln!(out, "ret {}", emit_expr(&value.data)).unwrap(),
        Stmt::Break => writeln!(out, "break").unwrap(),
        Stmt::Continue => writeln!(out, "continue").unwrap(),
        Stmt::If(if_stmt) => {
            writeln!(out, "if {} do", emit_expr(&if_stmt.cond.data)).unwrap();
            emit_block(out, &if_stmt.then_block);
            for (cond, block) in &if_stmt.elifs {
                writeln!(out, "elif {} do", emit_expr(&cond.data)).unwrap();
                emit_block(out, block);
            }
            if let Some(block) = &if_stmt.else_block {
                writeln!(out, "else do").unwrap();
                emit_block(out, block);
            }
            writeln!(out, "end").unwrap();
        }
        Stmt::While(w) => {
            writeln!(out, "while {} do", emit_expr(&w.cond.data)).unwrap();
            emit_block(out, &w.body);
            writeln!(out, "end").unwrap();
        }
        Stmt::For(f) => {
            writeln!(
                out,
                "for {} in {}..{} do",
                f.var.data,
                emit_expr(&f.start.data),
                emit_expr(&f.end.data)
            )
            .unwrap();
            emit_block(out, &f.body);
            writeln!(out, "end").unwrap();
        }
        Stmt::Expr(expr) => writeln!(out, "{}", emit_expr(&expr.data)).unwrap(),
    }
}

fn emit_expr(expr: &Expr) -> String {
    match expr {
        Expr::Int(v) => v.to_string(),
        // Debug formatting keeps the decimal point on round values.
        Expr::Float(v) => format!("{:?}", v),
        Expr::Str(s) => format!("\"{}\"", escape_str(s)),
        Expr::Bool(b) => b.to_string(),
        Expr::Ident(name) => name.clone(),
        Expr::Unary { op, operand } => {
            let op = match op.data {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "not ",
                UnaryOp::BitNot => "~",
                UnaryOp::Addr => "&",
                UnaryOp::Deref => "*",
            };
            format!("({}{})", op, emit_expr(&operand.data))
        }
        Expr::Binary { op, left, right } => format!(
            "({} {} {})",
            emit_expr(&left.data),
            op.data.symbol(),
            emit_expr(&right.data)
        ),
        Expr::Assign { target, value } => {
            format!("({} = {})", emit_expr(&target.data), emit_expr(&value.data))
        }
        Expr::Call { callee, args } => {
            let args = args
                .iter()
                .map(|arg| emit_expr(&arg.data))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", emit_expr(&callee.data), args)
        }
        Expr::Member { object, field } => {
            format!("({}.{})", emit_expr(&object.data), field.data)
        }
        Expr::Index { object, index } => {
            format!("({}[{}])", emit_expr(&object.data), emit_expr(&index.data))
        }
        Expr::StructInit { name, fields } => {
            let fields = fields
                .iter()
                .map(|(field, value)| format!("{} = {}", field.data, emit_expr(&value.data)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} {{ {} }}", name.data, fields)
        }
        Expr::ArrayInit { elems } => {
            let elems = elems
                .iter()
                .map(|elem| emit_expr(&elem.data))
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{}]", elems)
        }
        Expr::EnumVariant { enum_name, variant } => {
            format!("{}::{}", enum_name.data, variant.data)
        }
    }
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out
}

/// Render an indented dump of the tree, used by the `ast` CLI subcommand.
pub fn dump(program: &Node<Program>) -> String {
    let mut out = String::new();
    writeln!(out, "Program:").unwrap();
    for decl in &program.data.decls {
        dump_decl(&mut out, decl, 1);
    }
    out
}

fn pad(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn dump_decl(out: &mut String, decl: &Node<Decl>, indent: usize) {
    if let Decl::Stmt(stmt) = &decl.data {
        return dump_stmt(out, stmt, indent);
    }
    pad(out, indent);
    match &decl.data {
        Decl::Fn(f) => {
            writeln!(out, "FnDecl: {}", f.name.data).unwrap();
            for p in &f.params {
                pad(out, indent + 1);
                writeln!(out, "Param: {} :: {}", p.data.name, p.data.ty.data).unwrap();
            }
            if let Some(body) = &f.body {
                dump_block(out, body, indent + 1);
            }
        }
        Decl::Struct(s) => {
            writeln!(out, "StructDecl: {}", s.name.data).unwrap();
            for (name, ty) in &s.fields {
                pad(out, indent + 1);
                writeln!(out, "Field: {} :: {}", name.data, ty.data).unwrap();
            }
        }
        Decl::Enum(e) => {
            writeln!(out, "EnumDecl: {}", e.name.data).unwrap();
            for (name, value) in &e.variants {
                pad(out, indent + 1);
                writeln!(out, "Variant: {} = {}", name.data, value).unwrap();
            }
        }
        Decl::Use(u) => {
            writeln!(out, "Use: {}", u.path.data).unwrap();
        }
        Decl::Extern(ext) => {
            writeln!(out, "Extern: \"{}\"", ext.abi.data).unwrap();
            for f in &ext.fns {
                pad(out, indent + 1);
                writeln!(out, "FnDecl: {}", f.data.name.data).unwrap();
            }
        }
        Decl::Stmt(_) => unreachable!("handled above"),
    }
}

fn dump_block(out: &mut String, block: &Node<Block>, indent: usize) {
    pad(out, indent);
    writeln!(out, "Block:").unwrap();
    for stmt in &block.data.stmts {
        dump_stmt(out, &stmt.data, indent + 1);
    }
}

fn dump_stmt(out: &mut String, stmt: &Stmt, indent: usize) {
    if let Stmt::Expr(expr) = stmt {
        return dump_expr(out, expr, indent);
    }
    pad(out, indent);
    match stmt {
        Stmt::Var(v) => {
            let bind = match v.bind {
                BindKind::Let => "let",
                BindKind::Mut => "mut",
                BindKind::Const => "const",
            };
            writeln!(out, "VarDecl: {} {}", bind, v.name.data).unwrap();
            dump_expr(out, &v.init, indent + 1);
        }
        Stmt::Ret(value) => {
            writeln!(out, "Return:").unwrap();
            if let Some(value) = value {
                dump_expr(out, value, indent + 1);
            }
        }
        Stmt::Break => writeln!(out, "Break").unwrap(),
        Stmt::Continue => writeln!(out, "Continue").unwrap(),
        Stmt::If(if_stmt) => {
            writeln!(out, "If:").unwrap();
            dump_expr(out, &if_stmt.cond, indent + 1);
            dump_block(out, &if_stmt.then_block, indent + 1);
            for (cond, block) in &if_stmt.elifs {
                pad(out, indent + 1);
                writeln!(out, "Elif:").unwrap();
                dump_expr(out, cond, indent + 2);
                dump_block(out, block, indent + 2);
            }
            if let Some(block) = &if_stmt.else_block {
                pad(out, indent + 1);
                writeln!(out, "Else:").unwrap();
                dump_block(out, block, indent + 2);
            }
        }
        Stmt::While(w) => {
            writeln!(out, "While:").unwrap();
            dump_expr(out, &w.cond, indent + 1);
            dump_block(out, &w.body, indent + 1);
        }
        Stmt::For(f) => {
            writeln!(out, "For: {}", f.var.data).unwrap();
            dump_expr(out, &f.start, indent + 1);
            dump_expr(out, &f.end, indent + 1);
            dump_block(out, &f.body, indent + 1);
        }
        Stmt::Expr(_) => unreachable!("handled above"),
    }
}

fn dump_expr(out: &mut String, expr: &Node<Expr>, indent: usize) {
    pad(out, indent);
    match &expr.data {
        Expr::Int(v) => writeln!(out, "Int: {}", v).unwrap(),
        Expr::Float(v) => writeln!(out, "Float: {}", v).unwrap(),
        Expr::Str(s) => writeln!(out, "String: {:?}", s).unwrap(),
        Expr::Bool(b) => writeln!(out, "Bool: {}", b).unwrap(),
        Expr::Ident(name) => writeln!(out, "Ident: {}", name).unwrap(),
        Expr::Unary { op, operand } => {
            writeln!(out, "Unary: {:?}", op.data).unwrap();
            dump_expr(out, operand, indent + 1);
        }
        Expr::Binary { op, left, right } => {
            writeln!(out, "Binary: {}", op.data.symbol()).unwrap();
            dump_expr(out, left, indent + 1);
            dump_expr(out, right, indent + 1);
        }
        Expr::Assign { target, value } => {
            writeln!(out, "Assign:").unwrap();
            dump_expr(out, target, indent + 1);
            dump_expr(out, value, indent + 1);
        }
        Expr::Call { callee, args } => {
            writeln!(out, "Call:").unwrap();
            dump_expr(out, callee, indent + 1);
            for arg in args {
                dump_expr(out, arg, indent + 1);
            }
        }
        Expr::Member { object, field } => {
            writeln!(out, "Member: .{}", field.data).unwrap();
            dump_expr(out, object, indent + 1);
        }
        Expr::Index { object, index } => {
            writeln!(out, "Index:").unwrap();
            dump_expr(out, object, indent + 1);
            dump_expr(out, index, indent + 1);
        }
        Expr::StructInit { name, fields } => {
            writeln!(out, "StructInit: {}", name.data).unwrap();
            for (field, value) in fields {
                pad(out, indent + 1);
                writeln!(out, "Field: {}", field.data).unwrap();
                dump_expr(out, value, indent + 2);
            }
        }
        Expr::ArrayInit { elems } => {
            writeln!(out, "ArrayInit:").unwrap();
            for elem in elems {
                dump_expr(out, elem, indent + 1);
            }
        }
        Expr::EnumVariant { enum_name, variant } => {
            writeln!(out, "EnumVariant: {}::{}", enum_name.data, variant.data).unwrap();
        }
    }
}
