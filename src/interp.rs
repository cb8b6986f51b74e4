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

//! The tree-walking interpreter.
//!
//! Values have value semantics: binding, passing and returning all behave
//! like copies. Strings, arrays and structs are reference-counted under the
//! hood and only actually copied when a binding mutates a shared value, so
//! the uniform-copy behavior costs one `Rc` bump in the common case.
//!
//! Integer arithmetic wraps modulo 2^64; integer division and modulo by zero
//! produce 0 and a warning rather than aborting. Mixed int/float arithmetic
//! promotes both sides to f64.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::ast::{self, Node};
use crate::backend::ResolvedProgram;
use crate::lexer::Span;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    span: Option<Span>,
    kind: EvalErrorKind,
}

impl EvalError {
    pub fn new(span: Option<Span>, kind: EvalErrorKind) -> Self {
        Self { span, kind }
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    pub fn kind(&self) -> &EvalErrorKind {
        &self.kind
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvalErrorKind {
    /// Callee is not a plain name the interpreter can dispatch on.
    Uncallable,
    UnknownFunction(String),
    UndefinedVariable(String),
    InvalidIndex,
    InvalidMember,
    NoSuchVariant { enum_name: String, variant: String },
    BreakOutsideLoop,
    ContinueOutsideLoop,
    NoEntryPoint,
    /// Constructs that only a native backend can give meaning to.
    Unsupported(&'static str),
    Io(String),
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalErrorKind::Uncallable => write!(f, "Invalid function call"),
            EvalErrorKind::UnknownFunction(name) => write!(f, "Unknown function: {}", name),
            EvalErrorKind::UndefinedVariable(name) => write!(f, "Undefined variable: {}", name),
            EvalErrorKind::InvalidIndex => write!(f, "Invalid array index"),
            EvalErrorKind::InvalidMember => write!(f, "Invalid member access"),
            EvalErrorKind::NoSuchVariant { enum_name, variant } => {
                write!(f, "Unknown enum variant: {}::{}", enum_name, variant)
            }
            EvalErrorKind::BreakOutsideLoop => write!(f, "'break' outside of loop"),
            EvalErrorKind::ContinueOutsideLoop => write!(f, "'continue' outside of loop"),
            EvalErrorKind::NoEntryPoint => write!(f, "No main function found"),
            EvalErrorKind::Unsupported(what) => write!(f, "Unsupported operation: {}", what),
            EvalErrorKind::Io(message) => write!(f, "I/O error: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Struct(Rc<Vec<(String, Value)>>),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// How control leaves a statement.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

type ValScope = Vec<(String, Value)>;

pub struct Interpreter<'p> {
    functions: HashMap<&'p str, &'p ast::FnDecl>,
    resolved: &'p ResolvedProgram,
    /// Scope 0 is the global scope; the current call frame owns the scopes
    /// from `frame_base` up.
    scopes: Vec<ValScope>,
    frame_base: usize,
    loop_depth: usize,
    out: Box<dyn Write + 'p>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Node<ast::Program>, resolved: &'p ResolvedProgram) -> Self {
        Self::with_output(program, resolved, Box::new(io::stdout()))
    }

    pub fn with_output(
        program: &'p Node<ast::Program>,
        resolved: &'p ResolvedProgram,
        out: Box<dyn Write + 'p>,
    ) -> Self {
        let mut functions = HashMap::new();
        for decl in &program.data.decls {
            if let ast::Decl::Fn(f) = &decl.data {
                if !f.is_extern && f.body.is_some() {
                    functions.insert(f.name.data.as_str(), f);
                }
            }
        }
        Interpreter {
            functions,
            resolved,
            scopes: vec![ValScope::new()],
            frame_base: 0,
            loop_depth: 0,
            out,
        }
    }

    /// Execute the program. The result is the process exit code: the entry
    /// point's integer return value, or 0 for anything else.
    pub fn run(&mut self) -> EvalResult<i64> {
        let entry = if self.functions.contains_key("main") {
            "main"
        } else if self.functions.contains_key("__repl_main__") {
            "__repl_main__"
        } else {
            return Err(EvalError::new(None, EvalErrorKind::NoEntryPoint));
        };

        let result = self.call_function(entry, Vec::new(), None)?;
        self.out
            .flush()
            .map_err(|e| EvalError::new(None, EvalErrorKind::Io(e.to_string())))?;
        Ok(match result {
            Value::Int(code) => code,
            _ => 0,
        })
    }

    // Scope plumbing

    fn define(&mut self, name: String, value: Value) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .push((name, value));
    }

    /// Locate a binding: innermost scope of the current frame outwards, then
    /// the global scope. Within a scope the latest binding shadows.
    fn find_slot(&self, name: &str) -> Option<(usize, usize)> {
        let extra = if self.frame_base > 0 { Some(0) } else { None };
        for idx in (self.frame_base..self.scopes.len()).rev().chain(extra) {
            if let Some(pos) = self.scopes[idx].iter().rposition(|(n, _)| n == name) {
                return Some((idx, pos));
            }
        }
        None
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.find_slot(name).map(|(i, p)| &self.scopes[i][p].1)
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.find_slot(name)
            .map(move |(i, p)| &mut self.scopes[i][p].1)
    }

    // Function calls

    fn call_function(
        &mut self,
        name: &str,
        args: Vec<Value>,
        span: Option<Span>,
    ) -> EvalResult<Value> {
        if let Some(result) = self.call_builtin(name, &args)? {
            return Ok(result);
        }

        let func: &'p ast::FnDecl = match self.functions.get(name) {
            Some(f) => f,
            None => {
                return Err(EvalError::new(
                    span,
                    EvalErrorKind::UnknownFunction(name.to_string()),
                ))
            }
        };
        let body = func.body.as_ref().expect("registered functions have bodies");

        let saved_base = self.frame_base;
        let saved_depth = self.loop_depth;
        self.frame_base = self.scopes.len();
        self.loop_depth = 0;
        self.scopes.push(ValScope::new());
        for (param, arg) in func.params.iter().zip(args) {
            self.define(param.data.name.clone(), arg);
        }

        let flow = self.exec_block(body);

        self.scopes.truncate(self.frame_base);
        self.frame_base = saved_base;
        self.loop_depth = saved_depth;

        Ok(match flow? {
            Flow::Return(value) => value,
            _ => Value::Void,
        })
    }

    /// Host primitives are dispatched before user functions, mirroring the
    /// native runtime. Returns `None` when `name` is not a builtin.
    fn call_builtin(&mut self, name: &str, args: &[Value]) -> EvalResult<Option<Value>> {
        let result = match name {
            "puts" | "print" => {
                if let Some(Value::Str(s)) = args.first() {
                    self.write_out(format_args!("{}\n", s))?;
                }
                Value::Void
            }
            "print_int" => {
                if let Some(Value::Int(i)) = args.first() {
                    self.write_out(format_args!("{}", i))?;
                }
                Value::Void
            }
            "println" => {
                self.write_out(format_args!("\n"))?;
                Value::Void
            }
            "putchar" => {
                if let Some(Value::Int(c)) = args.first() {
                    let byte = [*c as u8];
                    self.out
                        .write_all(&byte)
                        .map_err(|e| EvalError::new(None, EvalErrorKind::Io(e.to_string())))?;
                }
                Value::Int(0)
            }
            "getchar" => {
                let mut byte = [0u8];
                match io::stdin().read(&mut byte) {
                    Ok(1) => Value::Int(i64::from(byte[0])),
                    _ => Value::Int(-1),
                }
            }
            "exit" => {
                let code = match args.first() {
                    Some(Value::Int(c)) => *c as i32,
                    _ => 0,
                };
                let _ = self.out.flush();
                std::process::exit(code);
            }
            _ => return Ok(None),
        };
        Ok(Some(result))
    }

    fn write_out(&mut self, args: fmt::Arguments<'_>) -> EvalResult<()> {
        self.out
            .write_fmt(args)
            .map_err(|e| EvalError::new(None, EvalErrorKind::Io(e.to_string())))
    }

    // Statements

    fn exec_block(&mut self, block: &'p Node<ast::Block>) -> EvalResult<Flow> {
        for stmt in &block.data.stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block_scoped(&mut self, block: &'p Node<ast::Block>) -> EvalResult<Flow> {
        self.scopes.push(ValScope::new());
        let flow = self.exec_block(block);
        self.scopes.pop();
        flow
    }

    fn exec_stmt(&mut self, stmt: &'p Node<ast::Stmt>) -> EvalResult<Flow> {
        match &stmt.data {
            ast::Stmt::Var(v) => {
                let value = self.eval(&v.init)?;
                self.define(v.name.data.clone(), value);
                Ok(Flow::Normal)
            }
            ast::Stmt::Ret(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }
            ast::Stmt::Break => {
                if self.loop_depth == 0 {
                    Err(EvalError::new(
                        Some(stmt.span.clone()),
                        EvalErrorKind::BreakOutsideLoop,
                    ))
                } else {
                    Ok(Flow::Break)
                }
            }
            ast::Stmt::Continue => {
                if self.loop_depth == 0 {
                    Err(EvalError::new(
                        Some(stmt.span.clone()),
                        EvalErrorKind::ContinueOutsideLoop,
                    ))
                } else {
                    Ok(Flow::Continue)
                }
            }
            ast::Stmt::If(if_stmt) => {
                if is_true(&self.eval(&if_stmt.cond)?) {
                    return self.exec_block_scoped(&if_stmt.then_block);
                }
                for (cond, block) in &if_stmt.elifs {
                    if is_true(&self.eval(cond)?) {
                        return self.exec_block_scoped(block);
                    }
                }
                match &if_stmt.else_block {
                    Some(block) => self.exec_block_scoped(block),
                    None => Ok(Flow::Normal),
                }
            }
            ast::Stmt::While(w) => {
                self.loop_depth += 1;
                let mut outcome = Ok(Flow::Normal);
                loop {
                    let cond = match self.eval(&w.cond) {
                        Ok(cond) => cond,
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    };
                    if !is_true(&cond) {
                        break;
                    }
                    match self.exec_block_scoped(&w.body) {
                        Ok(Flow::Normal) | Ok(Flow::Continue) => {}
                        Ok(Flow::Break) => break,
                        Ok(Flow::Return(value)) => {
                            outcome = Ok(Flow::Return(value));
                            break;
                        }
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    }
                }
                self.loop_depth -= 1;
                outcome
            }
            ast::Stmt::For(f) => {
                let start = self.eval(&f.start)?;
                let end = self.eval(&f.end)?;
                let (start, end) = match (start, end) {
                    (Value::Int(s), Value::Int(e)) => (s, e),
                    // non-integer ranges do not iterate
                    _ => return Ok(Flow::Normal),
                };

                self.scopes.push(ValScope::new());
                self.define(f.var.data.clone(), Value::Int(start));
                self.loop_depth += 1;
                let mut outcome = Ok(Flow::Normal);
                loop {
                    match self.lookup(&f.var.data) {
                        Some(Value::Int(i)) if *i < end => {}
                        _ => break,
                    }
                    match self.exec_block_scoped(&f.body) {
                        Ok(Flow::Normal) | Ok(Flow::Continue) => {}
                        Ok(Flow::Break) => break,
                        Ok(Flow::Return(value)) => {
                            outcome = Ok(Flow::Return(value));
                            break;
                        }
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    }
                    if let Some(Value::Int(slot)) = self.lookup_mut(&f.var.data) {
                        *slot = slot.wrapping_add(1);
                    }
                }
                self.loop_depth -= 1;
                self.scopes.pop();
                outcome
            }
            ast::Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    // Expressions

    fn eval(&mut self, expr: &'p Node<ast::Expr>) -> EvalResult<Value> {
        match &expr.data {
            ast::Expr::Int(i) => Ok(Value::Int(*i)),
            ast::Expr::Float(f) => Ok(Value::Float(*f)),
            ast::Expr::Bool(b) => Ok(Value::Bool(*b)),
            ast::Expr::Str(s) => Ok(Value::Str(Rc::from(s.as_str()))),
            ast::Expr::Ident(name) => match self.lookup(name) {
                Some(value) => Ok(value.clone()),
                None => Err(EvalError::new(
                    Some(expr.span.clone()),
                    EvalErrorKind::UndefinedVariable(name.clone()),
                )),
            },
            ast::Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op.data, value) {
                    (ast::UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
                    (ast::UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                    (ast::UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (ast::UnaryOp::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
                    (ast::UnaryOp::Addr, _) => Err(EvalError::new(
                        Some(expr.span.clone()),
                        EvalErrorKind::Unsupported("address-of in interpreted code"),
                    )),
                    (ast::UnaryOp::Deref, _) => Err(EvalError::new(
                        Some(expr.span.clone()),
                        EvalErrorKind::Unsupported("dereference in interpreted code"),
                    )),
                    _ => Ok(Value::Void),
                }
            }
            ast::Expr::Binary { op, left, right } => self.eval_binary(op.data, left, right),
            ast::Expr::Assign { target, value } => self.eval_assign(target, value),
            ast::Expr::Call { callee, args } => {
                let name = match &callee.data {
                    ast::Expr::Ident(name) => name.as_str(),
                    _ => {
                        return Err(EvalError::new(
                            Some(callee.span.clone()),
                            EvalErrorKind::Uncallable,
                        ))
                    }
                };
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg)?);
                }
                self.call_function(name, arg_values, Some(expr.span.clone()))
            }
            ast::Expr::Member { object, field } => {
                let object = self.eval(object)?;
                if let Value::Struct(fields) = &object {
                    if let Some((_, value)) = fields.iter().find(|(n, _)| n == &field.data) {
                        return Ok(value.clone());
                    }
                }
                Err(EvalError::new(
                    Some(expr.span.clone()),
                    EvalErrorKind::InvalidMember,
                ))
            }
            ast::Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                if let (Value::Array(elems), Value::Int(i)) = (&object, &index) {
                    if *i >= 0 && (*i as usize) < elems.len() {
                        return Ok(elems[*i as usize].clone());
                    }
                }
                Err(EvalError::new(
                    Some(expr.span.clone()),
                    EvalErrorKind::InvalidIndex,
                ))
            }
            ast::Expr::StructInit { fields, .. } => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    values.push((name.data.clone(), self.eval(value)?));
                }
                Ok(Value::Struct(Rc::new(values)))
            }
            ast::Expr::ArrayInit { elems } => {
                let mut values = Vec::with_capacity(elems.len());
                for elem in elems {
                    values.push(self.eval(elem)?);
                }
                Ok(Value::Array(Rc::new(values)))
            }
            ast::Expr::EnumVariant { enum_name, variant } => {
                let value = self
                    .resolved
                    .enum_layout(&enum_name.data)
                    .and_then(|layout| layout.variant_value(&variant.data));
                match value {
                    Some(value) => Ok(Value::Int(value)),
                    None => Err(EvalError::new(
                        Some(expr.span.clone()),
                        EvalErrorKind::NoSuchVariant {
                            enum_name: enum_name.data.clone(),
                            variant: variant.data.clone(),
                        },
                    )),
                }
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: ast::BinaryOp,
        left: &'p Node<ast::Expr>,
        right: &'p Node<ast::Expr>,
    ) -> EvalResult<Value> {
        use ast::BinaryOp::*;

        // `and`/`or` short-circuit before the right side is touched.
        if op == And || op == Or {
            let lhs = match self.eval(left)? {
                Value::Bool(b) => b,
                _ => {
                    return Err(EvalError::new(
                        Some(left.span.clone()),
                        EvalErrorKind::Unsupported("logical operator on non-bool"),
                    ))
                }
            };
            if op == And && !lhs {
                return Ok(Value::Bool(false));
            }
            if op == Or && lhs {
                return Ok(Value::Bool(true));
            }
            let rhs = match self.eval(right)? {
                Value::Bool(b) => b,
                _ => {
                    return Err(EvalError::new(
                        Some(right.span.clone()),
                        EvalErrorKind::Unsupported("logical operator on non-bool"),
                    ))
                }
            };
            return Ok(Value::Bool(rhs));
        }

        let lhs = self.eval(left)?;
        let rhs = self.eval(right)?;

        if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
            let (a, b) = (*a, *b);
            return Ok(match op {
                Add => Value::Int(a.wrapping_add(b)),
                Sub => Value::Int(a.wrapping_sub(b)),
                Mul => Value::Int(a.wrapping_mul(b)),
                Div => {
                    if b == 0 {
                        log::warn!("integer division by zero yields 0");
                        Value::Int(0)
                    } else {
                        Value::Int(a.wrapping_div(b))
                    }
                }
                Mod => {
                    if b == 0 {
                        log::warn!("integer modulo by zero yields 0");
                        Value::Int(0)
                    } else {
                        Value::Int(a.wrapping_rem(b))
                    }
                }
                Eq => Value::Bool(a == b),
                Ne => Value::Bool(a != b),
                Lt => Value::Bool(a < b),
                Le => Value::Bool(a <= b),
                Gt => Value::Bool(a > b),
                Ge => Value::Bool(a >= b),
                BitAnd => Value::Int(a & b),
                BitOr => Value::Int(a | b),
                BitXor => Value::Int(a ^ b),
                Shl => Value::Int(a.wrapping_shl(b as u32)),
                Shr => Value::Int(a.wrapping_shr(b as u32)),
                And | Or => unreachable!("handled above"),
            });
        }

        // Mixed int/float promotes both sides to double.
        if let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) {
            return Ok(match op {
                Add => Value::Float(a + b),
                Sub => Value::Float(a - b),
                Mul => Value::Float(a * b),
                Div => Value::Float(a / b),
                Eq => Value::Bool(a == b),
                Ne => Value::Bool(a != b),
                Lt => Value::Bool(a < b),
                Le => Value::Bool(a <= b),
                Gt => Value::Bool(a > b),
                Ge => Value::Bool(a >= b),
                _ => Value::Void,
            });
        }

        if let (Value::Bool(a), Value::Bool(b)) = (&lhs, &rhs) {
            return Ok(match op {
                Eq => Value::Bool(a == b),
                Ne => Value::Bool(a != b),
                _ => Value::Void,
            });
        }

        if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
            return Ok(match op {
                Eq => Value::Bool(a == b),
                Ne => Value::Bool(a != b),
                _ => Value::Void,
            });
        }

        Ok(Value::Void)
    }

    fn eval_assign(
        &mut self,
        target: &'p Node<ast::Expr>,
        value: &'p Node<ast::Expr>,
    ) -> EvalResult<Value> {
        let value = self.eval(value)?;
        match &target.data {
            ast::Expr::Ident(name) => match self.lookup_mut(name) {
                Some(slot) => {
                    *slot = value.clone();
                    Ok(value)
                }
                None => Err(EvalError::new(
                    Some(target.span.clone()),
                    EvalErrorKind::UndefinedVariable(name.clone()),
                )),
            },
            ast::Expr::Index { object, index } => {
                let name = match &object.data {
                    ast::Expr::Ident(name) => name.clone(),
                    _ => {
                        return Err(EvalError::new(
                            Some(target.span.clone()),
                            EvalErrorKind::Unsupported("assignment to a computed array"),
                        ))
                    }
                };
                let index = self.eval(index)?;
                let span = target.span.clone();
                match (self.lookup_mut(&name), index) {
                    (Some(Value::Array(elems)), Value::Int(i)) => {
                        let elems = Rc::make_mut(elems);
                        if i >= 0 && (i as usize) < elems.len() {
                            elems[i as usize] = value.clone();
                            Ok(value)
                        } else {
                            Err(EvalError::new(Some(span), EvalErrorKind::InvalidIndex))
                        }
                    }
                    _ => Err(EvalError::new(Some(span), EvalErrorKind::InvalidIndex)),
                }
            }
            ast::Expr::Member { object, field } => {
                let name = match &object.data {
                    ast::Expr::Ident(name) => name.clone(),
                    _ => {
                        return Err(EvalError::new(
                            Some(target.span.clone()),
                            EvalErrorKind::Unsupported("assignment to a computed struct"),
                        ))
                    }
                };
                let span = target.span.clone();
                match self.lookup_mut(&name) {
                    Some(Value::Struct(fields)) => {
                        let fields = Rc::make_mut(fields);
                        match fields.iter_mut().find(|(n, _)| n == &field.data) {
                            Some((_, slot)) => {
                                *slot = value.clone();
                                Ok(value)
                            }
                            None => {
                                Err(EvalError::new(Some(span), EvalErrorKind::InvalidMember))
                            }
                        }
                    }
                    _ => Err(EvalError::new(Some(span), EvalErrorKind::InvalidMember)),
                }
            }
            _ => Err(EvalError::new(
                Some(target.span.clone()),
                EvalErrorKind::Unsupported("assignment target"),
            )),
        }
    }
}

fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}
