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

//! Semantic analysis.
//!
//! Two passes over the program: the first hoists every top-level function,
//! struct, enum and extern declaration into the global scope and into the
//! [`ResolvedProgram`]; the second walks function bodies with a stack of
//! lexical scopes, infers binding types, checks operand and arity
//! compatibility and enforces mutability.
//!
//! The analyzer reports the first error it encounters and keeps walking the
//! rest of the tree silently. Unresolved identifiers are only an error in
//! call position; elsewhere they may be module-qualified names that a
//! backend resolves later.

use crate::ast::{self, Node};
use crate::backend::{EnumLayout, FnSig, ResolvedProgram, StructLayout};
use crate::diag::Diagnostic;
use crate::line_map::LineMap;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Fn,
    Struct,
    Enum,
    Param,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub is_mut: bool,
    pub is_extern: bool,
}

#[derive(Debug, Default)]
struct Scope {
    symbols: Vec<Symbol>,
}

/// Nested lexical scopes as a stack; the parent relation is the stack order,
/// so an early return or an error path can never leak a scope chain.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::default()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "global scope must stay");
        self.scopes.pop();
    }

    fn define(&mut self, symbol: Symbol) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .symbols
            .push(symbol);
    }

    /// Innermost match wins; within a scope the latest definition shadows.
    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.symbols.iter().rev())
            .find(|sym| sym.name == name)
    }

    fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .last()
            .and_then(|scope| scope.symbols.iter().rev().find(|sym| sym.name == name))
    }
}

pub struct AnalysisOutcome {
    pub resolved: ResolvedProgram,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisOutcome {
    pub fn had_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Analyze the program in place: binding types are filled in, and the
/// resolved entity tables are returned for the interpreter or a backend.
pub fn analyze(program: &mut Node<ast::Program>, map: &LineMap) -> AnalysisOutcome {
    let mut analyzer = Analyzer {
        scopes: ScopeStack::new(),
        resolved: ResolvedProgram::default(),
        diagnostics: Vec::new(),
        had_error: false,
        map,
    };
    analyzer.hoist_top_level(program);
    analyzer.define_missing_builtins();
    for decl in &mut program.data.decls {
        analyzer.analyze_decl(decl);
    }
    AnalysisOutcome {
        resolved: analyzer.resolved,
        diagnostics: analyzer.diagnostics,
    }
}

struct Analyzer<'a> {
    scopes: ScopeStack,
    resolved: ResolvedProgram,
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
    map: &'a LineMap<'a>,
}

impl<'a> Analyzer<'a> {
    /// First-error mode: later errors are dropped, the walk continues.
    fn error(&mut self, span: crate::lexer::Span, message: impl Into<String>) {
        if !self.had_error {
            self.diagnostics
                .push(Diagnostic::new(span, self.map, message));
        }
        self.had_error = true;
    }

    // Pass 1: top-level hoisting

    fn hoist_top_level(&mut self, program: &Node<ast::Program>) {
        for decl in &program.data.decls {
            match &decl.data {
                ast::Decl::Fn(f) => self.hoist_fn(f),
                ast::Decl::Extern(ext) => {
                    for f in &ext.fns {
                        self.hoist_fn(&f.data);
                    }
                }
                ast::Decl::Struct(s) => self.hoist_struct(s),
                ast::Decl::Enum(e) => self.hoist_enum(e),
                ast::Decl::Use(_) | ast::Decl::Stmt(_) => {}
            }
        }
    }

    fn hoist_fn(&mut self, f: &ast::FnDecl) {
        let sig = FnSig {
            name: f.name.data.clone(),
            params: f
                .params
                .iter()
                .map(|p| (p.data.name.clone(), p.data.ty.data.clone()))
                .collect(),
            ret: f.ret.data.clone(),
            is_extern: f.is_extern,
        };
        if self.scopes.lookup_local(&f.name.data).is_some() {
            self.error(f.name.span.clone(), "Duplicate function declaration.");
            return;
        }
        self.scopes.define(Symbol {
            name: sig.name.clone(),
            kind: SymbolKind::Fn,
            ty: Type::Fn {
                ret: Box::new(sig.ret.clone()),
                params: sig.params.iter().map(|(_, ty)| ty.clone()).collect(),
            },
            is_mut: false,
            is_extern: f.is_extern,
        });
        self.resolved.functions.push(sig);
    }

    fn hoist_struct(&mut self, s: &ast::StructDecl) {
        let layout = StructLayout {
            name: s.name.data.clone(),
            fields: s
                .fields
                .iter()
                .map(|(name, ty)| (name.data.clone(), ty.data.clone()))
                .collect(),
        };
        if self.scopes.lookup_local(&s.name.data).is_some() {
            self.error(s.name.span.clone(), "Duplicate struct declaration.");
            return;
        }
        self.scopes.define(Symbol {
            name: layout.name.clone(),
            kind: SymbolKind::Struct,
            ty: Type::Struct {
                name: layout.name.clone(),
                fields: layout.fields.clone(),
            },
            is_mut: false,
            is_extern: false,
        });
        self.resolved.structs.push(layout);
    }

    fn hoist_enum(&mut self, e: &ast::EnumDecl) {
        let layout = EnumLayout {
            name: e.name.data.clone(),
            variants: e
                .variants
                .iter()
                .map(|(name, value)| (name.data.clone(), *value))
                .collect(),
        };
        if self.scopes.lookup_local(&e.name.data).is_some() {
            self.error(e.name.span.clone(), "Duplicate enum declaration.");
            return;
        }
        self.scopes.define(Symbol {
            name: layout.name.clone(),
            kind: SymbolKind::Enum,
            ty: Type::Enum {
                name: layout.name.clone(),
                variants: layout.variants.clone(),
            },
            is_mut: false,
            is_extern: false,
        });
        self.resolved.enums.push(layout);
    }

    /// The interpreter's host primitives are callable without declaration.
    /// User or header declarations of the same names win.
    fn define_missing_builtins(&mut self) {
        let builtins: &[(&str, &[Type], Type)] = &[
            ("puts", &[Type::Ptr(Box::new(Type::U8))], Type::I32),
            ("print", &[Type::Ptr(Box::new(Type::U8))], Type::Void),
            ("print_int", &[Type::I64], Type::Void),
            ("println", &[], Type::Void),
            ("putchar", &[Type::I32], Type::I32),
            ("getchar", &[], Type::I32),
            ("exit", &[Type::I32], Type::Void),
        ];
        for (name, params, ret) in builtins {
            if self.scopes.lookup_local(name).is_none() {
                self.scopes.define(Symbol {
                    name: (*name).to_string(),
                    kind: SymbolKind::Fn,
                    ty: Type::Fn {
                        ret: Box::new(ret.clone()),
                        params: params.to_vec(),
                    },
                    is_mut: false,
                    is_extern: true,
                });
            }
        }
    }

    // Pass 2: bodies

    fn analyze_decl(&mut self, decl: &mut Node<ast::Decl>) {
        match &mut decl.data {
            ast::Decl::Fn(f) => self.analyze_fn(f),
            ast::Decl::Stmt(stmt) => {
                let span = decl.span.clone();
                self.analyze_stmt_data(stmt, span);
            }
            // Hoisted or handled by the preprocessor.
            ast::Decl::Struct(_)
            | ast::Decl::Enum(_)
            | ast::Decl::Use(_)
            | ast::Decl::Extern(_) => {}
        }
    }

    fn analyze_fn(&mut self, f: &mut ast::FnDecl) {
        let body = match &mut f.body {
            Some(body) => body,
            // extern functions have no body to check
            None => return,
        };

        self.scopes.push();
        for param in &f.params {
            self.scopes.define(Symbol {
                name: param.data.name.clone(),
                kind: SymbolKind::Param,
                ty: param.data.ty.data.clone(),
                is_mut: false,
                is_extern: false,
            });
        }
        self.analyze_block(body);
        self.scopes.pop();
    }

    fn analyze_block(&mut self, block: &mut Node<ast::Block>) {
        self.scopes.push();
        for stmt in &mut block.data.stmts {
            let span = stmt.span.clone();
            self.analyze_stmt_data(&mut stmt.data, span);
        }
        self.scopes.pop();
    }

    fn analyze_stmt_data(&mut self, stmt: &mut ast::Stmt, span: crate::lexer::Span) {
        match stmt {
            ast::Stmt::Var(v) => self.analyze_var_decl(v, span),
            ast::Stmt::Ret(value) => {
                if let Some(value) = value {
                    self.analyze_expr(value);
                }
            }
            ast::Stmt::Break | ast::Stmt::Continue => {}
            ast::Stmt::If(if_stmt) => {
                self.analyze_expr(&if_stmt.cond);
                self.analyze_block(&mut if_stmt.then_block);
                for (cond, block) in &mut if_stmt.elifs {
                    self.analyze_expr(cond);
                    self.analyze_block(block);
                }
                if let Some(block) = &mut if_stmt.else_block {
                    self.analyze_block(block);
                }
            }
            ast::Stmt::While(w) => {
                self.analyze_expr(&w.cond);
                self.analyze_block(&mut w.body);
            }
            ast::Stmt::For(f) => {
                self.scopes.push();
                self.analyze_expr(&f.start);
                self.analyze_expr(&f.end);
                // The loop variable is a mutable i64 no matter what the
                // bounds infer to; the interpreter iterates nothing else.
                self.scopes.define(Symbol {
                    name: f.var.data.clone(),
                    kind: SymbolKind::Var,
                    ty: Type::I64,
                    is_mut: true,
                    is_extern: false,
                });
                self.analyze_block(&mut f.body);
                self.scopes.pop();
            }
            ast::Stmt::Expr(expr) => self.analyze_expr(expr),
        }
    }

    fn analyze_var_decl(&mut self, v: &mut ast::VarDecl, span: crate::lexer::Span) {
        if self.scopes.lookup_local(&v.name.data).is_some() {
            self.error(span, "Variable already declared in this scope.");
            return;
        }

        self.analyze_expr(&v.init);

        if v.ty.is_none() {
            let inferred = self.infer(&v.init);
            v.ty = inferred.map(|ty| Node {
                span: v.name.span.clone(),
                data: ty,
            });
        }
        if v.ty.is_none() {
            self.error(span, "Cannot infer type for variable.");
            v.ty = Some(Node {
                span: v.name.span.clone(),
                data: Type::Unknown,
            });
        }

        self.scopes.define(Symbol {
            name: v.name.data.clone(),
            kind: SymbolKind::Var,
            ty: v.ty.as_ref().map(|t| t.data.clone()).unwrap_or(Type::Unknown),
            is_mut: v.bind.is_mut(),
            is_extern: false,
        });
    }

    fn analyze_expr(&mut self, expr: &Node<ast::Expr>) {
        match &expr.data {
            ast::Expr::Int(_)
            | ast::Expr::Float(_)
            | ast::Expr::Str(_)
            | ast::Expr::Bool(_) => {}
            // Unresolved names outside call position may be module-qualified;
            // the check is deferred.
            ast::Expr::Ident(_) => {}
            ast::Expr::Unary { operand, .. } => self.analyze_expr(operand),
            ast::Expr::Binary { op, left, right } => {
                self.analyze_expr(left);
                self.analyze_expr(right);
                self.check_binary(op.data, left, right, expr.span.clone());
            }
            ast::Expr::Assign { target, value } => {
                self.analyze_expr(target);
                self.analyze_expr(value);
                if let ast::Expr::Ident(name) = &target.data {
                    if let Some(sym) = self.scopes.lookup(name) {
                        if sym.kind == SymbolKind::Var && !sym.is_mut {
                            self.error(
                                target.span.clone(),
                                "Cannot assign to immutable variable.",
                            );
                        }
                    }
                }
                // `obj.field =` and `arr[i] =` bypass the root's mutability:
                // struct and array values have value semantics here.
            }
            ast::Expr::Call { callee, args } => {
                self.analyze_expr(callee);
                for arg in args {
                    self.analyze_expr(arg);
                }
                self.check_call(callee, args.len());
            }
            ast::Expr::Member { object, .. } => self.analyze_expr(object),
            ast::Expr::Index { object, index } => {
                self.analyze_expr(object);
                self.analyze_expr(index);
            }
            ast::Expr::StructInit { name, fields } => {
                let known_struct = matches!(
                    self.scopes.lookup(&name.data),
                    Some(sym) if sym.kind == SymbolKind::Struct
                );
                if !known_struct {
                    self.error(
                        name.span.clone(),
                        format!("Unknown struct: {}", name.data),
                    );
                }
                for (_, value) in fields {
                    self.analyze_expr(value);
                }
            }
            ast::Expr::ArrayInit { elems } => {
                for elem in elems {
                    self.analyze_expr(elem);
                }
            }
            ast::Expr::EnumVariant { enum_name, variant } => {
                if let Some(layout) = self.resolved.enum_layout(&enum_name.data) {
                    if layout.variant_value(&variant.data).is_none() {
                        self.error(
                            variant.span.clone(),
                            format!(
                                "Unknown enum variant: {}::{}",
                                enum_name.data, variant.data
                            ),
                        );
                    }
                }
                // Unknown enum names are deferred like other identifiers.
            }
        }
    }

    fn check_call(&mut self, callee: &Node<ast::Expr>, arg_count: usize) {
        let name = match &callee.data {
            ast::Expr::Ident(name) => name,
            // Module-qualified calls resolve later; computed callees are a
            // runtime concern.
            _ => return,
        };
        match self.scopes.lookup(name) {
            None => {
                let message = format!("Unknown function: {}", name);
                self.error(callee.span.clone(), message);
            }
            Some(sym) if sym.kind != SymbolKind::Fn => {
                self.error(callee.span.clone(), "Cannot call non-function.");
            }
            Some(sym) => {
                if let Type::Fn { params, .. } = &sym.ty {
                    if params.len() != arg_count {
                        let message = format!(
                            "Function '{}' takes {} arguments, got {}.",
                            name,
                            params.len(),
                            arg_count
                        );
                        self.error(callee.span.clone(), message);
                    }
                }
            }
        }
    }

    fn check_binary(
        &mut self,
        op: ast::BinaryOp,
        left: &Node<ast::Expr>,
        right: &Node<ast::Expr>,
        span: crate::lexer::Span,
    ) {
        use ast::BinaryOp::*;

        // Deferred names infer to nothing; skip the check rather than guess.
        let (lt, rt) = match (self.infer(left), self.infer(right)) {
            (Some(lt), Some(rt)) => (lt, rt),
            _ => return,
        };

        let ok = match op {
            Add | Sub | Mul | Div => lt.is_numeric() && rt.is_numeric(),
            Mod => lt.is_integral() && rt.is_integral(),
            Eq | Ne => lt == rt || (lt.is_numeric() && rt.is_numeric()),
            Lt | Le | Gt | Ge => lt.is_numeric() && rt.is_numeric(),
            And | Or => lt == Type::Bool && rt == Type::Bool,
            BitAnd | BitOr | BitXor | Shl | Shr => lt.is_integral() && rt.is_integral(),
        };
        if !ok {
            self.error(span, "Incompatible types for binary operation.");
        }
    }

    /// Local bottom-up inference over the closed list of inferable forms.
    fn infer(&self, expr: &Node<ast::Expr>) -> Option<Type> {
        match &expr.data {
            ast::Expr::Int(_) => Some(Type::I64),
            ast::Expr::Float(_) => Some(Type::F64),
            ast::Expr::Str(_) => Some(Type::Slice(Box::new(Type::U8))),
            ast::Expr::Bool(_) => Some(Type::Bool),
            ast::Expr::Ident(name) => self.scopes.lookup(name).map(|sym| sym.ty.clone()),
            // Arithmetic takes the left operand's type; the interpreter's
            // int-to-float promotion happens to agree for the mixed case.
            ast::Expr::Binary { left, .. } => self.infer(left),
            ast::Expr::Unary { operand, .. } => self.infer(operand),
            ast::Expr::Call { callee, .. } => {
                if let ast::Expr::Ident(name) = &callee.data {
                    match self.scopes.lookup(name).map(|sym| &sym.ty) {
                        Some(Type::Fn { ret, .. }) => Some((**ret).clone()),
                        _ => None,
                    }
                } else {
                    None
                }
            }
            ast::Expr::StructInit { name, .. } => Some(Type::named(&name.data)),
            ast::Expr::EnumVariant { enum_name, .. } => self
                .scopes
                .lookup(&enum_name.data)
                .filter(|sym| sym.kind == SymbolKind::Enum)
                .map(|sym| sym.ty.clone()),
            ast::Expr::Assign { .. }
            | ast::Expr::Member { .. }
            | ast::Expr::Index { .. }
            | ast::Expr::ArrayInit { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze_source(source: &str) -> (Node<ast::Program>, AnalysisOutcome) {
        let outcome = Parser::parse(source);
        assert!(
            outcome.diagnostics.is_empty(),
            "unexpected parse errors: {:?}",
            outcome.diagnostics
        );
        let mut program = outcome.program;
        let map = LineMap::new(source);
        let analysis = analyze(&mut program, &map);
        (program, analysis)
    }

    fn first_error(source: &str) -> String {
        let (_, analysis) = analyze_source(source);
        assert!(analysis.had_error(), "expected an analysis error");
        analysis.diagnostics[0].message.clone()
    }

    #[test]
    fn infers_binding_types() {
        let (program, analysis) = analyze_source(
            "fn main() -> i64 do\n    let a = 1\n    let b = 2.5\n    let c = \"s\"\n    let d = true\n    let e = a\n    ret a\nend\n",
        );
        assert!(!analysis.had_error());

        let f = match &program.data.decls[0].data {
            ast::Decl::Fn(f) => f,
            other => panic!("expected fn, got {:?}", other),
        };
        let tys: Vec<Type> = f.body.as_ref().unwrap().data.stmts
            [..5]
            .iter()
            .map(|stmt| match &stmt.data {
                ast::Stmt::Var(v) => v.ty.as_ref().unwrap().data.clone(),
                other => panic!("expected var decl, got {:?}", other),
            })
            .collect();
        assert_eq!(
            tys,
            vec![
                Type::I64,
                Type::F64,
                Type::Slice(Box::new(Type::U8)),
                Type::Bool,
                Type::I64,
            ]
        );
    }

    #[test]
    fn call_infers_return_type() {
        let (program, analysis) = analyze_source(
            "fn f() -> f64 do\n    ret 1.0\nend\nfn main() -> i64 do\n    let x = f()\n    ret 0\nend\n",
        );
        assert!(!analysis.had_error());
        let main = match &program.data.decls[1].data {
            ast::Decl::Fn(f) => f,
            other => panic!("expected fn, got {:?}", other),
        };
        match &main.body.as_ref().unwrap().data.stmts[0].data {
            ast::Stmt::Var(v) => assert_eq!(v.ty.as_ref().unwrap().data, Type::F64),
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn cannot_infer_reports() {
        assert_eq!(
            first_error("fn main() do\n    let a = [1, 2, 3]\nend\n"),
            "Cannot infer type for variable."
        );
    }

    #[test]
    fn annotated_array_binding_is_fine() {
        let (_, analysis) =
            analyze_source("fn main() do\n    let a :: [i64; 3] = [1, 2, 3]\nend\n");
        assert!(!analysis.had_error());
    }

    #[test]
    fn assignment_to_immutable_is_rejected() {
        assert_eq!(
            first_error("fn main() -> i64 do\n    let x = 1\n    x = 2\n    ret x\nend\n"),
            "Cannot assign to immutable variable."
        );
    }

    #[test]
    fn mutable_assignment_and_member_index_targets_pass() {
        let (_, analysis) = analyze_source(concat!(
            "struct P do\n    x :: i64\nend\n",
            "fn main() -> i64 do\n",
            "    mut y = 1\n",
            "    y = y + 1\n",
            "    let p = P { x = 1 }\n",
            "    p.x = 5\n",
            "    let a :: [i64; 2] = [1, 2]\n",
            "    a[0] = 9\n",
            "    ret y\n",
            "end\n",
        ));
        assert!(
            !analysis.had_error(),
            "unexpected: {:?}",
            analysis.diagnostics
        );
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        assert_eq!(
            first_error("fn f() do\nend\nfn f() do\nend\n"),
            "Duplicate function declaration."
        );
        assert_eq!(
            first_error("struct S do\n    x :: i64\nend\nstruct S do\n    y :: i64\nend\n"),
            "Duplicate struct declaration."
        );
        assert_eq!(
            first_error(
                "fn main() do\n    let x = 1\n    let x = 2\nend\n"
            ),
            "Variable already declared in this scope."
        );
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        let (_, analysis) = analyze_source(
            "fn main() do\n    let x = 1\n    if true do\n        let x = 2\n    end\nend\n",
        );
        assert!(!analysis.had_error());
    }

    #[test]
    fn unknown_function_in_call_position() {
        assert_eq!(
            first_error("fn main() do\n    missing()\nend\n"),
            "Unknown function: missing"
        );
    }

    #[test]
    fn unresolved_identifier_outside_call_is_deferred() {
        let (_, analysis) = analyze_source("fn main() do\n    let x :: i64 = mystery\nend\n");
        assert!(!analysis.had_error());
    }

    #[test]
    fn scope_isolation() {
        assert_eq!(
            first_error(concat!(
                "fn main() -> i64 do\n",
                "    if true do\n",
                "        let hidden = 1\n",
                "    end\n",
                "    hidden()\n",
                "    ret 0\n",
                "end\n",
            )),
            "Unknown function: hidden"
        );
    }

    #[test]
    fn builtins_are_callable_and_arity_checked() {
        let (_, analysis) =
            analyze_source("fn main() do\n    print_int(5)\n    println()\nend\n");
        assert!(!analysis.had_error());

        assert_eq!(
            first_error("fn main() do\n    print_int(5, 6)\nend\n"),
            "Function 'print_int' takes 1 arguments, got 2."
        );
    }

    #[test]
    fn arity_mismatch_for_user_functions() {
        assert_eq!(
            first_error(
                "fn add(a :: i64, b :: i64) -> i64 do\n    ret a + b\nend\nfn main() do\n    add(1)\nend\n"
            ),
            "Function 'add' takes 2 arguments, got 1."
        );
    }

    #[test]
    fn calling_a_variable_is_rejected() {
        assert_eq!(
            first_error("fn main() do\n    let x = 1\n    x()\nend\n"),
            "Cannot call non-function."
        );
    }

    #[test]
    fn binary_operand_checks() {
        assert_eq!(
            first_error("fn main() do\n    let x = 1 + true\nend\n"),
            "Incompatible types for binary operation."
        );
        assert_eq!(
            first_error("fn main() do\n    let x = 1.5 % 2.0\nend\n"),
            "Incompatible types for binary operation."
        );
        assert_eq!(
            first_error("fn main() do\n    let x = 1 and true\nend\n"),
            "Incompatible types for binary operation."
        );

        let (_, analysis) = analyze_source(
            "fn main() do\n    let x = 1 + 2.5\n    let y = 1 == 2.0\n    let z = true == false\nend\n",
        );
        assert!(!analysis.had_error());
    }

    #[test]
    fn unknown_struct_in_initializer() {
        assert_eq!(
            first_error("fn main() do\n    let p = Ghost { x = 1 }\nend\n"),
            "Unknown struct: Ghost"
        );
    }

    #[test]
    fn enum_variants_resolve() {
        let (_, analysis) = analyze_source(concat!(
            "enum Color do\n    Red\n    Green = 5\nend\n",
            "fn main() do\n    let c = Color::Green\nend\n",
        ));
        assert!(!analysis.had_error());

        assert_eq!(
            first_error(concat!(
                "enum Color do\n    Red\nend\n",
                "fn main() do\n    let c = Color::Mauve\nend\n",
            )),
            "Unknown enum variant: Color::Mauve"
        );
    }

    #[test]
    fn annotated_enum_bindings_compare_with_variants() {
        let (_, analysis) = analyze_source(concat!(
            "enum Color do\n    Red\n    Green\nend\n",
            "fn paint(c :: Color) -> bool do\n",
            "    ret c == Color::Red\n",
            "end\n",
            "fn main() -> i64 do\n",
            "    let c :: Color = Color::Green\n",
            "    if paint(c) do\n",
            "        ret 1\n",
            "    end\n",
            "    ret 0\n",
            "end\n",
        ));
        assert!(
            !analysis.had_error(),
            "unexpected: {:?}",
            analysis.diagnostics
        );
    }

    #[test]
    fn loop_variable_is_i64_even_with_float_bounds() {
        // `%` only accepts integral operands, so this passes exactly
        // because the loop variable does not take the bounds' type.
        let (_, analysis) = analyze_source(concat!(
            "fn main() do\n",
            "    for i in 1.5..10.0 do\n",
            "        let x = i % 2\n",
            "    end\n",
            "end\n",
        ));
        assert!(
            !analysis.had_error(),
            "unexpected: {:?}",
            analysis.diagnostics
        );
    }

    #[test]
    fn first_error_mode_reports_once() {
        let (_, analysis) = analyze_source(concat!(
            "fn main() do\n",
            "    let x = 1\n",
            "    x = 2\n",
            "    x = 3\n",
            "    missing()\n",
            "end\n",
        ));
        assert_eq!(analysis.diagnostics.len(), 1);
        assert_eq!(
            analysis.diagnostics[0].message,
            "Cannot assign to immutable variable."
        );
    }

    #[test]
    fn resolved_program_collects_entities() {
        let (_, analysis) = analyze_source(concat!(
            "@extern \"C\" do\n    fn malloc(n :: u64) -> ptr<u8>\nend\n",
            "struct P do\n    x :: i64\nend\n",
            "enum E do\n    A\nend\n",
            "fn main() -> i64 do\n    ret 0\nend\n",
        ));
        assert!(!analysis.had_error());
        let resolved = &analysis.resolved;
        assert_eq!(resolved.function("malloc").map(|f| f.is_extern), Some(true));
        assert!(resolved.function("main").is_some());
        assert_eq!(resolved.structs.len(), 1);
        assert_eq!(resolved.enums.len(), 1);
        // Host primitives are scope-only, they are not backend entities.
        assert!(resolved.function("print_int").is_none());
    }

    #[test]
    fn loop_variable_is_mutable_i64() {
        let (_, analysis) = analyze_source(concat!(
            "fn main() -> i64 do\n",
            "    mut s = 0\n",
            "    for i in 0..10 do\n",
            "        i = i + 1\n",
            "        s = s + i\n",
            "    end\n",
            "    ret s\nend\n",
        ));
        assert!(!analysis.had_error());
    }
}
