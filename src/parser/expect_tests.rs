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

use super::Parser;
use crate::ast;
use crate::line_map::LineMap;
use expect_test::{expect, Expect};

/// Snapshot the parsed tree, or the rendered diagnostics if there were any.
fn check(input: &str, output: Expect) {
    let outcome = Parser::parse(input);
    let rendered = if outcome.diagnostics.is_empty() {
        ast::dump(&outcome.program)
    } else {
        let map = LineMap::new(input);
        outcome
            .diagnostics
            .iter()
            .map(|d| d.render(&map))
            .collect::<Vec<_>>()
            .join("\n")
    };
    output.assert_eq(rendered.trim_end());
}

#[test]
fn parse_empty() {
    check("", expect![[r#"Program:"#]]);
    check("\n\n\n", expect![[r#"Program:"#]]);
}

#[test]
fn parse_precedence() {
    check(
        "fn main() -> i64 do\n    ret 1 + 2 * 3\nend\n",
        expect![[r#"
            Program:
              FnDecl: main
                Block:
                  Return:
                    Binary: +
                      Int: 1
                      Binary: *
                        Int: 2
                        Int: 3"#]],
    );
    check(
        "fn main() -> i64 do\n    ret (1 + 2) * 3\nend\n",
        expect![[r#"
            Program:
              FnDecl: main
                Block:
                  Return:
                    Binary: *
                      Binary: +
                        Int: 1
                        Int: 2
                      Int: 3"#]],
    );
}

#[test]
fn parse_bitwise_and_shift_precedence() {
    // `1 | 2 ^ 3 & 4 << 5` nests as `1 | (2 ^ (3 & (4 << 5)))`
    check(
        "fn main() -> i64 do\n    ret 1 | 2 ^ 3 & 4 << 5\nend\n",
        expect![[r#"
            Program:
              FnDecl: main
                Block:
                  Return:
                    Binary: |
                      Int: 1
                      Binary: ^
                        Int: 2
                        Binary: &
                          Int: 3
                          Binary: <<
                            Int: 4
                            Int: 5"#]],
    );
}

#[test]
fn pipe_rewrites_to_call_left_associatively() {
    check(
        "fn main() do\n    1 |> f |> g\nend\n",
        expect![[r#"
            Program:
              FnDecl: main
                Block:
                  Call:
                    Ident: g
                    Call:
                      Ident: f
                      Int: 1"#]],
    );
}

#[test]
fn pipe_callee_takes_postfix() {
    check(
        "fn main() do\n    x |> m.f\nend\n",
        expect![[r#"
            Program:
              FnDecl: main
                Block:
                  Call:
                    Member: .f
                      Ident: m
                    Ident: x"#]],
    );
}

#[test]
fn parse_declarations() {
    check(
        concat!(
            "@use \"std/io.nl\" as io\n",
            "\n",
            "struct Point do\n",
            "    x :: i64\n",
            "    y :: i64\n",
            "end\n",
            "\n",
            "enum Color do\n",
            "    Red\n",
            "    Green = 5\n",
            "    Blue\n",
            "end\n",
            "\n",
            "@extern \"C\" do\n",
            "    fn puts(s :: ptr<u8>) -> i32\n",
            "end\n",
        ),
        expect![[r#"
            Program:
              Use: std/io.nl
              StructDecl: Point
                Field: x :: i64
                Field: y :: i64
              EnumDecl: Color
                Variant: Red = 0
                Variant: Green = 5
                Variant: Blue = 6
              Extern: "C"
                FnDecl: puts"#]],
    );
}

#[test]
fn parse_statement_forms() {
    check(
        concat!(
            "fn main() -> i64 do\n",
            "    let p = Point { x = 1, y = 2 }\n",
            "    mut arr = [1, 2, 3]\n",
            "    arr[0] = p.x\n",
            "    if p.x == 1 do\n",
            "        ret 1\n",
            "    elif p.x == 2 do\n",
            "        ret 2\n",
            "    else do\n",
            "        ret Color::Red\n",
            "    end\n",
            "    for i in 0..10 do\n",
            "        continue\n",
            "    end\n",
            "    while true do\n",
            "        break\n",
            "    end\n",
            "    ret -p.y\n",
            "end\n",
        ),
        expect![[r#"
            Program:
              FnDecl: main
                Block:
                  VarDecl: let p
                    StructInit: Point
                      Field: x
                        Int: 1
                      Field: y
                        Int: 2
                  VarDecl: mut arr
                    ArrayInit:
                      Int: 1
                      Int: 2
                      Int: 3
                  Assign:
                    Index:
                      Ident: arr
                      Int: 0
                    Member: .x
                      Ident: p
                  If:
                    Binary: ==
                      Member: .x
                        Ident: p
                      Int: 1
                    Block:
                      Return:
                        Int: 1
                    Elif:
                      Binary: ==
                        Member: .x
                          Ident: p
                        Int: 2
                      Block:
                        Return:
                          Int: 2
                    Else:
                      Block:
                        Return:
                          EnumVariant: Color::Red
                  For: i
                    Int: 0
                    Int: 10
                    Block:
                      Continue
                  While:
                    Bool: true
                    Block:
                      Break
                  Return:
                    Unary: Neg
                      Member: .y
                        Ident: p"#]],
    );
}

#[test]
fn parse_types() {
    check(
        concat!(
            "fn f(a :: ptr<u8>, b :: [i64; 4], c :: [u8], d :: Point) -> f64 do\n",
            "    ret 1.5\n",
            "end\n",
        ),
        expect![[r#"
            Program:
              FnDecl: f
                Param: a :: ptr<u8>
                Param: b :: [i64; 4]
                Param: c :: [u8]
                Param: d :: Point
                Block:
                  Return:
                    Float: 1.5"#]],
    );
}

#[test]
fn string_escapes_are_decoded() {
    check(
        "fn main() do\n    io_print(\"a\\tb\\n\")\nend\n",
        expect![[r#"
            Program:
              FnDecl: main
                Block:
                  Call:
                    Ident: io_print
                    String: "a\tb\n""#]],
    );
}

#[test]
fn error_reports_with_context() {
    check(
        "fn main() do\n    let = 5\n    let x = 1\nend\n",
        expect![[r#"
            Error at line 2, column 9 near '='
                 2 |     let = 5
                   |         ^
            Expected variable name."#]],
    );
}

#[test]
fn missing_end_hint() {
    check(
        "fn main() do\n    ret 0\n",
        expect![[r#"
            Error at line 3, column 1 (end of file)
            Expected 'end' after function body.
            Hint: Every 'do' block must be closed with 'end'"#]],
    );
}

#[test]
fn panic_mode_suppresses_cascading_errors() {
    let outcome = Parser::parse("fn main() do\n    let = 1\n    mut = 2\nend\n");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(outcome.had_error());
}

#[test]
fn recovery_resumes_at_declaration_boundaries() {
    let outcome = Parser::parse(concat!(
        "fn one() do\n    let = 1\nend\n",
        "fn two() do\n    mut = 2\nend\n",
        "fn three() do\n    ret 3\nend\n",
    ));
    assert_eq!(outcome.diagnostics.len(), 2);
    // All three functions survive in the tree.
    assert_eq!(outcome.program.data.decls.len(), 3);
}

#[test]
fn lexer_error_tokens_become_diagnostics() {
    let outcome = Parser::parse("fn main() do\n    @foo\nend\n");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].message, "Unknown directive.");

    let outcome = Parser::parse("fn main() do\n    let s = \"oops\nend\n");
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.message == "Unterminated string."));
}

#[test]
fn round_trip_through_the_pretty_printer() {
    // Reprinting a parsed tree and parsing the result must reproduce the
    // same structure, independent of the original spelling.
    let source = concat!(
        "@use \"std/io.nl\" as io\n",
        "struct Point do\n    x :: i64\n    y :: i64\nend\n",
        "enum Color do\n    Red\n    Green = 5\n    Blue\nend\n",
        "@extern \"C\" do\n    fn puts(s :: ptr<u8>) -> i32\nend\n",
        "fn scale(p :: Point, k :: i64) -> i64 do\n",
        "    ret (p.x + p.y) * k\n",
        "end\n",
        "fn main() -> i64 do\n",
        "    let p = Point { x = 1, y = 2 }\n",
        "    mut acc = 0.5\n",
        "    mut arr :: [i64; 3] = [1, 2, 3]\n",
        "    arr[1] = Color::Green\n",
        "    for i in 0..3 do\n",
        "        if arr[i] > 2 and not false do\n",
        "            continue\n",
        "        elif arr[i] == 1 do\n",
        "            break\n",
        "        else do\n",
        "            arr[0] = -arr[i] + (1 << 2 | 3)\n",
        "        end\n",
        "    end\n",
        "    while acc == 0.5 do\n",
        "        acc = acc * 2.0\n",
        "    end\n",
        "    puts(\"a\\tb\\n\")\n",
        "    ret scale(p, 2) |> math_abs\n",
        "end\n",
    );
    let first = Parser::parse(source);
    assert!(
        first.diagnostics.is_empty(),
        "parse errors: {:?}",
        first.diagnostics
    );

    let printed = ast::to_source(&first.program);
    let second = Parser::parse(&printed);
    assert!(
        second.diagnostics.is_empty(),
        "reprinted source has errors: {:?}\n{}",
        second.diagnostics,
        printed
    );
    assert_eq!(ast::dump(&first.program), ast::dump(&second.program));
}

#[test]
fn parse_keeps_every_declaration_after_errors() {
    // A broken declaration must not take the following good one with it.
    let outcome = Parser::parse("struct P do\n    x ::\nend\nfn main() do\n    ret 0\nend\n");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(outcome
        .program
        .data
        .decls
        .iter()
        .any(|d| matches!(&d.data, crate::ast::Decl::Fn(f) if f.name.data == "main")));
}
