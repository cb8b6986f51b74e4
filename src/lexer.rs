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

//! The nyl token set.
//!
//! Newlines are significant (they terminate statements), so they are tokens
//! rather than skipped whitespace. Comments come in two forms: `--` to the
//! end of the line and `---` to the matching `---`. Both are handled by a
//! single callback because the block form shares its prefix with the line
//! form.

use logos::Logos;

// Re-exports
pub use logos::Span;

/// Consume a `--` line comment or a `--- ... ---` block comment.
/// The trailing newline of a line comment is left in the stream; an
/// unterminated block comment silently runs to the end of input.
fn lex_comment(lex: &mut logos::Lexer<Token>) -> logos::Skip {
    let rest = lex.remainder();
    if rest.starts_with('-') {
        match rest[1..].find("---") {
            Some(close) => lex.bump(1 + close + 3),
            None => lex.bump(rest.len()),
        }
    } else {
        match rest.find('\n') {
            Some(eol) => lex.bump(eol),
            None => lex.bump(rest.len()),
        }
    }
    logos::Skip
}

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
pub enum Token {
    // Literals, decoded at scan time
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse().ok())]
    LitFloat(f64),
    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok())]
    LitInt(i64),
    /// The raw span including quotes; escapes are decoded by the parser.
    #[regex(r#""([^"\\]|\\[\s\S])*""#)]
    LitString,

    // Keywords
    #[token("fn")]
    Fn,
    #[token("let")]
    Let,
    #[token("mut")]
    Mut,
    #[token("const")]
    Const,
    #[token("struct")]
    Struct,
    #[token("enum")]
    Enum,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("match")]
    Match,
    #[token("ret")]
    Ret,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("do")]
    Do,
    #[token("end")]
    End,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("as")]
    As,

    // Type keywords
    #[token("i8")]
    I8,
    #[token("i16")]
    I16,
    #[token("i32")]
    I32,
    #[token("i64")]
    I64,
    #[token("u8")]
    U8,
    #[token("u16")]
    U16,
    #[token("u32")]
    U32,
    #[token("u64")]
    U64,
    #[token("f32")]
    F32,
    #[token("f64")]
    F64,
    #[token("bool")]
    Bool,
    #[token("void")]
    Void,
    #[token("ptr")]
    Ptr,

    // Operators (multi-character forms listed first for clarity; logos
    // applies maximal munch regardless of order)
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token("::")]
    ColonColon,
    #[token("..")]
    DotDot,
    #[token("|>")]
    PipeGt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("?")]
    Question,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,

    // Directives
    #[token("@use")]
    DirUse,
    #[token("@extern")]
    DirExtern,
    #[token("@alloc")]
    DirAlloc,
    #[token("@free")]
    DirFree,

    // Entities
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // Statement terminator
    #[token("\n")]
    Newline,

    // Tokens representing invalid input
    #[regex(r#""([^"\\]|\\[\s\S])*"#)]
    ErrUnterminatedString,
    #[regex(r"@[a-zA-Z]*")]
    ErrUnknownDirective,
    #[token("!")]
    ErrBang,

    #[error]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[token("--", lex_comment)]
    Error,
}

impl Token {
    /// The diagnostic message carried by an error token, if this is one.
    pub fn error_message(self) -> Option<&'static str> {
        match self {
            Token::ErrUnterminatedString => Some("Unterminated string."),
            Token::ErrUnknownDirective => Some("Unknown directive."),
            Token::ErrBang => Some("Expected '=' after '!'."),
            Token::Error => Some("Unexpected character."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Token;
    use expect_test::{expect, Expect};
    use logos::Logos;

    fn check(input: &str, output: Expect) {
        let lexer = Token::lexer(input);
        let tokens = lexer.spanned().collect::<Vec<_>>();
        let token_str = format!("{:?}", tokens);
        output.assert_eq(&token_str);
    }

    fn assert_lexable(input: &str) {
        let mut lexer = Token::lexer(input);
        while let Some(tok) = lexer.next() {
            if tok.error_message().is_some() {
                panic!("Could not lex {:?} at {:?}", lexer.slice(), lexer.span())
            }
        }
    }

    #[test]
    fn it_works() {
        assert_lexable(
            r#"
            @use "std/io.nl"

            struct Point do
                x :: i64
                y :: i64
            end

            fn dist2(p :: Point) -> i64 do
                -- squared distance from the origin
                ret p.x * p.x + p.y * p.y
            end

            fn main() -> i64 do
                mut total = 0
                for i in 0..10 do
                    total = total + i
                end
                total |> print_int
                ret 0
            end
        "#,
        )
    }

    #[test]
    fn ints_and_floats() {
        check("42", expect![[r#"[(LitInt(42), 0..2)]"#]]);
        check("3.14", expect![[r#"[(LitFloat(3.14), 0..4)]"#]]);
        check(
            "0..10",
            expect![[r#"[(LitInt(0), 0..1), (DotDot, 1..3), (LitInt(10), 3..5)]"#]],
        );
    }

    #[test]
    fn maximal_munch() {
        check(
            "a <= b << 2",
            expect![[
                r#"[(Ident, 0..1), (Le, 2..4), (Ident, 5..6), (Shl, 7..9), (LitInt(2), 10..11)]"#
            ]],
        );
        check(
            "x |> f",
            expect![[r#"[(Ident, 0..1), (PipeGt, 2..4), (Ident, 5..6)]"#]],
        );
        check(
            "a::b",
            expect![[r#"[(Ident, 0..1), (ColonColon, 1..3), (Ident, 3..4)]"#]],
        );
    }

    #[test]
    fn newlines_are_tokens() {
        check(
            "a\nb",
            expect![[r#"[(Ident, 0..1), (Newline, 1..2), (Ident, 2..3)]"#]],
        );
    }

    #[test]
    fn line_comment_keeps_newline() {
        check(
            "1 -- c\n2",
            expect![[r#"[(LitInt(1), 0..1), (Newline, 6..7), (LitInt(2), 7..8)]"#]],
        );
    }

    #[test]
    fn block_comment() {
        check(
            "1 --- c --- 2",
            expect![[r#"[(LitInt(1), 0..1), (LitInt(2), 12..13)]"#]],
        );
    }

    #[test]
    fn unterminated_block_comment_runs_to_eof() {
        check("1 --- c", expect![[r#"[(LitInt(1), 0..1)]"#]]);
    }

    #[test]
    fn strings() {
        check(r#""hi""#, expect![[r#"[(LitString, 0..4)]"#]]);
        check(r#""a\"b""#, expect![[r#"[(LitString, 0..6)]"#]]);
        check(r#""abc"#, expect![[r#"[(ErrUnterminatedString, 0..4)]"#]]);
    }

    #[test]
    fn directives() {
        check(
            r#"@use "x.nl""#,
            expect![[r#"[(DirUse, 0..4), (LitString, 5..11)]"#]],
        );
        check("@foo", expect![[r#"[(ErrUnknownDirective, 0..4)]"#]]);
    }

    #[test]
    fn keywords_versus_identifiers() {
        check(
            "for forty",
            expect![[r#"[(For, 0..3), (Ident, 4..9)]"#]],
        );
        check(
            "i64 i64x",
            expect![[r#"[(I64, 0..3), (Ident, 4..8)]"#]],
        );
    }

    #[test]
    fn bang_requires_equals() {
        check(
            "a != b",
            expect![[r#"[(Ident, 0..1), (Ne, 2..4), (Ident, 5..6)]"#]],
        );
        check("!", expect![[r#"[(ErrBang, 0..1)]"#]]);
    }
}
