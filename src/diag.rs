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

//! Formatted error reporting.
//!
//! A diagnostic names a byte span in the preprocessed buffer plus a message.
//! Rendering produces a header line, the offending source line behind a
//! four-digit gutter and a caret ruler underneath the token. Tabs are
//! expanded to four spaces in both the line and the ruler so the caret stays
//! aligned.

use std::fmt;
use std::fmt::Write;

use crate::lexer::Span;
use crate::line_map::{LineMap, Pos};

/// Advisory hints for common error messages. Matching is substring-based on
/// the message text; missing a hint is never a correctness problem.
const HINTS: &[(&str, &str)] = &[
    (
        "Expected 'end'",
        "Hint: Every 'do' block must be closed with 'end'",
    ),
    (
        "Expected ']'",
        "Hint: Arrays must have matching brackets: [1, 2, 3]",
    ),
    (
        "Expected ')'",
        "Hint: Function calls and expressions need matching parentheses",
    ),
    (
        "Expected '}'",
        "Hint: Struct literals need matching braces: Point { x = 1, y = 2 }",
    ),
    (
        "Expected type",
        "Hint: Use type annotations like :: i64, :: bool, :: ptr<u8>",
    ),
    (
        "Expected expression",
        "Hint: An expression is a value like: 42, x + y, fn_call(), true",
    ),
    (
        "Expected 'do'",
        "Hint: Control structures use 'do' to start their body: if x > 0 do ... end",
    ),
];

pub fn hint_for(message: &str) -> Option<&'static str> {
    HINTS
        .iter()
        .find(|(needle, _)| message.contains(needle))
        .map(|(_, hint)| *hint)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub pos: Pos,
    pub message: String,
}

impl Diagnostic {
    pub fn new(span: Span, map: &LineMap, message: impl Into<String>) -> Self {
        Diagnostic {
            pos: map.offset_to_pos(span.start),
            span,
            message: message.into(),
        }
    }

    /// Render the full caret-underlined report.
    pub fn render(&self, map: &LineMap) -> String {
        let mut out = String::new();
        let source = map.source();

        write!(out, "Error at line {}, column {}", self.pos.line, self.pos.column).unwrap();
        if self.span.start >= source.len() || self.span.is_empty() {
            write!(out, " (end of file)").unwrap();
        } else {
            let lexeme = &source[self.span.start..self.span.end];
            let lexeme = lexeme.lines().next().unwrap_or(lexeme);
            write!(out, " near '{}'", lexeme).unwrap();
        }
        out.push('\n');

        let line_text = map.line_text(self.pos.line);
        if !line_text.is_empty() {
            write!(out, "  {:>4} | ", self.pos.line).unwrap();
            for ch in line_text.chars() {
                if ch == '\t' {
                    out.push_str("    ");
                } else {
                    out.push(ch);
                }
            }
            out.push('\n');

            out.push_str("       | ");
            for ch in line_text.chars().take(self.pos.column - 1) {
                if ch == '\t' {
                    out.push_str("    ");
                } else {
                    out.push(' ');
                }
            }
            out.push('^');
            let line_len = line_text.chars().count();
            let token_len = self.span.len().max(1);
            for i in 1..token_len {
                if self.pos.column + i - 1 >= line_len {
                    break;
                }
                out.push('~');
            }
            out.push('\n');
        }

        out.push_str(&self.message);
        out.push('\n');
        if let Some(hint) = hint_for(&self.message) {
            out.push_str(hint);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pos, self.message)
    }
}
