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

//! Mapping between byte offsets and human-readable source positions.

use std::fmt;

pub use logos::Span;

/// Position inside a source buffer in a form that's useful for human readers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Pos {
    /// Line number, starting at 1
    pub line: usize,
    /// Position within the line, in characters, starting at 1
    pub column: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A line-start index over a source buffer, built once at the beginning of a
/// compilation and queried in O(log n) per offset and O(1) per line.
pub struct LineMap<'a> {
    /// Ordered vector of the byte positions of line breaks (`\n`)
    line_offsets: Vec<usize>,
    /// The underlying buffer, needed for column indices and line extraction.
    source: &'a str,
}

impl<'a> LineMap<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            line_offsets: source
                .char_indices()
                .filter_map(|(pos, ch)| if ch == '\n' { Some(pos) } else { None })
                .collect(),
            source,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Number of lines in the buffer. The line after the final `\n` counts
    /// even when it is empty.
    pub fn line_count(&self) -> usize {
        self.line_offsets.len() + 1
    }

    /// # Examples
    ///
    /// ```
    /// # use nyl::line_map::{LineMap, Pos};
    /// let m = LineMap::new("abc\ndefg\n");
    /// assert_eq!(m.offset_to_pos(0), Pos { line: 1, column: 1 });
    /// assert_eq!(m.offset_to_pos(3), Pos { line: 1, column: 4 });
    /// assert_eq!(m.offset_to_pos(4), Pos { line: 2, column: 1 });
    /// assert_eq!(m.offset_to_pos(7), Pos { line: 2, column: 4 });
    /// ```
    pub fn offset_to_pos(&self, offset: usize) -> Pos {
        let line = match self.line_offsets.binary_search(&offset) {
            // Hit exactly the `line`th line break, which still belongs to its line.
            Ok(line) => line,
            Err(line) => line,
        };
        let line_start = self.line_start(line + 1);
        let column = self.source[line_start..offset.min(self.source.len())]
            .chars()
            .count()
            + 1;
        Pos {
            line: line + 1,
            column,
        }
    }

    /// Inverse of [`offset_to_pos`](Self::offset_to_pos) for positions that
    /// lie inside the buffer.
    pub fn pos_to_offset(&self, pos: Pos) -> usize {
        let begin = self.line_start(pos.line);
        let offset = self.source[begin..]
            .char_indices()
            .nth(pos.column - 1)
            .map_or(0, |(delta, _)| delta);
        begin + offset
    }

    /// Byte extent of the given line (1-indexed), excluding the newline.
    pub fn line_span(&self, line: usize) -> Span {
        let begin = self.line_start(line);
        let end = if line - 1 < self.line_offsets.len() {
            self.line_offsets[line - 1]
        } else {
            self.source.len()
        };
        begin..end
    }

    /// The text of the given line (1-indexed), excluding the newline.
    pub fn line_text(&self, line: usize) -> &'a str {
        let span = self.line_span(line);
        &self.source[span.start..span.end]
    }

    fn line_start(&self, line: usize) -> usize {
        if line <= 1 {
            0
        } else if line - 2 >= self.line_offsets.len() {
            self.source.len()
        } else {
            self.line_offsets[line - 2] + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_one_line() {
        let m = LineMap::new("");
        assert_eq!(m.line_count(), 1);
        assert_eq!(m.offset_to_pos(0), Pos { line: 1, column: 1 });
        assert_eq!(m.line_text(1), "");
    }

    #[test]
    fn round_trip() {
        let src = "let x = 1\nmut y = 2\n\nret y\n";
        let m = LineMap::new(src);
        for offset in 0..src.len() {
            assert_eq!(m.pos_to_offset(m.offset_to_pos(offset)), offset);
        }
    }

    #[test]
    fn line_extraction() {
        let m = LineMap::new("fn main() do\n    ret 0\nend");
        assert_eq!(m.line_count(), 3);
        assert_eq!(m.line_text(1), "fn main() do");
        assert_eq!(m.line_text(2), "    ret 0");
        assert_eq!(m.line_text(3), "end");
    }

    #[test]
    fn newline_belongs_to_its_line() {
        let m = LineMap::new("ab\ncd");
        assert_eq!(m.offset_to_pos(2), Pos { line: 1, column: 3 });
        assert_eq!(m.offset_to_pos(3), Pos { line: 2, column: 1 });
    }
}
