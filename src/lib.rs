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

// Language front-end
pub mod ast;
pub mod lexer;
pub mod line_map;
pub mod parser;
pub mod preprocess;
pub mod types;

// Semantic analysis and execution
pub mod analyzer;
pub mod backend;
pub mod interp;

// Shared infrastructure
pub mod compiler;
pub mod diag;
