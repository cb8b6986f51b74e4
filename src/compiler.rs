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

//! Pipeline orchestration: source path → preprocessed buffer → token stream
//! → tree → analyzed tree → interpreted result.
//!
//! Each stage fails fast: the first stage that reports an error renders its
//! diagnostics to stderr and the rest of the pipeline is skipped. Success is
//! silent apart from the program's own output.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};

use crate::analyzer::analyze;
use crate::ast::{self, Node};
use crate::backend::ResolvedProgram;
use crate::interp::Interpreter;
use crate::line_map::LineMap;
use crate::parser::Parser;
use crate::preprocess::{self, MemLoader, Preprocessor, SourceLoader};

#[derive(Debug, Snafu)]
pub enum CompileError {
    #[snafu(display("{}", source))]
    Preprocess { source: preprocess::PreprocessError },
    #[snafu(display("aborting after {} parse error(s)", count))]
    Parse { count: usize },
    #[snafu(display("aborting after analysis errors"))]
    Analyze,
    #[snafu(display("Runtime error: {}", message))]
    Runtime { message: String },
}

pub struct Options {
    /// Root directory for `std/` imports.
    pub std_root: PathBuf,
    pub max_output: usize,
    pub max_imports: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            std_root: PathBuf::from("std"),
            max_output: preprocess::DEFAULT_MAX_OUTPUT,
            max_imports: preprocess::DEFAULT_MAX_IMPORTS,
        }
    }
}

impl Options {
    fn preprocessor(&self) -> Preprocessor<preprocess::FsLoader> {
        Preprocessor::new(&self.std_root).limits(self.max_output, self.max_imports)
    }
}

/// Compile and interpret the given file; the program writes to stdout.
pub fn run_file(path: &Path, opts: &Options) -> Result<i64, CompileError> {
    log::debug!("compiling {}", path.display());
    let buffer = expand(opts.preprocessor(), path)?;
    run_buffer(&buffer, Box::new(io::stdout()))
}

/// Parse and dump the tree of the given file, without executing it.
pub fn dump_ast(path: &Path, opts: &Options) -> Result<String, CompileError> {
    let buffer = expand(opts.preprocessor(), path)?;
    let (program, _) = compile_buffer(&buffer)?;
    Ok(ast::dump(&program))
}

/// Compile and interpret an in-memory source that uses no imports.
pub fn run_source(source: &str, out: Box<dyn Write + '_>) -> Result<i64, CompileError> {
    let mut pre = Preprocessor::with_loader(MemLoader::new(), "std");
    let buffer = match pre.expand_source(source, Path::new("")) {
        Ok(buffer) => buffer,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(e).context(Preprocess);
        }
    };
    run_buffer(&buffer, out)
}

fn expand<L: SourceLoader>(
    mut pre: Preprocessor<L>,
    path: &Path,
) -> Result<String, CompileError> {
    match pre.expand_file(path) {
        Ok(buffer) => Ok(buffer),
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(e).context(Preprocess)
        }
    }
}

/// Front half of the pipeline: parse and analyze a preprocessed buffer.
/// Diagnostics are rendered to stderr.
pub fn compile_buffer(buffer: &str) -> Result<(Node<ast::Program>, ResolvedProgram), CompileError> {
    let map = LineMap::new(buffer);

    log::debug!("parsing {} bytes", buffer.len());
    let outcome = Parser::parse(buffer);
    if outcome.had_error() {
        for diag in &outcome.diagnostics {
            eprintln!("{}", diag.render(&map));
        }
        return Parse {
            count: outcome.diagnostics.len(),
        }
        .fail();
    }

    log::debug!("analyzing {} declarations", outcome.program.data.decls.len());
    let mut program = outcome.program;
    let analysis = analyze(&mut program, &map);
    if analysis.had_error() {
        for diag in &analysis.diagnostics {
            eprintln!("{}", diag.render(&map));
        }
        return Analyze.fail();
    }

    Ok((program, analysis.resolved))
}

/// Back half of the pipeline: interpret an already-expanded buffer.
pub fn run_buffer(buffer: &str, out: Box<dyn Write + '_>) -> Result<i64, CompileError> {
    let (program, resolved) = compile_buffer(buffer)?;
    let map = LineMap::new(buffer);

    let mut interp = Interpreter::with_output(&program, &resolved, out);
    match interp.run() {
        Ok(code) => Ok(code),
        Err(err) => {
            let message = match err.span() {
                Some(span) => {
                    format!("{} at {}", err.kind(), map.offset_to_pos(span.start))
                }
                None => err.kind().to_string(),
            };
            eprintln!("Runtime error: {}", message);
            Runtime { message }.fail()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, RecordingBackend, Target};
    use std::path::Path;

    fn run_capturing(source: &str) -> (i64, String) {
        let mut captured = Vec::new();
        let code = run_source(source, Box::new(&mut captured)).expect("program should run");
        (code, String::from_utf8(captured).unwrap())
    }

    #[test]
    fn hello_world() {
        let (code, output) =
            run_capturing("fn main() -> i64 do io_print(\"hello\") ret 0 end");
        assert_eq!(output, "hello\n");
        assert_eq!(code, 0);
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(run_capturing("fn main() -> i64 do ret 1 + 2 * 3 end").0, 7);
        assert_eq!(run_capturing("fn main() -> i64 do ret (1 + 2) * 3 end").0, 9);
    }

    #[test]
    fn precedence_agrees_with_reference_results() {
        let cases: &[(&str, i64)] = &[
            ("2 + 3 * 4 - 5", 9),
            ("10 - 4 - 3", 3),
            ("20 / 2 / 5", 2),
            ("2 * 3 % 4", 2),
            ("1 << 3 | 1", 9),
            ("2 ^ 3 & 1", 3),
            ("7 & 3 | 8", 11),
            ("1 << 2 << 1", 8),
            ("15 >> 1 >> 1", 3),
            ("-2 * 3", -6),
            ("~0 & 15", 15),
            ("100 % 7 + 1", 3),
        ];
        for (expr, expected) in cases {
            let source = format!("fn main() -> i64 do ret {} end", expr);
            assert_eq!(run_capturing(&source).0, *expected, "expr: {}", expr);
        }
    }

    #[test]
    fn scoping_and_mutability() {
        let (code, _) =
            run_capturing("fn main() -> i64 do let x = 1 mut y = 2 y = y + x ret y end");
        assert_eq!(code, 3);

        let result = run_source(
            "fn main() -> i64 do let x = 1 x = 2 ret x end",
            Box::new(Vec::new()),
        );
        assert!(matches!(result, Err(CompileError::Analyze)));
    }

    #[test]
    fn for_range_and_break() {
        let source =
            "fn main() -> i64 do mut s = 0 for i in 0..10 do if i == 5 do break end s = s + i end ret s end";
        assert_eq!(run_capturing(source).0, 10);
    }

    #[test]
    fn struct_initializer_and_field_access() {
        let source =
            "struct P do x :: i64 y :: i64 end fn main() -> i64 do let p = P { x = 3, y = 4 } ret p.x + p.y end";
        assert_eq!(run_capturing(source).0, 7);
    }

    #[test]
    fn parse_errors_abort_the_pipeline() {
        let result = run_source("fn main( do ret 0 end", Box::new(Vec::new()));
        assert!(matches!(result, Err(CompileError::Parse { count }) if count > 0));
    }

    #[test]
    fn import_cycle_tolerance() {
        let loader = MemLoader::new()
            .add(
                "a.nl",
                "@use \"./b.nl\"\nfn main() -> i64 do\n    ret 0\nend\n",
            )
            .add(
                "b.nl",
                "@use \"./a.nl\"\nfn helper() -> i64 do\n    ret 1\nend\n",
            );
        let mut pre = Preprocessor::with_loader(loader, "std");
        let buffer = pre.expand_file(Path::new("a.nl")).unwrap();
        let code = run_buffer(&buffer, Box::new(Vec::new())).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn std_imports_resolve_under_the_std_root() {
        let loader = MemLoader::new()
            .add(
                "main.nl",
                concat!(
                    "@use \"std/io.nl\"\n",
                    "fn main() -> i64 do\n",
                    "    io_print(\"from std\")\n",
                    "    ret 0\n",
                    "end\n",
                ),
            )
            .add(
                "lib/io.nl",
                concat!(
                    "@extern \"C\" do\n",
                    "    fn puts(s :: ptr<u8>) -> i32\n",
                    "end\n",
                    "fn io_print(s :: ptr<u8>) -> void do\n",
                    "    puts(s)\n",
                    "end\n",
                ),
            );
        let mut pre = Preprocessor::with_loader(loader, "lib");
        let buffer = pre.expand_file(Path::new("main.nl")).unwrap();

        let mut captured = Vec::new();
        let code = run_buffer(&buffer, Box::new(&mut captured)).unwrap();
        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(captured).unwrap(), "from std\n");
    }

    #[test]
    fn resolved_program_feeds_the_backend() {
        let buffer = concat!(
            "struct P do\n    x :: i64\nend\n",
            "enum E do\n    A\nend\n",
            "fn main() -> i64 do\n    ret 0\nend\n",
        );
        let (program, resolved) = compile_buffer(buffer).unwrap();

        let mut backend = RecordingBackend::default();
        backend
            .compile(&Target::host(), &resolved, &program)
            .unwrap();
        assert_eq!(backend.seen, vec!["struct P", "enum E", "fn main"]);
    }

    #[test]
    fn runtime_errors_surface_as_exit_failures() {
        let result = run_source(
            "fn main() -> i64 do\n    break\n    ret 0\nend\n",
            Box::new(Vec::new()),
        );
        assert!(matches!(result, Err(CompileError::Runtime { .. })));
    }
}
