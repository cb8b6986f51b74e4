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

//! `@use` expansion.
//!
//! The preprocessor turns a source file and its imports into a single
//! contiguous buffer. Import paths resolve in three ways: `std/<rest>` under
//! the standard-library root, `./<rest>` relative to the importing file,
//! anything else as-is. The set of already-imported paths lives on the
//! preprocessor context; re-importing is a no-op, which also makes cyclic
//! import graphs terminate.
//!
//! A minimal extern header (one print primitive plus its wrapper) is
//! prepended only when the top-level file has no `@use` at all, so files with
//! imports bring their own runtime surface.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use snafu::{ensure, ResultExt, Snafu};

pub const DEFAULT_MAX_OUTPUT: usize = 50 * 1024 * 1024;
pub const DEFAULT_MAX_IMPORTS: usize = 64;

const BUILTIN_HEADER: &str = "\
@extern \"C\" do
    fn puts(s :: ptr<u8>) -> i32
end

fn io_print(s :: ptr<u8>) -> void do
    puts(s)
end

";

#[derive(Debug, Snafu)]
pub enum PreprocessError {
    #[snafu(display("could not read {}: {}", path.display(), source))]
    ReadSource { path: PathBuf, source: io::Error },
    #[snafu(display("preprocessed source exceeds {} bytes", limit))]
    OutputTooLarge { limit: usize },
    #[snafu(display("too many imports (limit is {})", limit))]
    TooManyImports { limit: usize },
}

/// Where source text comes from. The filesystem in production, an in-memory
/// map in tests.
pub trait SourceLoader {
    fn load(&self, path: &Path) -> io::Result<String>;
}

pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Loader over a fixed set of named sources.
pub struct MemLoader {
    files: HashMap<PathBuf, String>,
}

impl MemLoader {
    pub fn new() -> Self {
        MemLoader {
            files: HashMap::new(),
        }
    }

    pub fn add(mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.files.insert(path.into(), source.into());
        self
    }
}

impl Default for MemLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceLoader for MemLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no such file")
        })
    }
}

pub struct Preprocessor<L> {
    loader: L,
    std_root: PathBuf,
    imported: HashSet<PathBuf>,
    max_output: usize,
    max_imports: usize,
}

impl Preprocessor<FsLoader> {
    pub fn new(std_root: impl Into<PathBuf>) -> Self {
        Self::with_loader(FsLoader, std_root)
    }
}

impl<L: SourceLoader> Preprocessor<L> {
    pub fn with_loader(loader: L, std_root: impl Into<PathBuf>) -> Self {
        Preprocessor {
            loader,
            std_root: std_root.into(),
            imported: HashSet::new(),
            max_output: DEFAULT_MAX_OUTPUT,
            max_imports: DEFAULT_MAX_IMPORTS,
        }
    }

    pub fn limits(mut self, max_output: usize, max_imports: usize) -> Self {
        self.max_output = max_output;
        self.max_imports = max_imports;
        self
    }

    /// Expand the given top-level file into one contiguous buffer.
    pub fn expand_file(&mut self, path: &Path) -> Result<String, PreprocessError> {
        let source = self.loader.load(path).context(ReadSource {
            path: path.to_path_buf(),
        })?;
        self.imported.insert(path.to_path_buf());
        let base = parent_dir(path);
        self.expand_source(&source, &base)
    }

    /// Expand an already-loaded top-level source. `base` anchors `./` imports.
    pub fn expand_source(&mut self, source: &str, base: &Path) -> Result<String, PreprocessError> {
        let mut out = String::new();
        if !has_use_directive(source) {
            out.push_str(BUILTIN_HEADER);
        }
        self.expand_into(&mut out, source, base)?;
        Ok(out)
    }

    fn expand_into(
        &mut self,
        out: &mut String,
        source: &str,
        base: &Path,
    ) -> Result<(), PreprocessError> {
        let mut segments = source.split('\n').peekable();
        while let Some(line) = segments.next() {
            match use_path(line) {
                Some(path) => {
                    let resolved = self.resolve(path, base);
                    if self.imported.insert(resolved.clone()) {
                        ensure!(
                            self.imported.len() <= self.max_imports,
                            TooManyImports {
                                limit: self.max_imports
                            }
                        );
                        log::debug!("importing {}", resolved.display());
                        let text = self.loader.load(&resolved).context(ReadSource {
                            path: resolved.clone(),
                        })?;
                        let nested_base = parent_dir(&resolved);
                        self.expand_into(out, &text, &nested_base)?;
                        out.push('\n');
                    }
                    // The directive line itself collapses to the newline
                    // pushed below, keeping later line numbers stable.
                }
                None => out.push_str(line),
            }
            if segments.peek().is_some() {
                out.push('\n');
            }
            ensure!(
                out.len() <= self.max_output,
                OutputTooLarge {
                    limit: self.max_output
                }
            );
        }
        Ok(())
    }

    fn resolve(&self, path: &str, base: &Path) -> PathBuf {
        if let Some(rest) = path.strip_prefix("std/") {
            self.std_root.join(rest)
        } else if let Some(rest) = path.strip_prefix("./") {
            base.join(rest)
        } else {
            PathBuf::from(path)
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    // An empty base keeps bare filenames bare, so `a.nl` and `./a.nl` land on
    // the same key in the import set.
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn has_use_directive(source: &str) -> bool {
    source.lines().any(|line| use_path(line).is_some())
}

/// The quoted import path of a well-formed `@use` line. Lines that carry the
/// directive but no quoted path are left alone for the parser to diagnose.
fn use_path(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("@use")?;
    let first = rest.find('"')?;
    let rest = &rest[first + 1..];
    let second = rest.find('"')?;
    Some(&rest[..second])
}
