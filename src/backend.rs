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

//! The native-code collaborator boundary.
//!
//! Analysis produces one [`ResolvedProgram`] holding every nominal entity of
//! the compilation: function signatures, struct layouts and enum variant
//! tables. Both the interpreter and any native backend consume this same
//! datatype, so there is exactly one symbol table to keep correct.
//!
//! Code emission itself lives behind the opaque [`Backend`] trait; this
//! crate ships no implementation of it beyond a recorder used in tests.

use snafu::Snafu;

use crate::ast::{Node, Program};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub ret: Type,
    pub is_extern: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub name: String,
    pub fields: Vec<(String, Type)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumLayout {
    pub name: String,
    pub variants: Vec<(String, i64)>,
}

impl EnumLayout {
    pub fn variant_value(&self, variant: &str) -> Option<i64> {
        self.variants
            .iter()
            .find(|(name, _)| name == variant)
            .map(|(_, value)| *value)
    }
}

/// Every named entity of an analyzed program, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedProgram {
    pub functions: Vec<FnSig>,
    pub structs: Vec<StructLayout>,
    pub enums: Vec<EnumLayout>,
}

impl ResolvedProgram {
    pub fn function(&self, name: &str) -> Option<&FnSig> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn struct_layout(&self, name: &str) -> Option<&StructLayout> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn enum_layout(&self, name: &str) -> Option<&EnumLayout> {
        self.enums.iter().find(|e| e.name == name)
    }
}

/// What the backend is emitting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub triple: String,
    pub pointer_width: u32,
}

impl Target {
    pub fn host() -> Self {
        Target {
            triple: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
            pointer_width: std::mem::size_of::<usize>() as u32 * 8,
        }
    }
}

#[derive(Debug, PartialEq, Snafu)]
pub enum BackendError {
    #[snafu(display("backend does not support {}", feature))]
    Unsupported { feature: String },
    #[snafu(display("backend failure: {}", message))]
    Failed { message: String },
}

/// An opaque code generator. It receives the analyzed tree plus the resolved
/// entities and owns everything from there on (lowering, emission, linking).
pub trait Backend {
    fn name(&self) -> &str;

    fn compile(
        &mut self,
        target: &Target,
        program: &ResolvedProgram,
        ast: &Node<Program>,
    ) -> Result<(), BackendError>;
}

/// Backend double that records which entities it was handed.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub seen: Vec<String>,
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn compile(
        &mut self,
        _target: &Target,
        program: &ResolvedProgram,
        _ast: &Node<Program>,
    ) -> Result<(), BackendError> {
        for s in &program.structs {
            self.seen.push(format!("struct {}", s.name));
        }
        for e in &program.enums {
            self.seen.push(format!("enum {}", e.name));
        }
        for f in &program.functions {
            self.seen.push(format!("fn {}", f.name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_variant_lookup() {
        let layout = EnumLayout {
            name: "Color".into(),
            variants: vec![("Red".into(), 0), ("Green".into(), 5), ("Blue".into(), 6)],
        };
        assert_eq!(layout.variant_value("Green"), Some(5));
        assert_eq!(layout.variant_value("Mauve"), None);
    }

    #[test]
    fn resolved_program_lookups() {
        let program = ResolvedProgram {
            functions: vec![FnSig {
                name: "main".into(),
                params: vec![],
                ret: Type::I64,
                is_extern: false,
            }],
            structs: vec![StructLayout {
                name: "Point".into(),
                fields: vec![("x".into(), Type::I64)],
            }],
            enums: vec![],
        };
        assert!(program.function("main").is_some());
        assert!(program.function("other").is_none());
        assert!(program.struct_layout("Point").is_some());
        assert!(program.enum_layout("Point").is_none());
    }

    #[test]
    fn host_target_is_sane() {
        let target = Target::host();
        assert!(target.pointer_width == 32 || target.pointer_width == 64);
        assert!(target.triple.contains('-'));
    }
}
