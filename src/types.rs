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

//! The closed set of nyl types.
//!
//! Types are value-semantics entities. Equality is structural for the
//! composite variants except `Struct` and `Enum`, which compare by name
//! (nominal typing): the parser produces named types with empty bodies and
//! those must still compare equal to the fully elaborated definitions the
//! analyzer builds. A bare annotation cannot tell a struct from an enum, so
//! the nominal comparison crosses the two variants as well.

use std::fmt;

#[derive(Debug, Clone)]
pub enum Type {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Ptr(Box<Type>),
    /// Fixed-size array `[T; N]`.
    Array(Box<Type>, u32),
    /// Unsized view `[T]`. String literals have type `[u8]`.
    Slice(Box<Type>),
    Struct {
        name: String,
        fields: Vec<(String, Type)>,
    },
    Enum {
        name: String,
        variants: Vec<(String, i64)>,
    },
    Fn {
        ret: Box<Type>,
        params: Vec<Type>,
    },
    Unknown,
}

impl Type {
    pub fn named(name: impl Into<String>) -> Type {
        Type::Struct {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::U8
                | Type::U16
                | Type::U32
                | Type::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_float()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        use Type::*;
        match (self, other) {
            (Void, Void) | (Bool, Bool) | (Unknown, Unknown) => true,
            (I8, I8) | (I16, I16) | (I32, I32) | (I64, I64) => true,
            (U8, U8) | (U16, U16) | (U32, U32) | (U64, U64) => true,
            (F32, F32) | (F64, F64) => true,
            (Ptr(a), Ptr(b)) => a == b,
            (Array(a, n), Array(b, m)) => n == m && a == b,
            (Slice(a), Slice(b)) => a == b,
            // `Type::named` always builds a `Struct`, even when the name
            // denotes an enum, so name equality must hold across the kinds.
            (Struct { name: a, .. }, Struct { name: b, .. })
            | (Enum { name: a, .. }, Enum { name: b, .. })
            | (Struct { name: a, .. }, Enum { name: b, .. })
            | (Enum { name: a, .. }, Struct { name: b, .. }) => a == b,
            (
                Fn { ret: ra, params: pa },
                Fn { ret: rb, params: pb },
            ) => ra == rb && pa == pb,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::U8 => write!(f, "u8"),
            Type::U16 => write!(f, "u16"),
            Type::U32 => write!(f, "u32"),
            Type::U64 => write!(f, "u64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::Ptr(inner) => write!(f, "ptr<{}>", inner),
            Type::Array(elem, size) => write!(f, "[{}; {}]", elem, size),
            Type::Slice(elem) => write!(f, "[{}]", elem),
            Type::Struct { name, .. } => write!(f, "{}", name),
            Type::Enum { name, .. } => write!(f, "{}", name),
            Type::Fn { ret, params } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Unknown => write!(f, "unknown"),
        }
    }
}
