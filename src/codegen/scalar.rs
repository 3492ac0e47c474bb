//! Scalar Type Table
//!
//! Wire scalar codes as numbered by the reflected descriptors.

use crate::error::{ReconError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    Uint32,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl ScalarType {
    pub const ALL: [ScalarType; 15] = [
        ScalarType::Double,
        ScalarType::Float,
        ScalarType::Int64,
        ScalarType::Uint64,
        ScalarType::Int32,
        ScalarType::Fixed64,
        ScalarType::Fixed32,
        ScalarType::Bool,
        ScalarType::String,
        ScalarType::Bytes,
        ScalarType::Uint32,
        ScalarType::Sfixed32,
        ScalarType::Sfixed64,
        ScalarType::Sint32,
        ScalarType::Sint64,
    ];

    /// Codes 10 (group), 11 (message) and 14 (enum) are not scalars
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => ScalarType::Double,
            2 => ScalarType::Float,
            3 => ScalarType::Int64,
            4 => ScalarType::Uint64,
            5 => ScalarType::Int32,
            6 => ScalarType::Fixed64,
            7 => ScalarType::Fixed32,
            8 => ScalarType::Bool,
            9 => ScalarType::String,
            12 => ScalarType::Bytes,
            13 => ScalarType::Uint32,
            15 => ScalarType::Sfixed32,
            16 => ScalarType::Sfixed64,
            17 => ScalarType::Sint32,
            18 => ScalarType::Sint64,
            _ => return None,
        })
    }

    pub fn code(&self) -> i64 {
        match self {
            ScalarType::Double => 1,
            ScalarType::Float => 2,
            ScalarType::Int64 => 3,
            ScalarType::Uint64 => 4,
            ScalarType::Int32 => 5,
            ScalarType::Fixed64 => 6,
            ScalarType::Fixed32 => 7,
            ScalarType::Bool => 8,
            ScalarType::String => 9,
            ScalarType::Bytes => 12,
            ScalarType::Uint32 => 13,
            ScalarType::Sfixed32 => 15,
            ScalarType::Sfixed64 => 16,
            ScalarType::Sint32 => 17,
            ScalarType::Sint64 => 18,
        }
    }

    /// Canonical proto3 spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int64 => "int64",
            ScalarType::Uint64 => "uint64",
            ScalarType::Int32 => "int32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Uint32 => "uint32",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
        }
    }
}

/// Canonical scalar name for a wire code
pub fn scalar_name(code: i64) -> Result<&'static str> {
    ScalarType::from_code(code)
        .map(|s| s.as_str())
        .ok_or(ReconError::UnknownScalar(code))
}
