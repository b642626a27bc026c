//! Plain Old Data types stored by sequence archives.

use std::fmt;

/// Plain Old Data type of a property's elements.
///
/// Discriminants are the Alembic POD tags written into property headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PlainOldDataType {
    /// Signed 8-bit integer; only used as the tag of keyed numeric data
    Int8 = 2,
    /// Signed 32-bit integer
    Int32 = 6,
    /// 32-bit floating point
    Float32 = 10,
    /// 64-bit floating point
    Float64 = 11,
    /// UTF-8 string, NUL terminated on disk
    String = 12,
}

impl PlainOldDataType {
    /// Size in bytes of one element. Strings count one byte per character.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Int8 | Self::String => 1,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Alembic name of this type, as written into `podName` metadata.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8_t",
            Self::Int32 => "int32_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
            Self::String => "string",
        }
    }

    /// Convert from the header tag. Types sequence archives never
    /// write yield `None`.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            2 => Some(Self::Int8),
            6 => Some(Self::Int32),
            10 => Some(Self::Float32),
            11 => Some(Self::Float64),
            12 => Some(Self::String),
            _ => None,
        }
    }

    /// Header tag.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Returns true for string types.
    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String)
    }
}

impl fmt::Display for PlainOldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
