//! Primitive value kinds carried by schema nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage kind of a schema node.
///
/// `None` marks a struct node whose bytes are the concatenation of its
/// children. Every other kind has an intrinsic binary representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    /// Struct node (no intrinsic value)
    #[default]
    None = 0,
    /// Boolean stored as one byte
    Bool = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 8-bit integer
    UInt8 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 16-bit integer
    UInt16 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 32-bit integer
    UInt32 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// Unsigned 64-bit integer
    UInt64 = 9,
    /// 32-bit float
    Float = 10,
    /// 64-bit float
    Double = 11,
    /// Length-prefixed UTF-8 string, always aligned afterwards
    String = 12,
    /// Length-prefixed raw byte blob
    ByteArray = 13,
    /// Generic array with `[size, data]` children
    Array = 14,
    /// Polymorphic managed reference registry
    ManagedReferencesRegistry = 15,
}

impl ValueKind {
    /// Fixed byte width of a scalar kind, `None` for variable-size kinds.
    #[inline]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float => Some(4),
            Self::Int64 | Self::UInt64 | Self::Double => Some(8),
            _ => None,
        }
    }

    /// Returns the canonical type name of this kind.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "struct",
            Self::Bool => "bool",
            Self::Int8 => "SInt8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "SInt16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "int",
            Self::UInt32 => "unsigned int",
            Self::Int64 => "SInt64",
            Self::UInt64 => "UInt64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::ByteArray => "TypelessData",
            Self::Array => "Array",
            Self::ManagedReferencesRegistry => "ManagedReferencesRegistry",
        }
    }

    /// Convert from the on-disk u8 tag.
    pub const fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Bool,
            2 => Self::Int8,
            3 => Self::UInt8,
            4 => Self::Int16,
            5 => Self::UInt16,
            6 => Self::Int32,
            7 => Self::UInt32,
            8 => Self::Int64,
            9 => Self::UInt64,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::String,
            13 => Self::ByteArray,
            14 => Self::Array,
            15 => Self::ManagedReferencesRegistry,
            _ => return None,
        })
    }

    /// Returns true if this is an integer kind.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    /// Returns true if this is a floating point kind.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Round `pos` up to the next 4-byte boundary.
#[inline]
pub const fn align4(pos: usize) -> usize {
    (pos + 3) & !3
}
