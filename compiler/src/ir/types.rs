//! IR Type System
//!
//! Defines the layout-level type system consumed by the backend GC passes.
//! Types here carry everything the pointer-map walker and frame layout need:
//! storage width, alignment, and which words hold pointers. Reference types
//! (channels, maps, function values) are opaque single-word pointers at this
//! level; strings, interfaces, and slices have fixed multi-word layouts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size in bytes of a pointer word on the target.
pub const PTR_WIDTH: i64 = 8;

/// Size in bytes of a general-purpose register on the target.
pub const REG_WIDTH: i64 = 8;

/// IR type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    /// Boolean type
    Bool,

    /// Integer types
    Int8,
    Int16,
    Int32,
    Int64,

    /// Unsigned integer types
    Uint8,
    Uint16,
    Uint32,
    Uint64,

    /// Pointer-sized unsigned integer (not a pointer for GC purposes)
    Uintptr,

    /// Floating point types
    Float32,
    Float64,

    /// Complex types (pairs of floats, still scalar for GC purposes)
    Complex64,
    Complex128,

    /// Typed pointer
    Ptr(Box<IrType>),

    /// Untyped pointer (still scanned by the collector)
    UnsafePtr,

    /// Channel handle (one pointer word)
    Chan,

    /// Map handle (one pointer word)
    Map,

    /// Function value (one pointer word)
    Func,

    /// String header: { data *u8, len } — pointer in the first word
    String,

    /// Interface header: { tab, data } — pointers in both words
    Interface,

    /// Slice header: { data, len, cap } — pointer in the first word
    Slice(Box<IrType>),

    /// Fixed-size array
    Array { elem: Box<IrType>, len: i64 },

    /// Structure with laid-out fields (offsets assigned by the frontend)
    Struct { name: String, fields: Vec<StructField> },
}

/// Structure field with its assigned byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub ty: IrType,
    pub offset: i64,
}

impl IrType {
    pub fn ptr(elem: IrType) -> Self {
        IrType::Ptr(Box::new(elem))
    }

    pub fn slice(elem: IrType) -> Self {
        IrType::Slice(Box::new(elem))
    }

    pub fn array(elem: IrType, len: i64) -> Self {
        IrType::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Storage width in bytes, including trailing struct padding.
    pub fn width(&self) -> i64 {
        match self {
            IrType::Bool | IrType::Int8 | IrType::Uint8 => 1,
            IrType::Int16 | IrType::Uint16 => 2,
            IrType::Int32 | IrType::Uint32 | IrType::Float32 => 4,
            IrType::Int64 | IrType::Uint64 | IrType::Float64 | IrType::Uintptr => 8,
            IrType::Complex64 => 8,
            IrType::Complex128 => 16,
            IrType::Ptr(_) | IrType::UnsafePtr | IrType::Chan | IrType::Map | IrType::Func => {
                PTR_WIDTH
            }
            IrType::String => 2 * PTR_WIDTH,
            IrType::Interface => 2 * PTR_WIDTH,
            IrType::Slice(_) => 3 * PTR_WIDTH,
            IrType::Array { elem, len } => elem.width() * len,
            IrType::Struct { fields, .. } => {
                let unpadded = fields
                    .last()
                    .map(|f| f.offset + f.ty.width())
                    .unwrap_or(0);
                round_up(unpadded, self.align())
            }
        }
    }

    /// Alignment requirement in bytes.
    pub fn align(&self) -> i64 {
        match self {
            IrType::Bool | IrType::Int8 | IrType::Uint8 => 1,
            IrType::Int16 | IrType::Uint16 => 2,
            IrType::Int32 | IrType::Uint32 | IrType::Float32 | IrType::Complex64 => 4,
            IrType::Int64
            | IrType::Uint64
            | IrType::Float64
            | IrType::Uintptr
            | IrType::Complex128 => 8,
            IrType::Ptr(_)
            | IrType::UnsafePtr
            | IrType::Chan
            | IrType::Map
            | IrType::Func
            | IrType::String
            | IrType::Interface
            | IrType::Slice(_) => PTR_WIDTH,
            IrType::Array { elem, .. } => elem.align(),
            IrType::Struct { fields, .. } => {
                fields.iter().map(|f| f.ty.align()).max().unwrap_or(1)
            }
        }
    }

    /// Whether any word of this type's storage holds a pointer the collector
    /// must trace.
    pub fn has_pointers(&self) -> bool {
        match self {
            IrType::Ptr(_)
            | IrType::UnsafePtr
            | IrType::Chan
            | IrType::Map
            | IrType::Func
            | IrType::String
            | IrType::Interface
            | IrType::Slice(_) => true,
            IrType::Array { elem, .. } => elem.has_pointers(),
            IrType::Struct { fields, .. } => fields.iter().any(|f| f.ty.has_pointers()),
            _ => false,
        }
    }

    /// A fat type is wider than one word and composed of two or more
    /// independent fields, so a write to part of it does not overwrite the
    /// whole variable. Strings, interfaces, and slices are fat; a single
    /// pointer is not.
    pub fn is_fat(&self) -> bool {
        match self {
            IrType::String | IrType::Interface | IrType::Slice(_) => true,
            IrType::Array { len, .. } => *len >= 2 && self.width() > PTR_WIDTH,
            IrType::Struct { fields, .. } => fields.len() >= 2 && self.width() > PTR_WIDTH,
            _ => false,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Bool => write!(f, "bool"),
            IrType::Int8 => write!(f, "i8"),
            IrType::Int16 => write!(f, "i16"),
            IrType::Int32 => write!(f, "i32"),
            IrType::Int64 => write!(f, "i64"),
            IrType::Uint8 => write!(f, "u8"),
            IrType::Uint16 => write!(f, "u16"),
            IrType::Uint32 => write!(f, "u32"),
            IrType::Uint64 => write!(f, "u64"),
            IrType::Uintptr => write!(f, "uptr"),
            IrType::Float32 => write!(f, "f32"),
            IrType::Float64 => write!(f, "f64"),
            IrType::Complex64 => write!(f, "c64"),
            IrType::Complex128 => write!(f, "c128"),
            IrType::Ptr(elem) => write!(f, "*{}", elem),
            IrType::UnsafePtr => write!(f, "*raw"),
            IrType::Chan => write!(f, "chan"),
            IrType::Map => write!(f, "map"),
            IrType::Func => write!(f, "func"),
            IrType::String => write!(f, "string"),
            IrType::Interface => write!(f, "iface"),
            IrType::Slice(elem) => write!(f, "[]{}", elem),
            IrType::Array { elem, len } => write!(f, "[{}]{}", len, elem),
            IrType::Struct { name, .. } => write!(f, "struct {}", name),
        }
    }
}

pub(crate) fn round_up(n: i64, align: i64) -> i64 {
    if align <= 1 {
        return n;
    }
    (n + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_struct() -> IrType {
        IrType::Struct {
            name: "Pair".to_string(),
            fields: vec![
                StructField {
                    name: "head".to_string(),
                    ty: IrType::ptr(IrType::Int64),
                    offset: 0,
                },
                StructField {
                    name: "count".to_string(),
                    ty: IrType::Int32,
                    offset: 8,
                },
            ],
        }
    }

    #[test]
    fn test_scalar_widths() {
        assert_eq!(IrType::Bool.width(), 1);
        assert_eq!(IrType::Int32.width(), 4);
        assert_eq!(IrType::Complex128.width(), 16);
        assert_eq!(IrType::ptr(IrType::Bool).width(), PTR_WIDTH);
    }

    #[test]
    fn test_header_widths() {
        assert_eq!(IrType::String.width(), 16);
        assert_eq!(IrType::Interface.width(), 16);
        assert_eq!(IrType::slice(IrType::Uint8).width(), 24);
    }

    #[test]
    fn test_struct_width_includes_padding() {
        // Last field ends at 12; align 8 pads the struct to 16.
        let pair = pair_struct();
        assert_eq!(pair.align(), 8);
        assert_eq!(pair.width(), 16);
    }

    #[test]
    fn test_has_pointers() {
        assert!(!IrType::Int64.has_pointers());
        assert!(!IrType::Uintptr.has_pointers());
        assert!(IrType::UnsafePtr.has_pointers());
        assert!(IrType::String.has_pointers());
        assert!(pair_struct().has_pointers());
        assert!(!IrType::array(IrType::Float64, 4).has_pointers());
        assert!(IrType::array(IrType::Map, 2).has_pointers());
    }

    #[test]
    fn test_is_fat() {
        assert!(!IrType::ptr(IrType::Int64).is_fat());
        assert!(!IrType::Complex128.is_fat());
        assert!(IrType::String.is_fat());
        assert!(IrType::Interface.is_fat());
        assert!(IrType::slice(IrType::Int8).is_fat());
        assert!(IrType::array(IrType::Int64, 2).is_fat());
        assert!(!IrType::array(IrType::Int64, 1).is_fat());
        assert!(pair_struct().is_fat());
    }
}
