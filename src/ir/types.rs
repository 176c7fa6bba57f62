//! The value-type and heap-type data model: scalars, references, RTTs,
//! and the struct/array heap types they refer to.

use crate::ir::entities::HeapTypeId;
use smallvec::SmallVec;

/// A scalar numeric Wasm type, with its natural byte size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl NumType {
    /// Natural, unpacked byte size. Packed fields (I8/I16) still report
    /// their *declared* width here; lowering widens them to I32 storage
    /// at the struct-layout / helper-emission boundary.
    pub fn byte_size(self) -> u32 {
        match self {
            NumType::I8 => 1,
            NumType::I16 => 2,
            NumType::I32 | NumType::F32 => 4,
            NumType::I64 | NumType::F64 => 8,
        }
    }
}

/// A Wasm value type: a scalar, a reference to a heap type, an RTT
/// referring to a heap type, or one of a handful of structural composites.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValType {
    Num(NumType),
    /// `(ref null? $heaptype)`, eliminated by lowering.
    Ref(HeapTypeId),
    /// `(rtt $heaptype)`, eliminated by lowering.
    Rtt(HeapTypeId),
    /// A tuple of types (multi-value block/function results).
    Tuple(Vec<ValType>),
    /// A function signature value (used for `call_indirect`-style typing).
    Func(Box<FuncSig>),
}

impl ValType {
    /// The type of a statement-shaped node with no result.
    pub fn none() -> ValType {
        ValType::Tuple(Vec::new())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ValType::Tuple(v) if v.is_empty())
    }

    pub fn is_ref_or_rtt(&self) -> bool {
        matches!(self, ValType::Ref(_) | ValType::Rtt(_))
    }

    pub fn i32() -> ValType {
        ValType::Num(NumType::I32)
    }
}

/// A function signature: ordered parameter and result types.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct FuncSig {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

/// One field of a struct heap type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub ty: ValType,
    pub mutable: bool,
}

/// A struct (ordered fields) or an array (one element field type, dynamic
/// length).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeapType {
    Struct { fields: SmallVec<[FieldType; 4]> },
    Array { element: FieldType },
}

impl HeapType {
    pub fn is_struct(&self) -> bool {
        matches!(self, HeapType::Struct { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, HeapType::Array { .. })
    }

    pub fn as_struct(&self) -> Option<&SmallVec<[FieldType; 4]>> {
        match self {
            HeapType::Struct { fields } => Some(fields),
            HeapType::Array { .. } => None,
        }
    }

    pub fn as_array_element(&self) -> Option<&FieldType> {
        match self {
            HeapType::Array { element } => Some(element),
            HeapType::Struct { .. } => None,
        }
    }
}
