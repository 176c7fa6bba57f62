//! The layout computer: assigns every struct field a byte offset, and
//! exposes the address arithmetic for array elements.

use crate::ir::{FieldType, NumType, ValType};
use smallvec::SmallVec;

/// Per-struct-heap-type layout: total size and per-field byte offset.
/// Array layout is deliberately not represented by this type; it is fixed
/// and consulted directly at helper-emission time instead.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout {
    pub size: u32,
    pub field_offsets: SmallVec<[u32; 4]>,
}

/// Packed 8-/16-bit fields are widened to a 32-bit storage slot at the
/// struct-layout/helper-emission boundary; packed field widths are not
/// honored in memory. Applied to an already-`lower`ed type, since plain
/// type lowering never widens; only this boundary does.
pub fn storage_type(lowered: &ValType) -> ValType {
    match lowered {
        ValType::Num(NumType::I8) | ValType::Num(NumType::I16) => ValType::Num(NumType::I32),
        other => other.clone(),
    }
}

/// Compute the layout of a struct's fields, given each field's *already
/// lowered* storage type in declaration order.
pub fn compute_layout(field_storage_types: &[ValType], pointer_size: u32) -> Layout {
    let mut next = pointer_size;
    let mut field_offsets = SmallVec::new();
    for ty in field_storage_types {
        field_offsets.push(next);
        next += super::type_lower::byte_size(ty);
    }
    Layout { size: next, field_offsets }
}

/// Byte offset of array element `index` from the array's base pointer:
/// `base + 2*pointerSize + i*byteSize(lower(element))`. Always computed
/// from `2*pointer_size` rather than a hardcoded 8, so this stays correct
/// on a 64-bit memory too.
pub fn array_element_offset(pointer_size: u32, element_storage_size: u32, index: u32) -> u32 {
    2 * pointer_size + index * element_storage_size
}

/// Byte offset, as a compile-time constant, of the array length word.
pub fn array_length_offset(pointer_size: u32) -> u32 {
    pointer_size
}

pub fn lowered_field_storage_type(field: &FieldType, pointer_type: &ValType) -> ValType {
    storage_type(&super::type_lower::lower(&field.ty, pointer_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_reserved_and_monotone() {
        let fields = vec![ValType::i32(), ValType::Num(NumType::I64)];
        let layout = compute_layout(&fields, 4);
        assert_eq!(layout.field_offsets[0], 4);
        assert_eq!(layout.field_offsets[1], 8);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn array_offsets_use_two_pointer_sizes_not_a_literal_eight() {
        assert_eq!(array_element_offset(8, 4, 0), 16);
        assert_eq!(array_element_offset(8, 4, 2), 24);
    }

    #[cfg(feature = "enable-serde")]
    #[test]
    fn layout_round_trips_through_json() {
        let layout = compute_layout(&[ValType::i32(), ValType::Num(NumType::I64)], 4);
        let json = serde_json::to_string(&layout).unwrap();
        let back: Layout = serde_json::from_str(&json).unwrap();
        assert_eq!(layout, back);
    }
}
