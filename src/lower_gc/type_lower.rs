//! The type lowerer: maps every value type to its post-lowering
//! representation, eliminating references and RTTs in favor of the
//! pointer type.

use crate::ir::{FuncSig, ValType};

/// Map any value type to its post-lowering representation.
///
/// - A reference or RTT type becomes `pointer_type`.
/// - Tuples and function signatures recurse element-wise.
/// - Everything else is returned unchanged.
///
/// Idempotent: `lower(lower(t), p) == lower(t, p)`, since the only types
/// this function changes (`Ref`/`Rtt`) become `pointer_type`, which is
/// itself a scalar `Num` and therefore a fixed point.
pub fn lower(ty: &ValType, pointer_type: &ValType) -> ValType {
    match ty {
        ValType::Ref(_) | ValType::Rtt(_) => pointer_type.clone(),
        ValType::Tuple(elems) => ValType::Tuple(elems.iter().map(|e| lower(e, pointer_type)).collect()),
        ValType::Func(sig) => ValType::Func(Box::new(FuncSig {
            params: sig.params.iter().map(|p| lower(p, pointer_type)).collect(),
            results: sig.results.iter().map(|r| lower(r, pointer_type)).collect(),
        })),
        ValType::Num(_) => ty.clone(),
    }
}

/// Byte size of an already-lowered type (every lowered scalar has a
/// natural width; tuples/funcs never appear as field or local storage in
/// this dialect, only as transient block/signature types).
pub fn byte_size(ty: &ValType) -> u32 {
    match ty {
        ValType::Num(n) => n.byte_size(),
        _ => unreachable!("byte_size requested for a non-scalar lowered type: {ty:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{HeapTypeId, NumType};
    use cranelift_entity::EntityRef;

    #[test]
    fn idempotent_on_reference() {
        let ptr = ValType::i32();
        let id = HeapTypeId::new(0);
        let once = lower(&ValType::Ref(id), &ptr);
        let twice = lower(&once, &ptr);
        assert_eq!(once, twice);
        assert_eq!(once, ptr);
    }

    #[test]
    fn recurses_into_tuples() {
        let ptr = ValType::i32();
        let id = HeapTypeId::new(0);
        let tuple = ValType::Tuple(vec![ValType::Num(NumType::I64), ValType::Ref(id)]);
        let lowered = lower(&tuple, &ptr);
        assert_eq!(lowered, ValType::Tuple(vec![ValType::Num(NumType::I64), ptr]));
    }

    #[test]
    fn scalars_pass_through() {
        let ptr = ValType::i32();
        assert_eq!(lower(&ValType::Num(NumType::F64), &ptr), ValType::Num(NumType::F64));
    }
}
