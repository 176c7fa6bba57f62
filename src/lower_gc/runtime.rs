//! The runtime synthesizer: installs the linear memory, the bump-allocator
//! global, and the `malloc` function every lowered module needs.

use crate::error::{LowerError, LowerResult};
use crate::ir::builder::{add_i32, const_i32, local_get, sub_i32};
use crate::ir::{Expr, FuncId, FuncSig, Function, Global, GlobalId, IndexType, Memory, Module, ValType};
use crate::lower_gc::names;
use cranelift_entity::EntityRef;

/// The pieces of the runtime this module installs, handed to the helper
/// emitter and body rewriter afterward.
pub struct Runtime {
    pub malloc_func: FuncId,
    pub next_malloc_global: GlobalId,
}

const MEMORY_PAGES: u32 = 256;

/// Install a 256-page memory, the `nextMalloc` global, and `malloc`.
/// Rejects a pre-existing 64-bit memory; the memory must be 32-bit.
pub fn synthesize(module: &mut Module, pointer_type: ValType) -> LowerResult<Runtime> {
    if let Some(existing) = &module.memory {
        if existing.index_type == IndexType::I64 {
            return Err(LowerError::UnsupportedMemory);
        }
    }
    module.memory = Some(Memory {
        index_type: IndexType::I32,
        min_pages: MEMORY_PAGES,
        max_pages: Some(MEMORY_PAGES),
    });

    let next_malloc_global = module.globals.push(Global {
        ty: pointer_type.clone(),
        mutable: true,
        init: const_i32(0),
    });

    let param = crate::ir::LocalId::new(0);
    let body = Expr::Block {
        label: "malloc_body".into(),
        body: vec![
            Expr::GlobalSet {
                global: next_malloc_global,
                value: Box::new(add_i32(
                    Expr::GlobalGet { global: next_malloc_global, ty: pointer_type.clone() },
                    local_get(param, pointer_type.clone()),
                )),
            },
            sub_i32(
                Expr::GlobalGet { global: next_malloc_global, ty: pointer_type.clone() },
                local_get(param, pointer_type.clone()),
            ),
        ],
        ty: pointer_type.clone(),
    };

    let malloc_func = module.functions.push(Function {
        name: names::MALLOC.to_string(),
        sig: FuncSig { params: vec![pointer_type.clone()], results: vec![pointer_type] },
        locals: vec![],
        body: Some(body),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    });

    Ok(Runtime { malloc_func, next_malloc_global })
}
