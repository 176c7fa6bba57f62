//! The helper emitter: a single combined sweep over every heap type that
//! both tables struct layouts and emits every struct/array helper
//! function. Struct and array `*New`/`*NewWithDefault` are each emitted by
//! one function parameterized by `with_default: bool`, rather than two
//! near-duplicate functions.

use crate::error::{LowerError, LowerResult};
use crate::ir::builder::*;
use crate::ir::{Expr, FuncId, FuncSig, Function, HeapType, HeapTypeId, LocalId, Module, ValType};
use crate::lower_gc::layout::{self, Layout};
use crate::lower_gc::names;
use crate::lower_gc::runtime::Runtime;
use cranelift_entity::EntityRef;
use indexmap::IndexMap;

/// Every heap type's struct layout (arrays are deliberately absent; their
/// layout is uniform and computed directly where needed instead).
pub type Layouts = IndexMap<HeapTypeId, Layout>;

/// The name and field/element shape of one heap type, captured once while
/// helper emission still has the module's heap-type table in hand. The
/// body rewriter consumes only this owned snapshot, never the live
/// module, so it has no aliasing conflict with the function bodies it
/// mutates.
pub struct HeapTypeShape {
    pub name: String,
    pub kind: ShapeKind,
}

pub enum ShapeKind {
    Struct { field_storage: Vec<ValType> },
    Array { element_storage: ValType },
}

impl HeapTypeShape {
    pub fn struct_field(&self, field: u32) -> LowerResult<ValType> {
        match &self.kind {
            ShapeKind::Struct { field_storage } => field_storage
                .get(field as usize)
                .cloned()
                .ok_or_else(|| LowerError::UnknownExpressionShape(format!("field {field} out of range for {}", self.name))),
            ShapeKind::Array { .. } => {
                Err(LowerError::UnknownExpressionShape(format!("{} is an array, not a struct", self.name)))
            }
        }
    }

    pub fn array_element(&self) -> LowerResult<ValType> {
        match &self.kind {
            ShapeKind::Array { element_storage } => Ok(element_storage.clone()),
            ShapeKind::Struct { .. } => {
                Err(LowerError::UnknownExpressionShape(format!("{} is a struct, not an array", self.name)))
            }
        }
    }
}

pub type Shapes = IndexMap<HeapTypeId, HeapTypeShape>;

pub fn emit_helpers(
    module: &mut Module,
    pointer_type: &ValType,
    pointer_size: u32,
    runtime: &Runtime,
) -> LowerResult<(Layouts, Shapes)> {
    let mut layouts = Layouts::new();
    let mut shapes = Shapes::new();
    let ids: Vec<HeapTypeId> = module.heap_types.keys().collect();

    for id in ids {
        let heap_type = module.heap_types[id].clone();
        let type_name = module
            .heap_type_name(id)
            .ok_or(LowerError::MissingTypeName(id))?
            .to_string();

        match heap_type {
            HeapType::Struct { fields } => {
                let storage_types: Vec<ValType> =
                    fields.iter().map(|f| layout::lowered_field_storage_type(f, pointer_type)).collect();
                let computed = layout::compute_layout(&storage_types, pointer_size);

                let mut set_ids = Vec::with_capacity(fields.len());
                for (i, storage_ty) in storage_types.iter().enumerate() {
                    set_ids.push(emit_struct_set(
                        module,
                        &type_name,
                        i as u32,
                        computed.field_offsets[i],
                        pointer_type,
                        storage_ty,
                    ));
                    emit_struct_get(module, &type_name, i as u32, computed.field_offsets[i], pointer_type, storage_ty);
                }
                for with_default in [false, true] {
                    emit_struct_new(
                        module,
                        &type_name,
                        &storage_types,
                        &computed,
                        pointer_type,
                        runtime.malloc_func,
                        &set_ids,
                        with_default,
                    );
                }
                shapes.insert(
                    id,
                    HeapTypeShape { name: type_name.clone(), kind: ShapeKind::Struct { field_storage: storage_types } },
                );
                layouts.insert(id, computed);
            }
            HeapType::Array { element } => {
                let elem_storage = layout::lowered_field_storage_type(&element, pointer_type);
                let elem_size = super::type_lower::byte_size(&elem_storage);
                let set_id = emit_array_set(module, &type_name, pointer_size, elem_size, pointer_type, &elem_storage);
                emit_array_get(module, &type_name, pointer_size, elem_size, pointer_type, &elem_storage);
                for with_default in [false, true] {
                    emit_array_new(
                        module,
                        &type_name,
                        pointer_size,
                        elem_size,
                        pointer_type,
                        &elem_storage,
                        runtime.malloc_func,
                        set_id,
                        with_default,
                    );
                }
                shapes.insert(
                    id,
                    HeapTypeShape { name: type_name.clone(), kind: ShapeKind::Array { element_storage: elem_storage } },
                );
            }
        }
    }

    Ok((layouts, shapes))
}

fn emit_struct_get(
    module: &mut Module,
    type_name: &str,
    field: u32,
    offset: u32,
    pointer_type: &ValType,
    field_ty: &ValType,
) -> FuncId {
    let ptr_local = LocalId::new(0);
    let body = load(field_ty.clone(), offset, local_get(ptr_local, pointer_type.clone()));
    module.functions.push(Function {
        name: names::struct_get(type_name, field),
        sig: FuncSig { params: vec![pointer_type.clone()], results: vec![field_ty.clone()] },
        locals: vec![],
        body: Some(body),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    })
}

fn emit_struct_set(
    module: &mut Module,
    type_name: &str,
    field: u32,
    offset: u32,
    pointer_type: &ValType,
    field_ty: &ValType,
) -> FuncId {
    let ptr_local = LocalId::new(0);
    let value_local = LocalId::new(1);
    let body = store(offset, local_get(ptr_local, pointer_type.clone()), local_get(value_local, field_ty.clone()));
    module.functions.push(Function {
        name: names::struct_set(type_name, field),
        sig: FuncSig { params: vec![pointer_type.clone(), field_ty.clone()], results: vec![] },
        locals: vec![],
        body: Some(body),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    })
}

#[allow(clippy::too_many_arguments)]
fn emit_struct_new(
    module: &mut Module,
    type_name: &str,
    storage_types: &[ValType],
    computed: &Layout,
    pointer_type: &ValType,
    malloc: FuncId,
    set_ids: &[FuncId],
    with_default: bool,
) -> FuncId {
    let field_count = storage_types.len();
    let mut params = Vec::new();
    if !with_default {
        params.extend(storage_types.iter().cloned());
    }
    let rtt_param = LocalId::new(params.len());
    params.push(pointer_type.clone());

    let alloc_local = LocalId::new(params.len());
    let mut body_list = vec![
        local_set(alloc_local, call(malloc, vec![const_i32(computed.size as i32)], pointer_type.clone())),
        store(0, local_get(alloc_local, pointer_type.clone()), local_get(rtt_param, pointer_type.clone())),
    ];
    for i in 0..field_count {
        let value = if with_default {
            zero_of(&storage_types[i])
        } else {
            local_get(LocalId::new(i), storage_types[i].clone())
        };
        body_list.push(call(
            set_ids[i],
            vec![local_get(alloc_local, pointer_type.clone()), value],
            ValType::none(),
        ));
    }
    body_list.push(local_get(alloc_local, pointer_type.clone()));

    let mut direct_callees = set_ids.to_vec();
    direct_callees.push(malloc);
    module.functions.push(Function {
        name: names::struct_new(type_name, with_default),
        sig: FuncSig { params, results: vec![pointer_type.clone()] },
        locals: vec![pointer_type.clone()],
        body: Some(block("struct_new_body", body_list, pointer_type.clone())),
        direct_callees,
        has_unanalyzable_call: false,
    })
}

fn emit_array_get(
    module: &mut Module,
    type_name: &str,
    pointer_size: u32,
    elem_size: u32,
    pointer_type: &ValType,
    elem_ty: &ValType,
) -> FuncId {
    let ptr_local = LocalId::new(0);
    let index_local = LocalId::new(1);
    let addr = array_element_addr(pointer_size, elem_size, pointer_type, ptr_local, index_local);
    let body = load(elem_ty.clone(), 0, addr);
    module.functions.push(Function {
        name: names::array_get(type_name),
        sig: FuncSig { params: vec![pointer_type.clone(), pointer_type.clone()], results: vec![elem_ty.clone()] },
        locals: vec![],
        body: Some(body),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    })
}

fn emit_array_set(
    module: &mut Module,
    type_name: &str,
    pointer_size: u32,
    elem_size: u32,
    pointer_type: &ValType,
    elem_ty: &ValType,
) -> FuncId {
    let ptr_local = LocalId::new(0);
    let index_local = LocalId::new(1);
    let value_local = LocalId::new(2);
    let addr = array_element_addr(pointer_size, elem_size, pointer_type, ptr_local, index_local);
    let body = store(0, addr, local_get(value_local, elem_ty.clone()));
    module.functions.push(Function {
        name: names::array_set(type_name),
        sig: FuncSig { params: vec![pointer_type.clone(), pointer_type.clone(), elem_ty.clone()], results: vec![] },
        locals: vec![],
        body: Some(body),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    })
}

/// `ptr + 2*pointerSize + index*elemSize`, computed at runtime since the
/// index is dynamic. The `2*pointerSize` constant is folded at emission
/// time; only the index multiply happens at runtime.
fn array_element_addr(
    pointer_size: u32,
    elem_size: u32,
    pointer_type: &ValType,
    ptr_local: LocalId,
    index_local: LocalId,
) -> Expr {
    let header = layout::array_element_offset(pointer_size, elem_size, 0);
    add_i32(
        local_get(ptr_local, pointer_type.clone()),
        add_i32(
            const_i32(header as i32),
            mul_i32(local_get(index_local, pointer_type.clone()), const_i32(elem_size as i32)),
        ),
    )
}

#[allow(clippy::too_many_arguments)]
fn emit_array_new(
    module: &mut Module,
    type_name: &str,
    pointer_size: u32,
    elem_size: u32,
    pointer_type: &ValType,
    elem_ty: &ValType,
    malloc: FuncId,
    array_set: FuncId,
    with_default: bool,
) -> FuncId {
    let mut params = Vec::new();
    let init_param = if !with_default {
        params.push(elem_ty.clone());
        Some(LocalId::new(0))
    } else {
        None
    };
    let size_param = LocalId::new(params.len());
    params.push(pointer_type.clone());
    let rtt_param = LocalId::new(params.len());
    params.push(pointer_type.clone());

    let alloc_local = LocalId::new(params.len());
    let counter_local = LocalId::new(params.len() + 1);

    let header_size = layout::array_element_offset(pointer_size, elem_size, 0);
    let alloc_size = add_i32(
        const_i32(header_size as i32),
        mul_i32(local_get(size_param, pointer_type.clone()), const_i32(elem_size as i32)),
    );

    let init_value = if with_default {
        zero_of(elem_ty)
    } else {
        local_get(init_param.unwrap(), elem_ty.clone())
    };

    // A `Block(exit, [Loop(loop, body)])`: breaking to `exit` leaves the
    // block (ending the loop), breaking to `loop` re-enters its top (the
    // usual continue idiom). Giving the exit branch the block's own label,
    // distinct from the loop's label, runs the body exactly `size` times
    // for every `size >= 0`; reusing one label for both branches would
    // instead spin forever whenever `size` starts at 0.
    let loop_label = "array_new_loop";
    let exit_label = "array_new_exit";
    let loop_body = vec![
        br_if(exit_label, eqz_i32(local_get(counter_local, pointer_type.clone()))),
        local_set(counter_local, sub_i32(local_get(counter_local, pointer_type.clone()), const_i32(1))),
        call(
            array_set,
            vec![local_get(alloc_local, pointer_type.clone()), local_get(counter_local, pointer_type.clone()), init_value],
            ValType::none(),
        ),
        br(loop_label),
    ];

    let body_list = vec![
        local_set(alloc_local, call(malloc, vec![alloc_size], pointer_type.clone())),
        store(0, local_get(alloc_local, pointer_type.clone()), local_get(rtt_param, pointer_type.clone())),
        store(
            layout::array_length_offset(pointer_size),
            local_get(alloc_local, pointer_type.clone()),
            local_get(size_param, pointer_type.clone()),
        ),
        local_set(counter_local, local_get(size_param, pointer_type.clone())),
        block(exit_label, vec![loop_(loop_label, loop_body, ValType::none())], ValType::none()),
        local_get(alloc_local, pointer_type.clone()),
    ];

    module.functions.push(Function {
        name: names::array_new(type_name, with_default),
        sig: FuncSig { params, results: vec![pointer_type.clone()] },
        locals: vec![pointer_type.clone(), pointer_type.clone()],
        body: Some(block("array_new_body", body_list, pointer_type.clone())),
        direct_callees: vec![malloc, array_set],
        has_unanalyzable_call: false,
    })
}
