//! The body rewriter: turns every GC node in a function body into a call
//! to the matching synthesized helper, and lowers every remaining node's
//! type annotation.
//!
//! Operates against a frozen, owned snapshot of lowering info rather than
//! a live `&Module` borrow, so it has no aliasing conflicts with the
//! module being rewritten and can run one instance per function under
//! `rayon`: the lowering info is written once before rewriting starts and
//! is read-only for the rest of the pass, so no locking is required.

use std::collections::HashSet;

use crate::error::{LowerError, LowerResult};
use crate::ir::builder::{call_by_name, const_i32};
use crate::ir::{Expr, FuncSig, Function, HeapTypeId, Module, ValType};
use crate::lower_gc::helpers::HeapTypeShape;
use crate::lower_gc::names;
use crate::lower_gc::type_lower;
use indexmap::IndexMap;

pub struct BodyRewriter<'a> {
    pointer_type: ValType,
    shapes: &'a IndexMap<HeapTypeId, HeapTypeShape>,
}

impl<'a> BodyRewriter<'a> {
    pub fn new(pointer_type: ValType, shapes: &'a IndexMap<HeapTypeId, HeapTypeShape>) -> Self {
        BodyRewriter { pointer_type, shapes }
    }

    pub fn rewrite_function(&self, func: &mut Function) -> LowerResult<()> {
        self.lower_signature(&mut func.sig);
        for local in &mut func.locals {
            *local = type_lower::lower(local, &self.pointer_type);
        }
        if let Some(body) = &mut func.body {
            self.rewrite(body)?;
            uniquify_labels(body);
        }
        Ok(())
    }

    pub fn lower_signature(&self, sig: &mut FuncSig) {
        for p in &mut sig.params {
            *p = type_lower::lower(p, &self.pointer_type);
        }
        for r in &mut sig.results {
            *r = type_lower::lower(r, &self.pointer_type);
        }
    }

    /// Rewrite one module-level expression fragment (a table initializer,
    /// global initializer, or element segment; not function-local).
    pub fn rewrite_module_level(&self, expr: &mut Expr) -> LowerResult<()> {
        self.rewrite(expr)
    }

    fn shape(&self, id: HeapTypeId) -> LowerResult<&'a HeapTypeShape> {
        self.shapes.get(&id).ok_or(LowerError::MissingTypeName(id))
    }

    /// Post-order: recurse into children first, capturing whatever
    /// implicit heap type a GC node discloses through an operand's
    /// pre-rewrite type *before* that operand is recursed into. Fused into
    /// this single descent rather than a separate tree-wide scanning pass,
    /// since `StructNew`/`ArrayNew` already carry `heap_type` explicitly,
    /// and a `Get`/`Set` node's own `reference` operand is the only place
    /// its heap type is disclosed.
    fn rewrite(&self, expr: &mut Expr) -> LowerResult<()> {
        let hint = implicit_heap_type(expr);

        let mut err = None;
        expr.for_each_child_mut(|child| {
            if err.is_none() {
                if let Err(e) = self.rewrite(child) {
                    err = Some(e);
                }
            }
        });
        if let Some(e) = err {
            return Err(e);
        }

        let owned = std::mem::replace(expr, Expr::Nop);
        *expr = self.rewrite_self(owned, hint)?;
        Ok(())
    }

    fn rewrite_self(&self, expr: Expr, hint: Option<HeapTypeId>) -> LowerResult<Expr> {
        use Expr::*;
        Ok(match expr {
            // ref.null and rtt.canon lower identically: a zero literal of
            // the pointer type. Kept as two match arms sharing one
            // zero-literal helper rather than inlined away into one
            // variant, since the two node kinds stay semantically distinct.
            RefNull { .. } => zero_pointer_literal(),
            RttCanon { .. } => zero_pointer_literal(),

            StructNew { heap_type, operands, rtt, with_default, .. } => {
                let shape = self.shape(heap_type)?;
                let name = names::struct_new(&shape.name, with_default);
                let mut args = operands;
                args.push(*rtt);
                call_by_name(name, args, self.pointer_type.clone())
            }
            StructGet { field, reference, .. } => {
                let id = hint.ok_or_else(|| missing_hint("StructGet"))?;
                let shape = self.shape(id)?;
                let result_ty = shape.struct_field(field)?;
                call_by_name(names::struct_get(&shape.name, field), vec![*reference], result_ty)
            }
            StructSet { field, reference, value } => {
                let id = hint.ok_or_else(|| missing_hint("StructSet"))?;
                let shape = self.shape(id)?;
                call_by_name(names::struct_set(&shape.name, field), vec![*reference, *value], ValType::none())
            }

            ArrayNew { heap_type, init, size, rtt, with_default, .. } => {
                let shape = self.shape(heap_type)?;
                let name = names::array_new(&shape.name, with_default);
                let mut args = Vec::new();
                if let Some(i) = init {
                    args.push(*i);
                }
                args.push(*size);
                args.push(*rtt);
                call_by_name(name, args, self.pointer_type.clone())
            }
            ArrayGet { reference, index, .. } => {
                let id = hint.ok_or_else(|| missing_hint("ArrayGet"))?;
                let shape = self.shape(id)?;
                let result_ty = shape.array_element()?;
                call_by_name(names::array_get(&shape.name), vec![*reference, *index], result_ty)
            }
            ArraySet { reference, index, value } => {
                let id = hint.ok_or_else(|| missing_hint("ArraySet"))?;
                let shape = self.shape(id)?;
                call_by_name(names::array_set(&shape.name), vec![*reference, *index, *value], ValType::none())
            }

            other => lower_own_type(other, &self.pointer_type),
        })
    }
}

fn missing_hint(op: &str) -> LowerError {
    LowerError::UnknownExpressionShape(format!("{op} with a non-reference-typed operand"))
}

fn zero_pointer_literal() -> Expr {
    const_i32(0)
}

fn implicit_heap_type(expr: &Expr) -> Option<HeapTypeId> {
    match expr {
        Expr::StructNew { heap_type, .. } | Expr::ArrayNew { heap_type, .. } => Some(*heap_type),
        Expr::StructGet { reference, .. }
        | Expr::StructSet { reference, .. }
        | Expr::ArrayGet { reference, .. }
        | Expr::ArraySet { reference, .. } => match reference.ty() {
            ValType::Ref(id) => Some(id),
            _ => None,
        },
        _ => None,
    }
}

/// Universal type-lowering step: every remaining node's own type
/// annotation is replaced by its lowered form.
fn lower_own_type(mut expr: Expr, pointer_type: &ValType) -> Expr {
    use Expr::*;
    match &mut expr {
        Const { ty, .. }
        | LocalGet { ty, .. }
        | LocalTee { ty, .. }
        | GlobalGet { ty, .. }
        | Load { ty, .. }
        | Unary { ty, .. }
        | Binary { ty, .. }
        | Call { ty, .. }
        | CallByName { ty, .. }
        | CallIndirect { ty, .. }
        | Block { ty, .. }
        | Loop { ty, .. }
        | If { ty, .. }
        | Select { ty, .. } => {
            *ty = type_lower::lower(ty, pointer_type);
        }
        LocalSet { .. } | GlobalSet { .. } | Store { .. } | Br { .. } | BrIf { .. } | Return { .. } | Drop { .. }
        | Unreachable | Nop => {}
        RefNull { .. } | RttCanon { .. } | StructNew { .. } | StructGet { .. } | StructSet { .. } | ArrayNew { .. }
        | ArrayGet { .. } | ArraySet { .. } => {
            unreachable!("GC nodes are replaced by rewrite_self before reaching the universal branch")
        }
    }
    expr
}

/// Unique-name the `Block`/`Loop` labels within one body, so that distinct
/// expansions never collide on a shared label. In this crate
/// `ArrayNew`/`ArrayGet`/etc. are replaced by a `Call` to a helper; the
/// loop itself lives only inside that helper's own, separately scoped
/// function body (`lower_gc::helpers`), so within any one rewritten body
/// this is a no-op safety net rather than a load-bearing step. Kept
/// because the no-collision guarantee should hold unconditionally.
pub fn uniquify_labels(expr: &mut Expr) {
    let mut seen = HashSet::new();
    uniquify_into(expr, &mut seen);
}

fn uniquify_into(expr: &mut Expr, seen: &mut HashSet<String>) {
    if let Expr::Block { label, .. } | Expr::Loop { label, .. } = expr {
        if !seen.insert(label.clone()) {
            let mut n = 1;
            loop {
                let candidate = format!("{label}${n}");
                if seen.insert(candidate.clone()) {
                    *label = candidate;
                    break;
                }
                n += 1;
            }
        }
    }
    expr.for_each_child_mut(|child| uniquify_into(child, seen));
}

/// Resolve every `CallByName` left behind by rewriting into a real `Call`
/// once all helpers exist in the module by name. Name resolution is
/// deferred to this single-threaded sweep so the parallel per-function
/// rewrite in `rewrite_function` never needs a live module borrow.
pub fn resolve_call_by_name(module: &mut Module) -> LowerResult<()> {
    let func_ids: Vec<crate::ir::FuncId> = module.functions.keys().collect();
    for id in func_ids {
        let mut body = module.functions[id].body.take();
        if let Some(b) = &mut body {
            resolve_into(b, module)?;
        }
        module.functions[id].body = body;
    }

    let module_level_keys: Vec<String> = module.module_level_exprs.keys().cloned().collect();
    for key in module_level_keys {
        let mut expr = module.module_level_exprs.swap_remove(&key).expect("key just read from this map");
        resolve_into(&mut expr, module)?;
        module.module_level_exprs.insert(key, expr);
    }

    let global_ids: Vec<crate::ir::GlobalId> = module.globals.keys().collect();
    for id in global_ids {
        let mut init = std::mem::replace(&mut module.globals[id].init, Expr::Nop);
        resolve_into(&mut init, module)?;
        module.globals[id].init = init;
    }
    Ok(())
}

fn resolve_into(expr: &mut Expr, module: &Module) -> LowerResult<()> {
    let mut err = None;
    expr.for_each_child_mut(|child| {
        if err.is_none() {
            if let Err(e) = resolve_into(child, module) {
                err = Some(e);
            }
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    if let Expr::CallByName { name, args, ty } = expr {
        let func = module
            .find_func_by_name(name)
            .ok_or_else(|| LowerError::UnknownExpressionShape(format!("unresolved helper call: {name}")))?;
        *expr = Expr::Call { func, args: std::mem::take(args), ty: ty.clone() };
    }
    Ok(())
}
