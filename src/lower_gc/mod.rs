//! The whole-module GC Lowering pass: invokes `name-types` and `dce` as
//! preconditions, installs a linear memory and `malloc`, computes struct
//! layouts, emits helper functions, then rewrites every existing function
//! body (in parallel across functions) and every module-level initializer.

pub mod helpers;
pub mod layout;
pub mod names;
pub mod rewrite;
pub mod runtime;
pub mod type_lower;

use rayon::prelude::*;

use crate::ir::{FuncId, FuncSig, Function, Module, ValType};
use crate::pass::{Pass, PassRunner};
use rewrite::BodyRewriter;

/// The pointer type this pass always lowers to. A 32-bit memory is
/// required, so the pointer type is fixed at 32 bits accordingly (not
/// derived from the memory's index type, which `runtime::synthesize`
/// validates is 32-bit or rejects outright).
fn pointer_type() -> ValType {
    ValType::i32()
}

const POINTER_SIZE: u32 = 4;

pub struct LowerGc;

impl Pass for LowerGc {
    fn name(&self) -> &'static str {
        "lower-gc"
    }

    fn is_function_parallel(&self) -> bool {
        true
    }

    fn run(&self, module: &mut Module, runner: &mut PassRunner) -> anyhow::Result<()> {
        // Preconditions: every heap type must carry a canonical name, and
        // dead heap types should already be gone.
        let mut sub = runner.sub_runner();
        sub.run_named(module, "name-types")?;
        sub.run_named(module, "dce")?;

        // Snapshot which functions existed before the runtime and helpers
        // get injected; only these get body-rewritten.
        let existing_func_ids: Vec<FuncId> = module.functions.keys().collect();

        let pointer_ty = pointer_type();
        tracing::debug!("lower-gc: synthesizing runtime (memory, nextMalloc, malloc)");
        let rt = runtime::synthesize(module, pointer_ty.clone())?;

        tracing::debug!("lower-gc: computing layouts and emitting helpers");
        let (_layouts, shapes) = helpers::emit_helpers(module, &pointer_ty, POINTER_SIZE, &rt)?;

        let rewriter = BodyRewriter::new(pointer_ty.clone(), &shapes);

        tracing::debug!(count = existing_func_ids.len(), "lower-gc: rewriting function bodies in parallel");
        let mut extracted: Vec<(FuncId, Function)> = existing_func_ids
            .iter()
            .map(|&id| (id, std::mem::replace(&mut module.functions[id], placeholder_function())))
            .collect();

        extracted.par_iter_mut().try_for_each(|(_, f)| rewriter.rewrite_function(f))?;

        for (id, f) in extracted {
            module.functions[id] = f;
        }

        tracing::debug!("lower-gc: rewriting module-level initializers");
        let global_ids: Vec<crate::ir::GlobalId> = module.globals.keys().collect();
        for id in global_ids {
            let mut init = std::mem::replace(&mut module.globals[id].init, crate::ir::Expr::Nop);
            rewriter.rewrite_module_level(&mut init)?;
            module.globals[id].init = init;
        }
        let module_level_keys: Vec<String> = module.module_level_exprs.keys().cloned().collect();
        for key in module_level_keys {
            let mut expr = module
                .module_level_exprs
                .swap_remove(&key)
                .expect("key just read from this map");
            rewriter.rewrite_module_level(&mut expr)?;
            module.module_level_exprs.insert(key, expr);
        }

        rewrite::resolve_call_by_name(module)?;

        Ok(())
    }
}

fn placeholder_function() -> Function {
    Function {
        name: String::new(),
        sig: FuncSig::default(),
        locals: vec![],
        body: None,
        direct_callees: vec![],
        has_unanalyzable_call: false,
    }
}
