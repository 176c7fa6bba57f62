//! Whole-module structure: functions, heap types, globals, one memory.

use crate::ir::entities::{FuncId, GlobalId, HeapTypeId};
use crate::ir::expr::Expr;
use crate::ir::types::{FuncSig, HeapType, ValType};
use cranelift_entity::{PrimaryMap, SecondaryMap};
use indexmap::IndexMap;

/// A 32- or 64-bit linear memory's index type. `lower-gc` requires a
/// 32-bit memory as a precondition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexType {
    I32,
    I64,
}

#[derive(Clone, Debug)]
pub struct Memory {
    pub index_type: IndexType,
    pub min_pages: u32,
    pub max_pages: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct Global {
    pub ty: ValType,
    pub mutable: bool,
    pub init: Expr,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub sig: FuncSig,
    /// Declared locals beyond the parameters, in index order after the
    /// parameters (so local index `i` for `i < params.len()` is a
    /// parameter, otherwise a declared local at `i - params.len()`).
    pub locals: Vec<ValType>,
    /// `None` for an imported function.
    pub body: Option<Expr>,
    /// Functions this one calls directly by a plain `call` (not
    /// `call_indirect`); used to build the static call graph for the
    /// function-effects pass.
    pub direct_callees: Vec<FuncId>,
    /// Set if the body contains a `call_indirect` or any other
    /// not-statically-resolvable call; the function-effects pass gives such
    /// functions the `anything` summary unconditionally.
    pub has_unanalyzable_call: bool,
}

impl Function {
    pub fn is_imported(&self) -> bool {
        self.body.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Module {
    pub functions: PrimaryMap<FuncId, Function>,
    pub heap_types: PrimaryMap<HeapTypeId, HeapType>,
    /// Heap types must carry canonical names before lowering (the
    /// `name-types` pass must have run).
    pub heap_type_names: SecondaryMap<HeapTypeId, Option<String>>,
    pub globals: PrimaryMap<GlobalId, Global>,
    pub memory: Option<Memory>,
    /// Module-level expression fragments: table initializers, global
    /// initializers, element segments. Keyed by a human-readable origin
    /// label purely for diagnostics.
    pub module_level_exprs: IndexMap<String, Expr>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    pub fn heap_type_name(&self, id: HeapTypeId) -> Option<&str> {
        self.heap_type_names[id].as_deref()
    }

    pub fn find_func_by_name(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }
}
