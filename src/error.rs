//! Error taxonomy for pass failures.
//!
//! Every pass aborts wholesale on a precondition violation rather than
//! publishing a partially rewritten module. Mirrors `cranelift-wasm`'s own
//! `WasmError`/`WasmResult` shape, expressed with `thiserror` to match the
//! modern wasmtime workspace's dependency table.
use thiserror::Error;

use crate::ir::HeapTypeId;

#[derive(Debug, Error)]
pub enum LowerError {
    #[error("lower-gc requires a 32-bit memory, but the module's memory is 64-bit")]
    UnsupportedMemory,

    #[error("lower-gc requires every heap type to carry a canonical name; heap type {0:?} has none (did `name-types` run?)")]
    MissingTypeName(HeapTypeId),

    #[error("function {0:?} ended with a nonzero try/catch structural counter; the body is malformed")]
    StructuralAnalyzerResidue(crate::ir::FuncId),

    #[error("encountered an expression shape with no rewrite rule and a non-lowerable type: {0}")]
    UnknownExpressionShape(String),

    #[error("lower-gc requires a module memory to exist")]
    MissingMemory,
}

pub type LowerResult<T> = Result<T, LowerError>;
