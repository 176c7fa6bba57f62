//! `wasm-gc-lower`: a GC Lowering pass and a Function-Effects Summary pass
//! over an in-memory Wasm-with-managed-types IR.
//!
//! The GC Lowering pass (`lower_gc`) is the core: it eliminates reference,
//! RTT, struct, and array types from a module, replacing them with linear
//! memory layouts, a bump allocator, and synthesized helper functions. The
//! Function-Effects Summary pass (`func_effects`) is the secondary pass:
//! it computes a per-function side-effect summary over the static call
//! graph, shared with the GC lowering pass only through the call-graph
//! machinery in `callgraph`.

pub mod callgraph;
pub mod effect_analyzer;
pub mod error;
pub mod func_effects;
pub mod ir;
pub mod lower_gc;
pub mod pass;

pub use error::{LowerError, LowerResult};
pub use pass::{FeatureFlags, Pass, PassOptions, PassRunner};
