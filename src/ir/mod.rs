//! The in-memory IR that the passes in this crate operate on.
//!
//! Intentionally small: just the node shapes the lowering and
//! effects-summary passes need, built on `cranelift-entity`-indexed tables
//! and a straightforward expression tree.

pub mod builder;
pub mod entities;
pub mod expr;
pub mod module;
pub mod types;

pub use entities::{FuncId, GlobalId, HeapTypeId, LocalId};
pub use expr::{BinaryOp, Expr, Literal, UnaryOp};
pub use module::{Function, Global, IndexType, Memory, Module};
pub use types::{FieldType, FuncSig, HeapType, NumType, ValType};
