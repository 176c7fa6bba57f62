//! Densely numbered entity references into the module's tables.
//!
//! Mirrors the `cranelift-entity` convention: every kind of thing the IR
//! can refer to (a function, a heap type, a local, a global) gets its own
//! zero-sized newtype wrapping a `u32`, so the type system keeps us from
//! mixing up e.g. a `FuncId` and a `HeapTypeId`.

use cranelift_entity::entity_impl;

/// A defined or imported function.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(u32);
entity_impl!(FuncId, "func");

/// A struct or array heap type.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapTypeId(u32);
entity_impl!(HeapTypeId, "heap_type");

/// A module-level global.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(u32);
entity_impl!(GlobalId, "global");

/// A local variable (parameter or declared local) within one function.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(u32);
entity_impl!(LocalId, "local");
