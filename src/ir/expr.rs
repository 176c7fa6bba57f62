//! Expression nodes.
//!
//! Every node carries its own result type, so a rewrite that changes a
//! child's type can patch the parent's `ty` field directly rather than
//! re-inferring it. `ValType::none()` marks statement-shaped nodes that
//! have no result.

use crate::ir::entities::{FuncId, GlobalId, HeapTypeId, LocalId};
use crate::ir::types::ValType;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Literal {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    EqZ,
    Clz,
    Ctz,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
}

/// One node of a function (or module-level initializer) body.
#[derive(Clone, Debug)]
pub enum Expr {
    Const { value: Literal, ty: ValType },
    LocalGet { local: LocalId, ty: ValType },
    LocalSet { local: LocalId, value: Box<Expr> },
    LocalTee { local: LocalId, value: Box<Expr>, ty: ValType },
    GlobalGet { global: GlobalId, ty: ValType },
    GlobalSet { global: GlobalId, value: Box<Expr> },
    Load { offset: u32, addr: Box<Expr>, ty: ValType },
    Store { offset: u32, addr: Box<Expr>, value: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr>, ty: ValType },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, ty: ValType },
    Call { func: FuncId, args: Vec<Expr>, ty: ValType },
    /// A call to an as-yet-unresolved helper, addressed by name. Used only
    /// transiently: `lower_gc::rewrite` emits these and a final resolution
    /// step turns them into `Call` once helper `FuncId`s are known.
    CallByName { name: String, args: Vec<Expr>, ty: ValType },
    CallIndirect { sig: crate::ir::types::FuncSig, target: Box<Expr>, args: Vec<Expr>, ty: ValType },
    Block { label: String, body: Vec<Expr>, ty: ValType },
    Loop { label: String, body: Vec<Expr>, ty: ValType },
    If { cond: Box<Expr>, then_branch: Vec<Expr>, else_branch: Option<Vec<Expr>>, ty: ValType },
    Br { label: String, value: Option<Box<Expr>> },
    BrIf { label: String, cond: Box<Expr>, value: Option<Box<Expr>> },
    Return { value: Option<Box<Expr>> },
    Drop { value: Box<Expr> },
    Select { cond: Box<Expr>, a: Box<Expr>, b: Box<Expr>, ty: ValType },
    Unreachable,
    Nop,

    // --- GC nodes (eliminated entirely by `lower_gc`) ---
    RefNull { ty: ValType },
    RttCanon { ty: ValType },
    StructNew {
        heap_type: HeapTypeId,
        operands: Vec<Expr>,
        rtt: Box<Expr>,
        with_default: bool,
        ty: ValType,
    },
    StructGet { field: u32, reference: Box<Expr>, ty: ValType },
    StructSet { field: u32, reference: Box<Expr>, value: Box<Expr> },
    ArrayNew {
        heap_type: HeapTypeId,
        init: Option<Box<Expr>>,
        size: Box<Expr>,
        rtt: Box<Expr>,
        with_default: bool,
        ty: ValType,
    },
    ArrayGet { reference: Box<Expr>, index: Box<Expr>, ty: ValType },
    ArraySet { reference: Box<Expr>, index: Box<Expr>, value: Box<Expr> },
}

impl Expr {
    /// The node's own result type. `ValType::none()` for statement-shaped
    /// nodes that have no result.
    pub fn ty(&self) -> ValType {
        use Expr::*;
        match self {
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
            | Select { ty, .. }
            | RefNull { ty, .. }
            | RttCanon { ty, .. }
            | StructNew { ty, .. }
            | StructGet { ty, .. }
            | ArrayNew { ty, .. }
            | ArrayGet { ty, .. } => ty.clone(),
            LocalSet { .. }
            | GlobalSet { .. }
            | Store { .. }
            | Br { .. }
            | BrIf { .. }
            | Return { .. }
            | Drop { .. }
            | Unreachable
            | Nop
            | StructSet { .. }
            | ArraySet { .. } => ValType::none(),
        }
    }

    /// In-place children visitor, used by post-order walkers (e.g.
    /// `lower_gc::rewrite`'s scanner and rewriter).
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut Expr)) {
        use Expr::*;
        match self {
            LocalSet { value, .. } | GlobalSet { value, .. } | Drop { value, .. } => f(value),
            LocalTee { value, .. } => f(value),
            Load { addr, .. } => f(addr),
            Store { addr, value, .. } => {
                f(addr);
                f(value);
            }
            Unary { operand, .. } => f(operand),
            Binary { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            Call { args, .. } | CallByName { args, .. } => {
                for a in args {
                    f(a);
                }
            }
            CallIndirect { target, args, .. } => {
                f(target);
                for a in args {
                    f(a);
                }
            }
            Block { body, .. } | Loop { body, .. } => {
                for e in body {
                    f(e);
                }
            }
            If { cond, then_branch, else_branch, .. } => {
                f(cond);
                for e in then_branch {
                    f(e);
                }
                if let Some(eb) = else_branch {
                    for e in eb {
                        f(e);
                    }
                }
            }
            Br { value, .. } | Return { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }
            BrIf { cond, value, .. } => {
                f(cond);
                if let Some(v) = value {
                    f(v);
                }
            }
            Select { cond, a, b, .. } => {
                f(cond);
                f(a);
                f(b);
            }
            StructNew { operands, rtt, .. } => {
                for o in operands {
                    f(o);
                }
                f(rtt);
            }
            StructGet { reference, .. } => f(reference),
            StructSet { reference, value, .. } => {
                f(reference);
                f(value);
            }
            ArrayNew { init, size, rtt, .. } => {
                if let Some(i) = init {
                    f(i);
                }
                f(size);
                f(rtt);
            }
            ArrayGet { reference, index, .. } => {
                f(reference);
                f(index);
            }
            ArraySet { reference, index, value, .. } => {
                f(reference);
                f(index);
                f(value);
            }
            Const { .. }
            | LocalGet { .. }
            | GlobalGet { .. }
            | Unreachable
            | Nop
            | RefNull { .. }
            | RttCanon { .. } => {}
        }
    }

    /// Read-only children, in evaluation order. Used by the effect
    /// analyzer, which only ever reads.
    pub fn children(&self) -> Vec<&Expr> {
        use Expr::*;
        match self {
            LocalSet { value, .. } | GlobalSet { value, .. } | Drop { value, .. } => vec![value],
            LocalTee { value, .. } => vec![value],
            Load { addr, .. } => vec![addr],
            Store { addr, value, .. } => vec![addr, value],
            Unary { operand, .. } => vec![operand],
            Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Call { args, .. } | CallByName { args, .. } => args.iter().collect(),
            CallIndirect { target, args, .. } => {
                let mut v = vec![target.as_ref()];
                v.extend(args.iter());
                v
            }
            Block { body, .. } | Loop { body, .. } => body.iter().collect(),
            If { cond, then_branch, else_branch, .. } => {
                let mut v = vec![cond.as_ref()];
                v.extend(then_branch.iter());
                if let Some(eb) = else_branch {
                    v.extend(eb.iter());
                }
                v
            }
            Br { value, .. } | Return { value } => value.iter().map(|b| b.as_ref()).collect(),
            BrIf { cond, value, .. } => {
                let mut v = vec![cond.as_ref()];
                v.extend(value.iter().map(|b| b.as_ref()));
                v
            }
            Select { cond, a, b, .. } => vec![cond, a, b],
            StructNew { operands, rtt, .. } => {
                let mut v: Vec<&Expr> = operands.iter().collect();
                v.push(rtt);
                v
            }
            StructGet { reference, .. } => vec![reference],
            StructSet { reference, value, .. } => vec![reference, value],
            ArrayNew { init, size, rtt, .. } => {
                let mut v = Vec::new();
                if let Some(i) = init {
                    v.push(i.as_ref());
                }
                v.push(size);
                v.push(rtt);
                v
            }
            ArrayGet { reference, index, .. } => vec![reference, index],
            ArraySet { reference, index, value, .. } => vec![reference, index, value],
            Const { .. }
            | LocalGet { .. }
            | GlobalGet { .. }
            | Unreachable
            | Nop
            | RefNull { .. }
            | RttCanon { .. } => vec![],
        }
    }
}
