//! Small expression-construction helpers for assembling synthesized
//! function bodies. Nothing here consults the module; it just builds
//! `Expr` trees.

use crate::ir::entities::{FuncId, LocalId};
use crate::ir::expr::{Expr, Literal};
use crate::ir::types::{NumType, ValType};

pub fn const_i32(v: i32) -> Expr {
    Expr::Const { value: Literal::I32(v), ty: ValType::i32() }
}

pub fn zero_of(ty: &ValType) -> Expr {
    match ty {
        ValType::Num(NumType::I64) => Expr::Const { value: Literal::I64(0), ty: ty.clone() },
        ValType::Num(NumType::F32) => Expr::Const { value: Literal::F32(0.0), ty: ty.clone() },
        ValType::Num(NumType::F64) => Expr::Const { value: Literal::F64(0.0), ty: ty.clone() },
        _ => Expr::Const { value: Literal::I32(0), ty: ValType::i32() },
    }
}

pub fn local_get(local: LocalId, ty: ValType) -> Expr {
    Expr::LocalGet { local, ty }
}

pub fn local_set(local: LocalId, value: Expr) -> Expr {
    Expr::LocalSet { local, value: Box::new(value) }
}

pub fn load(ty: ValType, offset: u32, addr: Expr) -> Expr {
    Expr::Load { offset, addr: Box::new(addr), ty }
}

pub fn store(offset: u32, addr: Expr, value: Expr) -> Expr {
    Expr::Store { offset, addr: Box::new(addr), value: Box::new(value) }
}

pub fn call(func: FuncId, args: Vec<Expr>, ty: ValType) -> Expr {
    Expr::Call { func, args, ty }
}

pub fn call_by_name(name: impl Into<String>, args: Vec<Expr>, ty: ValType) -> Expr {
    Expr::CallByName { name: name.into(), args, ty }
}

pub fn add_i32(lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op: crate::ir::expr::BinaryOp::Add,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        ty: ValType::i32(),
    }
}

pub fn sub_i32(lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op: crate::ir::expr::BinaryOp::Sub,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        ty: ValType::i32(),
    }
}

pub fn mul_i32(lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op: crate::ir::expr::BinaryOp::Mul,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        ty: ValType::i32(),
    }
}

pub fn eqz_i32(operand: Expr) -> Expr {
    Expr::Unary { op: crate::ir::expr::UnaryOp::EqZ, operand: Box::new(operand), ty: ValType::i32() }
}

pub fn block(label: impl Into<String>, body: Vec<Expr>, ty: ValType) -> Expr {
    Expr::Block { label: label.into(), body, ty }
}

pub fn loop_(label: impl Into<String>, body: Vec<Expr>, ty: ValType) -> Expr {
    Expr::Loop { label: label.into(), body, ty }
}

pub fn br(label: impl Into<String>) -> Expr {
    Expr::Br { label: label.into(), value: None }
}

pub fn br_if(label: impl Into<String>, cond: Expr) -> Expr {
    Expr::BrIf { label: label.into(), cond: Box::new(cond), value: None }
}
