//! Compile-time constant evaluation.
//!
//! Used wherever the language demands a constant: array dimensions, `const`
//! initializers, global initializers, and constant subscripts. Arithmetic is
//! 32-bit wrapping, matching what the emitted code computes at runtime.

use crate::common::error::{CompileError, CompileResult};
use crate::frontend::parser::ast::{BinaryOp, Exp, UnaryOp};

use super::symbols::{Scopes, Storage, VarEntry};

/// Fold a unary operator applied to a known value.
pub fn fold_unary(op: UnaryOp, value: i32) -> i32 {
    match op {
        UnaryOp::Pos => value,
        UnaryOp::Neg => value.wrapping_neg(),
        UnaryOp::Not => (value == 0) as i32,
    }
}

/// Fold a binary operator over two known values. Returns `None` for division
/// or remainder by zero, which has no compile-time value.
pub fn fold_binary(op: BinaryOp, left: i32, right: i32) -> Option<i32> {
    let value = match op {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Sub => left.wrapping_sub(right),
        BinaryOp::Mul => left.wrapping_mul(right),
        BinaryOp::Div => {
            if right == 0 {
                return None;
            }
            left.wrapping_div(right)
        }
        BinaryOp::Mod => {
            if right == 0 {
                return None;
            }
            left.wrapping_rem(right)
        }
        BinaryOp::And => (left != 0 && right != 0) as i32,
        BinaryOp::Or => (left != 0 || right != 0) as i32,
        BinaryOp::Eq => (left == right) as i32,
        BinaryOp::Ne => (left != right) as i32,
        BinaryOp::Lt => (left < right) as i32,
        BinaryOp::Gt => (left > right) as i32,
        BinaryOp::Le => (left <= right) as i32,
        BinaryOp::Ge => (left >= right) as i32,
        BinaryOp::Assign => unreachable!("assignment is never constant-folded"),
    };
    Some(value)
}

/// Evaluate an expression that must have a compile-time value.
pub fn eval_exp(exp: &Exp, scopes: &Scopes) -> CompileResult<i32> {
    match exp {
        Exp::Integer(value) => Ok(*value),
        Exp::Call { .. } => {
            Err(CompileError::semantic("expression must have a constant value"))
        }
        Exp::Unary { op, child } => Ok(fold_unary(*op, eval_exp(child, scopes)?)),
        Exp::Binary { op, left, right } => {
            if *op == BinaryOp::Assign {
                return Err(CompileError::semantic("expression must have a constant value"));
            }
            let left = eval_exp(left, scopes)?;
            let right = eval_exp(right, scopes)?;
            fold_binary(*op, left, right)
                .ok_or_else(|| CompileError::semantic("division by zero in constant expression"))
        }
        Exp::Var { name, subscripts } => {
            let entry = scopes.find_var(name)?;
            if !entry.is_const() {
                return Err(CompileError::semantic("expression must have a constant value"));
            }
            let indices = subscripts
                .iter()
                .map(|subscript| eval_subscript(subscript, scopes))
                .collect::<CompileResult<Vec<u32>>>()?;
            read_const_var(entry, &indices)
        }
    }
}

/// Read one element of a `const` variable's folded content buffer. The index
/// must be full depth and in range for every dimension.
pub fn read_const_var(entry: &VarEntry, indices: &[u32]) -> CompileResult<i32> {
    let Storage::Const(content) = &entry.storage else {
        panic!("read_const_var on a runtime variable");
    };
    let dims = entry.size.dims();
    if indices.len() != dims.len() {
        return Err(CompileError::semantic("expression must have a value type"));
    }
    let mut stride = entry.size.len();
    let mut offset = 0u32;
    for (&index, &dim) in indices.iter().zip(dims) {
        if index >= dim {
            return Err(CompileError::semantic(
                "can not access position past the end of an array",
            ));
        }
        stride /= dim;
        offset += stride * index;
    }
    Ok(content[offset as usize])
}

/// Evaluate an array dimension: constant and strictly positive.
pub fn eval_dim(exp: &Exp, scopes: &Scopes) -> CompileResult<u32> {
    let value = eval_exp(exp, scopes)?;
    if value <= 0 {
        return Err(CompileError::semantic("array dimension must be positive"));
    }
    Ok(value as u32)
}

/// Evaluate a constant subscript: non-negative.
pub fn eval_subscript(exp: &Exp, scopes: &Scopes) -> CompileResult<u32> {
    let value = eval_exp(exp, scopes)?;
    if value < 0 {
        return Err(CompileError::semantic("array subscript must not be negative"));
    }
    Ok(value as u32)
}
