//! Flattening of nested/elided brace initializers.
//!
//! A target shape plus an initializer tree become a sparse list of
//! (flat offset, expression) pairs with strictly increasing offsets; gaps are
//! implicitly zero. Brace elision follows C: a bare element at a sub-array
//! position makes the remaining flat siblings fill that sub-array block.

use crate::common::error::{CompileError, CompileResult};
use crate::frontend::parser::ast::{Exp, Initializer};

use super::const_eval;
use super::symbols::{ArraySize, Scopes};

/// Flatten an array initializer, keeping the value expressions unfolded.
/// This is the deferred mode used for non-const local arrays, whose values
/// may be dynamic.
pub fn flatten<'a>(
    size: &ArraySize,
    init: &'a Initializer,
) -> CompileResult<Vec<(u32, &'a Exp)>> {
    assert!(size.is_array(), "scalar initializers use flatten_scalar");
    let Initializer::List(list) = init else {
        return Err(CompileError::semantic("initialization with {...} expected for array"));
    };
    let mut pairs = Vec::new();
    let mut cursor = 0;
    fill_region(list, &mut cursor, size.dims(), 0, &mut pairs)?;
    if cursor < list.len() {
        return Err(CompileError::semantic("too many initializer values"));
    }
    Ok(pairs)
}

/// Flatten and fold every value to an integer immediately. This is the eager
/// mode required for `const` and global declarations.
pub fn flatten_eager(
    size: &ArraySize,
    init: &Initializer,
    scopes: &Scopes,
) -> CompileResult<Vec<(u32, i32)>> {
    flatten(size, init)?
        .into_iter()
        .map(|(offset, exp)| Ok((offset, const_eval::eval_exp(exp, scopes)?)))
        .collect()
}

/// Unwrap a scalar initializer down to its bare expression, tolerating a
/// chain of single-element braces (`int x = {{1}};`). An empty brace list
/// leaves the value unset (zero).
pub fn flatten_scalar(init: &Initializer) -> CompileResult<Option<&Exp>> {
    let mut current = init;
    loop {
        match current {
            Initializer::Exp(exp) => return Ok(Some(exp)),
            Initializer::List(list) => match list.len() {
                0 => return Ok(None),
                1 => current = &list[0],
                _ => return Err(CompileError::semantic("too many initializer values")),
            },
        }
    }
}

/// Fill one sub-array region of shape `dims` starting at `base`, consuming
/// elements of `list` from `cursor`.
///
/// At a sub-array position a bare element recurses into the *same* list with
/// the shared cursor (brace elision), while an explicit `{...}` recurses into
/// the child list with a fresh cursor and must consume it completely.
fn fill_region<'a>(
    list: &'a [Initializer],
    cursor: &mut usize,
    dims: &[u32],
    base: u32,
    pairs: &mut Vec<(u32, &'a Exp)>,
) -> CompileResult<()> {
    let Some((&dim, rest)) = dims.split_first() else {
        // Innermost (scalar) position: one element fills one slot. An empty
        // explicit child arrives here with nothing to consume and leaves the
        // slot zero.
        let Some(element) = list.get(*cursor) else {
            return Ok(());
        };
        match element {
            Initializer::Exp(exp) => pairs.push((base, exp)),
            Initializer::List(_) => {
                if let Some(exp) = flatten_scalar(element)? {
                    pairs.push((base, exp));
                }
            }
        }
        *cursor += 1;
        return Ok(());
    };

    let stride: u32 = rest.iter().product();
    for block in 0..dim {
        if *cursor >= list.len() {
            break;
        }
        let block_base = base + block * stride;
        match &list[*cursor] {
            Initializer::Exp(_) => {
                // Brace elision: the flat siblings fill this block.
                fill_region(list, cursor, rest, block_base, pairs)?;
            }
            Initializer::List(child) => {
                *cursor += 1;
                let mut child_cursor = 0;
                fill_region(child, &mut child_cursor, rest, block_base, pairs)?;
                if child_cursor < child.len() {
                    return Err(CompileError::semantic("too many initializer values"));
                }
            }
        }
    }
    Ok(())
}
