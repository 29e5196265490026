//! CPU reference kernels for the traced primitives.
//!
//! Every primitive has an abstract evaluation rule (`*_aval`) used while
//! tracing, and a concrete kernel used for eager values and by the
//! interpreter. Both share the same shape/dtype rule.

pub(crate) mod binary;
pub(crate) mod comparison;
pub(crate) mod control;
pub(crate) mod reduce;
pub(crate) mod unary;

use crate::trace::{Primitive, ShapedArray};
use crate::{Array, Result};

/// Shape/dtype of the result of applying `op` to operands with `avals`.
pub(crate) fn abstract_eval(op: &Primitive, avals: &[&ShapedArray]) -> Result<ShapedArray> {
    match (op.arity(), avals) {
        (1, [x]) if op.is_reduction() => reduce::reduce_aval(op, x),
        (1, [x]) => unary::unary_aval(op, x),
        (2, [l, r]) if op.is_comparison() => comparison::compare_aval(op, l, r),
        (2, [l, r]) => binary::binary_aval(op, l, r),
        (3, [p, t, f]) => control::select_aval(p, t, f),
        _ => unreachable!("{} applied to {} operands", op.name(), avals.len()),
    }
}

/// Evaluate `op` on concrete operands.
pub(crate) fn evaluate(op: &Primitive, args: &[&Array]) -> Result<Array> {
    match (op.arity(), args) {
        (1, [x]) if op.is_reduction() => reduce::apply(op, x),
        (1, [x]) => unary::apply(op, x),
        (2, [l, r]) if op.is_comparison() => comparison::apply(op, l, r),
        (2, [l, r]) => binary::apply(op, l, r),
        (3, [p, t, f]) => control::select(p, t, f),
        _ => unreachable!("{} applied to {} operands", op.name(), args.len()),
    }
}
