//! Comparison operations on arrays. All comparisons produce `Bool` arrays.

use crate::ops::binary::{broadcast_binary, broadcast_shapes};
use crate::trace::{Primitive, ShapedArray};
use crate::{Array, DType, Result};

/// Abstract evaluation of a comparison primitive.
pub(crate) fn compare_aval(
    op: &Primitive,
    lhs: &ShapedArray,
    rhs: &ShapedArray,
) -> Result<ShapedArray> {
    let shape = broadcast_shapes(op, lhs.shape(), rhs.shape())?;
    Ok(ShapedArray::new(shape, DType::Bool))
}

/// Apply a comparison primitive to concrete arrays.
pub(crate) fn apply(op: &Primitive, lhs: &Array, rhs: &Array) -> Result<Array> {
    let aval = compare_aval(op, &lhs.aval(), &rhs.aval())?;
    let f: fn(f32, f32) -> bool = match op {
        Primitive::Lt => |a, b| a < b,
        Primitive::Le => |a, b| a <= b,
        Primitive::Gt => |a, b| a > b,
        Primitive::Ge => |a, b| a >= b,
        Primitive::Eq => |a, b| a == b,
        Primitive::Ne => |a, b| a != b,
        _ => unreachable!("{} is not a comparison primitive", op.name()),
    };
    let data = broadcast_binary(lhs, rhs, aval.shape(), |a, b| if f(a, b) { 1.0 } else { 0.0 });
    Ok(Array::from_parts(data, aval.shape().clone(), DType::Bool))
}
