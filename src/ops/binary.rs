//! Binary arithmetic operations on arrays.

use crate::trace::{Primitive, ShapedArray};
use crate::{Array, DType, JitError, Result, Shape};

/// Broadcast two operand shapes, naming the primitive on failure.
///
/// Dimensions are aligned from the right; a missing or size-1 dimension
/// stretches to the other side, so `(0,)` with `(1,)` gives `(0,)`.
pub(crate) fn broadcast_shapes(op: &Primitive, lhs: &Shape, rhs: &Shape) -> Result<Shape> {
    let (l, r) = (lhs.as_slice(), rhs.as_slice());
    let ndim = l.len().max(r.len());
    let dim_at = |dims: &[usize], i: usize| {
        (i + dims.len()).checked_sub(ndim).map_or(1, |j| dims[j])
    };

    let mut dims = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let dim = match (dim_at(l, i), dim_at(r, i)) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(JitError::IncompatibleShapes {
                    op: op.name().to_string(),
                    lhs: lhs.clone(),
                    rhs: rhs.clone(),
                })
            }
        };
        dims.push(dim);
    }
    Ok(Shape::new(dims))
}

/// Abstract evaluation: output shape and dtype of a binary arithmetic primitive.
pub(crate) fn binary_aval(
    op: &Primitive,
    lhs: &ShapedArray,
    rhs: &ShapedArray,
) -> Result<ShapedArray> {
    let shape = broadcast_shapes(op, lhs.shape(), rhs.shape())?;
    let promoted = DType::promote(lhs.dtype(), rhs.dtype());
    let dtype = match op {
        // true division, as in NumPy
        Primitive::Div => DType::Float32,
        Primitive::Add | Primitive::Sub | Primitive::Mul | Primitive::Pow
            if promoted == DType::Bool =>
        {
            DType::Int32
        }
        _ => promoted,
    };
    Ok(ShapedArray::new(shape, dtype))
}

/// Apply a binary arithmetic primitive to concrete arrays.
pub(crate) fn apply(op: &Primitive, lhs: &Array, rhs: &Array) -> Result<Array> {
    let aval = binary_aval(op, &lhs.aval(), &rhs.aval())?;
    let f: fn(f32, f32) -> f32 = match op {
        Primitive::Add => |a, b| a + b,
        Primitive::Sub => |a, b| a - b,
        Primitive::Mul => |a, b| a * b,
        Primitive::Div => |a, b| a / b,
        Primitive::Pow => f32::powf,
        Primitive::Min => f32::min,
        Primitive::Max => f32::max,
        _ => unreachable!("{} is not a binary primitive", op.name()),
    };
    let dtype = aval.dtype();
    let data = broadcast_binary(lhs, rhs, aval.shape(), |a, b| dtype.cast_from_f32(f(a, b)));
    Ok(Array::from_parts(data, aval.shape().clone(), dtype))
}

/// Evaluate `f` over the broadcast of `lhs` and `rhs` into `result_shape`.
pub(crate) fn broadcast_binary<F>(
    lhs: &Array,
    rhs: &Array,
    result_shape: &Shape,
    f: F,
) -> Vec<f32>
where
    F: Fn(f32, f32) -> f32,
{
    let lhs_data = lhs.as_slice();
    let rhs_data = rhs.as_slice();

    if lhs.shape() == rhs.shape() {
        return lhs_data.iter().zip(rhs_data.iter()).map(|(&a, &b)| f(a, b)).collect();
    }

    (0..result_shape.size())
        .map(|i| {
            let lhs_idx = broadcast_index(i, result_shape, lhs.shape());
            let rhs_idx = broadcast_index(i, result_shape, rhs.shape());
            f(lhs_data[lhs_idx], rhs_data[rhs_idx])
        })
        .collect()
}

/// Convert a flat index in the result array to an index in the source array,
/// accounting for broadcasting.
pub(crate) fn broadcast_index(
    flat_idx: usize,
    result_shape: &Shape,
    src_shape: &Shape,
) -> usize {
    let result_dims = result_shape.as_slice();
    let src_dims = src_shape.as_slice();

    let mut multi_idx = Vec::with_capacity(result_dims.len());
    let mut idx = flat_idx;
    for &dim in result_dims.iter().rev() {
        multi_idx.push(idx % dim);
        idx /= dim;
    }
    multi_idx.reverse();

    let offset = result_dims.len() - src_dims.len();
    let mut src_idx = 0;
    let mut stride = 1;

    for i in (0..src_dims.len()).rev() {
        let result_i = offset + i;
        let dim_idx = if src_dims[i] == 1 { 0 } else { multi_idx[result_i] };
        src_idx += dim_idx * stride;
        stride *= src_dims[i];
    }

    src_idx
}
