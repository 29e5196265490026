//! Branch-free control flow.
//!
//! `select` evaluates both branches and picks element-wise by a predicate,
//! which is how value-dependent choices are expressed under tracing.

use crate::ops::binary::{broadcast_index, broadcast_shapes};
use crate::trace::{Primitive, ShapedArray};
use crate::{Array, DType, Result};

/// Abstract evaluation of `select(pred, on_true, on_false)`.
pub(crate) fn select_aval(
    pred: &ShapedArray,
    on_true: &ShapedArray,
    on_false: &ShapedArray,
) -> Result<ShapedArray> {
    let op = Primitive::Select;
    let branches = broadcast_shapes(&op, on_true.shape(), on_false.shape())?;
    let shape = broadcast_shapes(&op, pred.shape(), &branches)?;
    Ok(ShapedArray::new(shape, DType::promote(on_true.dtype(), on_false.dtype())))
}

/// Element-wise `pred ? on_true : on_false` with broadcasting.
pub(crate) fn select(pred: &Array, on_true: &Array, on_false: &Array) -> Result<Array> {
    let aval = select_aval(&pred.aval(), &on_true.aval(), &on_false.aval())?;
    let shape = aval.shape();
    let dtype = aval.dtype();
    let (p, t, f) = (pred.as_slice(), on_true.as_slice(), on_false.as_slice());

    let data = (0..shape.size())
        .map(|i| {
            let chosen = if p[broadcast_index(i, shape, pred.shape())] != 0.0 {
                t[broadcast_index(i, shape, on_true.shape())]
            } else {
                f[broadcast_index(i, shape, on_false.shape())]
            };
            dtype.cast_from_f32(chosen)
        })
        .collect();

    Ok(Array::from_parts(data, shape.clone(), dtype))
}
