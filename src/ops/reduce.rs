//! Reduction operations on arrays.

use crate::trace::{Primitive, ShapedArray};
use crate::{Array, DType, JitError, Result, Shape};

/// Abstract evaluation of a reduction primitive.
pub(crate) fn reduce_aval(op: &Primitive, input: &ShapedArray) -> Result<ShapedArray> {
    let accumulate = |dtype: DType| if dtype == DType::Bool { DType::Int32 } else { dtype };
    match op {
        Primitive::SumAll => Ok(ShapedArray::new(Shape::scalar(), accumulate(input.dtype()))),
        Primitive::MeanAll => Ok(ShapedArray::new(Shape::scalar(), DType::Float32)),
        Primitive::MaxAll => Ok(ShapedArray::new(Shape::scalar(), input.dtype())),
        Primitive::Sum { axis } => {
            let ndim = input.shape().ndim();
            if *axis >= ndim {
                return Err(JitError::AxisOutOfBounds { axis: *axis, ndim });
            }
            Ok(ShapedArray::new(input.shape().without_axis(*axis), accumulate(input.dtype())))
        }
        _ => unreachable!("{} is not a reduction primitive", op.name()),
    }
}

/// Apply a reduction primitive to a concrete array.
pub(crate) fn apply(op: &Primitive, input: &Array) -> Result<Array> {
    let aval = reduce_aval(op, &input.aval())?;
    let data = input.as_slice();
    let value = match op {
        Primitive::SumAll => data.iter().sum::<f32>(),
        Primitive::MeanAll => data.iter().sum::<f32>() / data.len() as f32,
        Primitive::MaxAll => data.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        Primitive::Sum { axis } => return Ok(sum_axis(input, *axis, aval)),
        _ => unreachable!("{} is not a reduction primitive", op.name()),
    };
    Ok(Array::from_parts(vec![aval.dtype().cast_from_f32(value)], Shape::scalar(), aval.dtype()))
}

/// Sum along one axis of a row-major array.
fn sum_axis(input: &Array, axis: usize, aval: ShapedArray) -> Array {
    let dims = input.shape().as_slice();
    let strides = input.shape().default_strides();
    let axis_len = dims[axis];
    let axis_stride = strides[axis];
    // Elements before `axis` advance by `outer_stride`; elements after it are contiguous.
    let inner: usize = dims[axis + 1..].iter().product();
    let outer: usize = dims[..axis].iter().product();
    let outer_stride = axis_len * inner;

    let data = input.as_slice();
    let mut result = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let base = o * outer_stride + i;
            let acc: f32 = (0..axis_len).map(|k| data[base + k * axis_stride]).sum();
            result.push(aval.dtype().cast_from_f32(acc));
        }
    }

    let (shape, dtype) = aval.into_parts();
    Array::from_parts(result, shape, dtype)
}
