//! Unary operations on arrays.
//!
//! Covers element-wise math plus the two shape/dtype-only primitives
//! (`reshape`, `convert_element_type`), which take exactly one operand.

use crate::trace::{Primitive, ShapedArray};
use crate::{Array, DType, JitError, Result, Shape};

/// Abstract evaluation: output shape and dtype of a unary primitive.
pub(crate) fn unary_aval(op: &Primitive, input: &ShapedArray) -> Result<ShapedArray> {
    let dtype = input.dtype();
    match op {
        Primitive::Neg | Primitive::Abs => {
            let dtype = if dtype == DType::Bool { DType::Int32 } else { dtype };
            Ok(ShapedArray::new(input.shape().clone(), dtype))
        }
        Primitive::Exp
        | Primitive::Log
        | Primitive::Sin
        | Primitive::Cos
        | Primitive::Tanh
        | Primitive::Sqrt => Ok(ShapedArray::new(input.shape().clone(), DType::Float32)),
        Primitive::Reshape { new_shape } => {
            let to = Shape::new(new_shape.clone());
            if to.size() != input.shape().size() {
                return Err(JitError::InvalidReshape { from: input.shape().clone(), to });
            }
            Ok(ShapedArray::new(to, dtype))
        }
        Primitive::Convert { dtype } => Ok(ShapedArray::new(input.shape().clone(), *dtype)),
        _ => unreachable!("{} is not a unary primitive", op.name()),
    }
}

/// Apply a unary primitive to a concrete array.
pub(crate) fn apply(op: &Primitive, input: &Array) -> Result<Array> {
    match op {
        Primitive::Neg => Ok(map(input, op, |x| -x)),
        Primitive::Abs => Ok(map(input, op, f32::abs)),
        Primitive::Exp => Ok(map(input, op, f32::exp)),
        Primitive::Log => Ok(map(input, op, f32::ln)),
        Primitive::Sin => Ok(map(input, op, f32::sin)),
        Primitive::Cos => Ok(map(input, op, f32::cos)),
        Primitive::Tanh => Ok(map(input, op, f32::tanh)),
        Primitive::Sqrt => Ok(map(input, op, f32::sqrt)),
        Primitive::Reshape { new_shape } => input.reshape(Shape::new(new_shape.clone())),
        Primitive::Convert { dtype } => Ok(input.astype(*dtype)),
        _ => unreachable!("{} is not a unary primitive", op.name()),
    }
}

/// Apply an element-wise function, rounding to the primitive's output dtype.
fn map<F>(input: &Array, op: &Primitive, f: F) -> Array
where
    F: Fn(f32) -> f32,
{
    let dtype = match unary_aval(op, &input.aval()) {
        Ok(aval) => aval.dtype(),
        Err(_) => input.dtype(),
    };
    let data = input.as_slice().iter().map(|&x| dtype.cast_from_f32(f(x))).collect();
    Array::from_parts(data, input.shape().clone(), dtype)
}
