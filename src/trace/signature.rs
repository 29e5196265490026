//! Cache keys for compiled functions.

use crate::trace::AbstractionLevel;
use crate::{Array, DType, Shape};
use std::fmt;

/// Identity of a wrapped callable. Unique per wrapper instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub(crate) usize);

/// Key contribution of a traced argument: as much as its level exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbstractKey {
    dtype: DType,
    shape: Option<Shape>,
    bits: Option<Vec<u32>>,
}

impl AbstractKey {
    /// Key of `array` seen at `level`.
    pub fn new(array: &Array, level: AbstractionLevel) -> Self {
        Self {
            dtype: array.dtype(),
            shape: level.exposes_shape().then(|| array.shape().clone()),
            bits: level.exposes_value().then(|| array.bits()),
        }
    }
}

/// Key contribution of a static argument: its full value.
///
/// Values compare bitwise, so `0.0` and `-0.0` are different keys and a
/// NaN equals itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticKey {
    dtype: DType,
    shape: Shape,
    bits: Vec<u32>,
}

impl StaticKey {
    /// Key of the static value `array`.
    pub fn new(array: &Array) -> Self {
        Self { dtype: array.dtype(), shape: array.shape().clone(), bits: array.bits() }
    }
}

/// Key of one argument position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKey {
    /// Traced position
    Traced(AbstractKey),
    /// Static position
    Static(StaticKey),
}

/// The cache key of one call: callable identity plus one key per argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    function: FunctionId,
    args: Vec<ArgKey>,
}

impl Signature {
    /// Build a signature from per-argument keys.
    pub fn new(function: FunctionId, args: Vec<ArgKey>) -> Self {
        Self { function, args }
    }

    /// The callable this signature belongs to.
    pub fn function(&self) -> FunctionId {
        self.function
    }

    /// Per-argument keys in call order.
    pub fn args(&self) -> &[ArgKey] {
        &self.args
    }
}

/// Compact form for logs: `(f32[3], static i32[]=[4])`, `?` for hidden shapes.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match arg {
                ArgKey::Traced(key) => {
                    write!(f, "{}", key.dtype)?;
                    match &key.shape {
                        Some(shape) => write_dims(f, shape)?,
                        None => write!(f, "[?]")?,
                    }
                    if let Some(bits) = &key.bits {
                        write!(f, "=")?;
                        write_values(f, bits)?;
                    }
                }
                ArgKey::Static(key) => {
                    write!(f, "static {}", key.dtype)?;
                    write_dims(f, &key.shape)?;
                    write!(f, "=")?;
                    write_values(f, &key.bits)?;
                }
            }
        }
        write!(f, ")")
    }
}

fn write_dims(f: &mut fmt::Formatter<'_>, shape: &Shape) -> fmt::Result {
    let dims: Vec<String> = shape.as_slice().iter().map(|d| d.to_string()).collect();
    write!(f, "[{}]", dims.join(","))
}

fn write_values(f: &mut fmt::Formatter<'_>, bits: &[u32]) -> fmt::Result {
    let values: Vec<String> = bits.iter().map(|&b| f32::from_bits(b).to_string()).collect();
    write!(f, "[{}]", values.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shaped_key_ignores_values() {
        let a = Array::from_vec(vec![1.0, 2.0], Shape::new(vec![2]));
        let b = Array::from_vec(vec![3.0, 4.0], Shape::new(vec![2]));
        let c = Array::from_vec(vec![1.0, 2.0, 3.0], Shape::new(vec![3]));
        let level = AbstractionLevel::Shaped;
        assert_eq!(AbstractKey::new(&a, level), AbstractKey::new(&b, level));
        assert_ne!(AbstractKey::new(&a, level), AbstractKey::new(&c, level));
    }

    #[test]
    fn test_unshaped_key_ignores_shape() {
        let a = Array::from_vec(vec![1.0, 2.0], Shape::new(vec![2]));
        let c = Array::from_vec(vec![1.0, 2.0, 3.0], Shape::new(vec![3]));
        let level = AbstractionLevel::Unshaped;
        assert_eq!(AbstractKey::new(&a, level), AbstractKey::new(&c, level));
        let i = Array::from_vec_i32(vec![1, 2], Shape::new(vec![2]));
        assert_ne!(AbstractKey::new(&a, level), AbstractKey::new(&i, level));
    }

    #[test]
    fn test_concrete_key_includes_values() {
        let a = Array::scalar(1.0);
        let b = Array::scalar(2.0);
        let level = AbstractionLevel::Concrete;
        assert_ne!(AbstractKey::new(&a, level), AbstractKey::new(&b, level));
    }

    #[test]
    fn test_static_key_is_bitwise() {
        assert_eq!(StaticKey::new(&Array::scalar(10.0)), StaticKey::new(&Array::scalar(10.0)));
        assert_ne!(StaticKey::new(&Array::scalar(0.0)), StaticKey::new(&Array::scalar(-0.0)));
        assert_eq!(StaticKey::new(&Array::scalar(f32::NAN)), StaticKey::new(&Array::scalar(f32::NAN)));
        assert_ne!(
            StaticKey::new(&Array::scalar(1.0)),
            StaticKey::new(&Array::scalar_of(1.0, DType::Int32))
        );
    }

    #[test]
    fn test_signature_display() {
        let sig = Signature::new(
            FunctionId(0),
            vec![
                ArgKey::Traced(AbstractKey::new(
                    &Array::zeros(Shape::new(vec![3]), DType::Float32),
                    AbstractionLevel::Shaped,
                )),
                ArgKey::Static(StaticKey::new(&Array::scalar_of(4.0, DType::Int32))),
            ],
        );
        assert_eq!(sig.to_string(), "(f32[3], static i32[]=[4])");
    }
}
