//! Abstraction levels and abstract values.
//!
//! A traced argument is replaced by a placeholder that only carries what its
//! abstraction level allows. The level decides both what the traced function
//! may inspect and how much of the argument enters the cache key:
//!
//! | level      | may inspect          | cache key per traced argument |
//! |------------|----------------------|-------------------------------|
//! | `Unshaped` | dtype                | dtype                         |
//! | `Shaped`   | dtype, shape         | dtype, shape                  |
//! | `Concrete` | dtype, shape, values | dtype, shape, values          |

use crate::{DType, Shape};
use std::fmt;

/// How much of a traced argument a placeholder exposes.
///
/// Levels are ordered from strictest to loosest, so the stricter of two
/// levels is their minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AbstractionLevel {
    /// Only the dtype is known. Shape inspection fails.
    Unshaped,
    /// Shape and dtype are known; values are not.
    #[default]
    Shaped,
    /// Shape, dtype and values are known. Branching is allowed but every
    /// distinct value is traced and compiled separately.
    Concrete,
}

impl AbstractionLevel {
    /// The stricter of two levels.
    ///
    /// ```
    /// # use tracejit::AbstractionLevel;
    /// let level = AbstractionLevel::Concrete.stricter(AbstractionLevel::Shaped);
    /// assert_eq!(level, AbstractionLevel::Shaped);
    /// ```
    pub fn stricter(self, other: AbstractionLevel) -> AbstractionLevel {
        self.min(other)
    }

    /// Whether placeholders at this level expose their shape.
    pub fn exposes_shape(self) -> bool {
        self >= AbstractionLevel::Shaped
    }

    /// Whether placeholders at this level expose their values.
    pub fn exposes_value(self) -> bool {
        self == AbstractionLevel::Concrete
    }

    /// Returns the name of this level as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AbstractionLevel::Unshaped => "unshaped",
            AbstractionLevel::Shaped => "shaped",
            AbstractionLevel::Concrete => "concrete",
        }
    }
}

impl fmt::Display for AbstractionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AbstractionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unshaped" => Ok(AbstractionLevel::Unshaped),
            "shaped" => Ok(AbstractionLevel::Shaped),
            "concrete" => Ok(AbstractionLevel::Concrete),
            _ => Err(format!("Unknown abstraction level: {}", s)),
        }
    }
}

/// Shape and dtype of an array, without its values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapedArray {
    shape: Shape,
    dtype: DType,
}

impl ShapedArray {
    /// Create an abstract value.
    pub fn new(shape: Shape, dtype: DType) -> Self {
        Self { shape, dtype }
    }

    /// Shape of the abstract value.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Dtype of the abstract value.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Split into shape and dtype.
    pub fn into_parts(self) -> (Shape, DType) {
        (self.shape, self.dtype)
    }
}

/// Printed as `f32[2,3]`; scalars print as `f32[]`.
impl fmt::Display for ShapedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, dim) in self.shape.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(AbstractionLevel::Unshaped < AbstractionLevel::Shaped);
        assert!(AbstractionLevel::Shaped < AbstractionLevel::Concrete);
        assert_eq!(AbstractionLevel::default(), AbstractionLevel::Shaped);
        assert_eq!(
            AbstractionLevel::Unshaped.stricter(AbstractionLevel::Concrete),
            AbstractionLevel::Unshaped
        );
    }

    #[test]
    fn test_exposure() {
        assert!(!AbstractionLevel::Unshaped.exposes_shape());
        assert!(AbstractionLevel::Shaped.exposes_shape());
        assert!(!AbstractionLevel::Shaped.exposes_value());
        assert!(AbstractionLevel::Concrete.exposes_value());
    }

    #[test]
    fn test_parse() {
        assert_eq!("Shaped".parse::<AbstractionLevel>().unwrap(), AbstractionLevel::Shaped);
        assert!("loose".parse::<AbstractionLevel>().is_err());
    }

    #[test]
    fn test_shaped_array_display() {
        let aval = ShapedArray::new(Shape::new(vec![2, 3]), DType::Float32);
        assert_eq!(aval.to_string(), "f32[2,3]");
        assert_eq!(ShapedArray::new(Shape::scalar(), DType::Int32).to_string(), "i32[]");
    }
}
