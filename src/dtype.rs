//! Data type definitions and utilities.

use std::fmt;

/// Numerical data type for array contents.
///
/// Values are stored as `f32` regardless of dtype; the dtype decides how
/// results are rounded after each primitive and participates in trace
/// signatures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DType {
    /// Boolean (stored as 0.0 / 1.0)
    Bool,
    /// 32-bit signed integer
    Int32,
    /// 32-bit floating point
    Float32,
}

impl DType {
    /// Returns true if this is a floating-point dtype.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, DType::Float32)
    }

    /// Returns true if this is an integer dtype.
    #[inline]
    pub const fn is_int(self) -> bool {
        matches!(self, DType::Int32)
    }

    /// Short name used when printing abstract values, e.g. `f32[3]`.
    pub const fn short_name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int32 => "i32",
            DType::Float32 => "f32",
        }
    }

    /// Promotes two dtypes along the lattice `bool -> i32 -> f32`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tracejit::DType;
    /// assert_eq!(DType::promote(DType::Bool, DType::Int32), DType::Int32);
    /// assert_eq!(DType::promote(DType::Int32, DType::Float32), DType::Float32);
    /// assert_eq!(DType::promote(DType::Float32, DType::Float32), DType::Float32);
    /// ```
    pub fn promote(dtype1: DType, dtype2: DType) -> DType {
        if dtype1 == dtype2 {
            return dtype1;
        }

        let rank = |d: DType| match d {
            DType::Bool => 0,
            DType::Int32 => 1,
            DType::Float32 => 2,
        };

        if rank(dtype1) > rank(dtype2) {
            dtype1
        } else {
            dtype2
        }
    }

    /// Cast a float32 value to this dtype (returns as f32 for storage).
    #[inline]
    pub fn cast_from_f32(self, value: f32) -> f32 {
        match self {
            DType::Float32 => value,
            DType::Int32 => (value as i32) as f32,
            DType::Bool => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl std::str::FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(DType::Bool),
            "i32" | "int32" => Ok(DType::Int32),
            "f32" | "float32" => Ok(DType::Float32),
            _ => Err(format!("Unknown dtype: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote() {
        assert_eq!(DType::promote(DType::Bool, DType::Bool), DType::Bool);
        assert_eq!(DType::promote(DType::Float32, DType::Bool), DType::Float32);
        assert_eq!(DType::promote(DType::Int32, DType::Bool), DType::Int32);
    }

    #[test]
    fn test_cast() {
        assert_eq!(DType::Int32.cast_from_f32(2.7), 2.0);
        assert_eq!(DType::Int32.cast_from_f32(-2.7), -2.0);
        assert_eq!(DType::Bool.cast_from_f32(-3.0), 1.0);
        assert_eq!(DType::Float32.cast_from_f32(0.5), 0.5);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("f32".parse::<DType>().unwrap(), DType::Float32);
        assert_eq!("int32".parse::<DType>().unwrap(), DType::Int32);
        assert!("f64".parse::<DType>().is_err());
        assert_eq!(DType::Bool.to_string(), "bool");
    }
}
