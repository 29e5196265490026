//! Core Array type for n-dimensional numeric arrays.

use crate::trace::ShapedArray;
use crate::{DType, JitError, Result, Shape};
use std::fmt;
use std::sync::Arc;

/// A dense, immutable, CPU-resident n-dimensional array.
///
/// Elements are stored as `f32` in row-major order and rounded to the
/// array's dtype on construction. Cloning is cheap: the data is shared
/// through an `Arc`.
///
/// # Examples
///
/// ```
/// # use tracejit::{Array, DType, Shape};
/// let a = Array::zeros(Shape::new(vec![2, 3]), DType::Float32);
/// assert_eq!(a.shape().as_slice(), &[2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct Array {
    data: Arc<Vec<f32>>,
    shape: Shape,
    dtype: DType,
}

impl Array {
    /// Create a new array filled with zeros.
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        Self::full(0.0, shape, dtype)
    }

    /// Create a new array filled with ones.
    pub fn ones(shape: Shape, dtype: DType) -> Self {
        Self::full(1.0, shape, dtype)
    }

    /// Create a new array filled with a specific value.
    pub fn full(value: f32, shape: Shape, dtype: DType) -> Self {
        let data = vec![dtype.cast_from_f32(value); shape.size()];
        Self::from_parts(data, shape, dtype)
    }

    /// Create a 0-dimensional float32 array.
    ///
    /// ```
    /// # use tracejit::Array;
    /// let x = Array::scalar(10.0);
    /// assert!(x.is_scalar());
    /// assert_eq!(x.item(), Some(10.0));
    /// ```
    pub fn scalar(value: f32) -> Self {
        Self::full(value, Shape::scalar(), DType::Float32)
    }

    /// Create a 0-dimensional array of the given dtype.
    pub fn scalar_of(value: f32, dtype: DType) -> Self {
        Self::full(value, Shape::scalar(), dtype)
    }

    /// Create a float32 array from a flat Vec<f32> and shape.
    ///
    /// # Panics
    ///
    /// Panics if the shape size doesn't match the data length. Use
    /// [`Array::try_from_vec`] for a fallible version.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tracejit::{Array, Shape};
    /// let a = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Shape::new(vec![2, 3]));
    /// assert_eq!(a.shape().as_slice(), &[2, 3]);
    /// ```
    pub fn from_vec(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.size(),
            "Data length must match shape size"
        );
        Self::from_parts(data, shape, DType::Float32)
    }

    /// Create an array of the given dtype, checking the data length.
    pub fn try_from_vec(data: Vec<f32>, shape: Shape, dtype: DType) -> Result<Self> {
        if data.len() != shape.size() {
            return Err(JitError::DataLength { len: data.len(), shape });
        }
        let data = data.into_iter().map(|x| dtype.cast_from_f32(x)).collect();
        Ok(Self::from_parts(data, shape, dtype))
    }

    /// Create an int32 array from a Vec<i32>.
    pub fn from_vec_i32(data: Vec<i32>, shape: Shape) -> Self {
        assert_eq!(data.len(), shape.size(), "Data length must match shape size");
        let data = data.into_iter().map(|x| x as f32).collect();
        Self::from_parts(data, shape, DType::Int32)
    }

    /// Create a bool array from a Vec<bool>.
    pub fn from_vec_bool(data: Vec<bool>, shape: Shape) -> Self {
        assert_eq!(data.len(), shape.size(), "Data length must match shape size");
        let data = data.into_iter().map(|b| if b { 1.0 } else { 0.0 }).collect();
        Self::from_parts(data, shape, DType::Bool)
    }

    /// Build an array from data already rounded to `dtype`.
    pub(crate) fn from_parts(data: Vec<f32>, shape: Shape, dtype: DType) -> Self {
        debug_assert_eq!(data.len(), shape.size());
        Self { data: Arc::new(data), shape, dtype }
    }

    /// Get the shape of the array.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Get the data type of the array.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Get the number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Get the total number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Check if this is a scalar (0-dimensional array).
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_scalar()
    }

    /// Borrow the elements in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copy data to a Vec<f32>.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.as_ref().clone()
    }

    /// Copy data to a Vec<bool> (non-zero elements are true).
    pub fn to_bool_vec(&self) -> Vec<bool> {
        self.data.iter().map(|&x| x != 0.0).collect()
    }

    /// The single element of a size-1 array.
    pub fn item(&self) -> Option<f32> {
        if self.size() == 1 {
            Some(self.data[0])
        } else {
            None
        }
    }

    /// Abstract value (shape and dtype) of this array.
    pub fn aval(&self) -> ShapedArray {
        ShapedArray::new(self.shape.clone(), self.dtype)
    }

    /// Bit patterns of the elements, used for bitwise value keys.
    pub(crate) fn bits(&self) -> Vec<u32> {
        self.data.iter().map(|x| x.to_bits()).collect()
    }

    /// Cast array to a different dtype.
    ///
    /// ```
    /// # use tracejit::{Array, DType, Shape};
    /// let a = Array::from_vec(vec![1.0, 2.5, 3.9], Shape::new(vec![3]));
    /// let b = a.astype(DType::Int32);
    /// assert_eq!(b.dtype(), DType::Int32);
    /// assert_eq!(b.to_vec(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn astype(&self, dtype: DType) -> Self {
        if self.dtype == dtype {
            return self.clone();
        }
        let data = self.data.iter().map(|&x| dtype.cast_from_f32(x)).collect();
        Self::from_parts(data, self.shape.clone(), dtype)
    }

    /// Same data viewed with a new shape of equal size.
    pub fn reshape(&self, shape: Shape) -> Result<Self> {
        if shape.size() != self.size() {
            return Err(JitError::InvalidReshape { from: self.shape.clone(), to: shape });
        }
        Ok(Self { data: Arc::clone(&self.data), shape, dtype: self.dtype })
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype && self.shape == other.shape && self.data == other.data
    }
}

impl From<f32> for Array {
    fn from(value: f32) -> Self {
        Array::scalar(value)
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array:{}{}", self.dtype, self.shape)
    }
}
