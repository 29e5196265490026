//! Array shapes.

use std::fmt;

/// Dimensions of an array, outermost first. No dimensions means a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Shape with the given dimensions.
    ///
    /// ```
    /// # use tracejit::Shape;
    /// let shape = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(shape.ndim(), 3);
    /// assert_eq!(shape.size(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// The rank-0 shape.
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    /// Rank.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements: 1 for a scalar, 0 if any dimension is 0.
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// The dimensions.
    pub fn as_slice(&self) -> &[usize] {
        &self.dims
    }

    /// True for the rank-0 shape.
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Result shape of reducing over `axis`. Out-of-range axes are left alone;
    /// callers check the axis first.
    pub fn without_axis(&self, axis: usize) -> Shape {
        let dims = self
            .dims
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != axis)
            .map(|(_, &d)| d)
            .collect();
        Shape::new(dims)
    }

    /// Row-major element strides.
    ///
    /// ```
    /// # use tracejit::Shape;
    /// assert_eq!(Shape::new(vec![2, 3, 4]).default_strides(), vec![12, 4, 1]);
    /// ```
    pub fn default_strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.dims.len());
        let mut stride = 1;
        for &dim in self.dims.iter().rev() {
            strides.push(stride);
            stride *= dim;
        }
        strides.reverse();
        strides
    }
}

/// NumPy tuple notation: `()`, `(5,)`, `(2, 3)`.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dims.as_slice() {
            [] => write!(f, "()"),
            [only] => write!(f, "({},)", only),
            dims => {
                let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "({})", dims.join(", "))
            }
        }
    }
}
