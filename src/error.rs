//! Error types for tracing, compilation and execution.

use crate::trace::AbstractionLevel;
use crate::Shape;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, JitError>;

/// Errors raised while wrapping, tracing, compiling or executing a function.
///
/// None of these are retried. A failed trace leaves the wrapper's cache
/// unchanged for that signature.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum JitError {
    /// A concrete value was requested from a placeholder whose abstraction
    /// level does not carry it, e.g. branching on a traced argument.
    #[error(
        "abstract tracer value encountered where a concrete value is expected: \
         {operation} on {aval} (abstraction level: {level}). \
         Mark the argument as static, use `select`, or move the branch outside the jitted function."
    )]
    AbstractValue {
        /// What was attempted (`to_bool`, `item`, `shape`, ...)
        operation: &'static str,
        /// Printed abstract value of the tracer, e.g. `f32[]`
        aval: String,
        /// Effective abstraction level of the tracer
        level: AbstractionLevel,
    },

    /// A static argument position does not name a parameter.
    #[error("static argument position {position} is out of range for a function of {num_args} arguments")]
    InvalidStaticArgument {
        /// Offending position
        position: usize,
        /// Declared number of parameters
        num_args: usize,
    },

    /// Wrong number of arguments at call time.
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount {
        /// Declared number of parameters
        expected: usize,
        /// Number of arguments passed
        got: usize,
    },

    /// Operand shapes cannot be broadcast together.
    #[error("incompatible shapes for {op}: {lhs} and {rhs}")]
    IncompatibleShapes {
        /// Primitive name
        op: String,
        /// Left operand shape
        lhs: Shape,
        /// Right operand shape
        rhs: Shape,
    },

    /// Reshape changes the number of elements.
    #[error("cannot reshape array of shape {from} into shape {to}")]
    InvalidReshape {
        /// Source shape
        from: Shape,
        /// Requested shape
        to: Shape,
    },

    /// Reduction axis is out of range.
    #[error("axis {axis} is out of bounds for array of rank {ndim}")]
    AxisOutOfBounds {
        /// Requested axis
        axis: usize,
        /// Rank of the operand
        ndim: usize,
    },

    /// Data length does not match the requested shape.
    #[error("data length {len} does not match shape {shape}")]
    DataLength {
        /// Number of elements supplied
        len: usize,
        /// Requested shape
        shape: Shape,
    },

    /// Truth value of a non-scalar array was requested.
    #[error("the truth value of an array with {size} elements is ambiguous")]
    AmbiguousTruthValue {
        /// Number of elements
        size: usize,
    },

    /// A tracer was used outside the trace that created it.
    #[error("tracer from trace {trace_id} used outside of its trace; values computed inside a jitted function must be returned, not stored")]
    EscapedTracer {
        /// Identifier of the trace that created the tracer
        trace_id: usize,
    },

    /// A compiled artifact received an input that does not match its signature.
    #[error("compiled function input {index} expected {expected}, got {got}")]
    InputMismatch {
        /// Input position
        index: usize,
        /// Expected abstract value
        expected: String,
        /// Supplied abstract value
        got: String,
    },
}

impl JitError {
    /// Returns true for the abstract-value (concretization) failure.
    pub fn is_abstract_value(&self) -> bool {
        matches!(self, JitError::AbstractValue { .. })
    }
}
