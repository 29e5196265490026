//! Values seen by a jitted function: concrete arrays or tracers.
//!
//! Every operation a traced function performs goes through [`Value`]. On
//! concrete operands it evaluates eagerly. As soon as one operand is a
//! [`Tracer`], the operation is recorded into the IR instead and the result
//! is a new tracer. Extracting a branch decision or a number from a tracer
//! is the only way tracing can fail on control flow: it yields
//! [`JitError::AbstractValue`] unless the tracer's level exposes values.

use crate::ops;
use crate::trace::{record_equation, AbstractionLevel, IRNode, Primitive, ShapedArray};
use crate::{Array, DType, JitError, Result, Shape};
use std::sync::Arc;

/// Placeholder for a traced argument or a value derived from one.
#[derive(Debug, Clone)]
pub struct Tracer {
    node: Arc<IRNode>,
    level: AbstractionLevel,
    /// Known value; only present when `level` exposes values.
    known: Option<Array>,
    trace_id: usize,
}

impl Tracer {
    /// Create a tracer for `node` belonging to trace `trace_id`.
    ///
    /// `known` is dropped unless `level` exposes values.
    pub fn new(
        node: Arc<IRNode>,
        level: AbstractionLevel,
        known: Option<Array>,
        trace_id: usize,
    ) -> Self {
        let known = known.filter(|_| level.exposes_value());
        Self { node, level, known, trace_id }
    }

    /// IR node this tracer stands for.
    pub fn node(&self) -> &Arc<IRNode> {
        &self.node
    }

    /// Abstraction level of this tracer.
    pub fn level(&self) -> AbstractionLevel {
        self.level
    }

    /// Trace this tracer belongs to.
    pub fn trace_id(&self) -> usize {
        self.trace_id
    }

    /// Shape and dtype.
    ///
    /// Fails under [`AbstractionLevel::Unshaped`], where the shape is not
    /// part of the cache key and must not influence the trace.
    pub fn aval(&self) -> Result<ShapedArray> {
        if !self.level.exposes_shape() {
            return Err(self.abstract_error("aval"));
        }
        Ok(self.node.aval())
    }

    /// Dtype of the placeholder. Known at every level.
    pub fn dtype(&self) -> DType {
        self.node.dtype()
    }

    /// The concrete value, when the level exposes it.
    pub fn known_value(&self) -> Option<&Array> {
        self.known.as_ref()
    }

    /// Same tracer seen at the stricter of its level and `level`.
    pub fn restrict(&self, level: AbstractionLevel) -> Tracer {
        Tracer::new(self.node.clone(), self.level.stricter(level), self.known.clone(), self.trace_id)
    }

    fn abstract_error(&self, operation: &'static str) -> JitError {
        JitError::AbstractValue { operation, aval: self.node.aval().to_string(), level: self.level }
    }
}

/// A value flowing through a jitted function.
#[derive(Debug, Clone)]
pub enum Value {
    /// A concrete array (static arguments, literals, eager values)
    Concrete(Array),
    /// A placeholder recorded into the current trace
    Abstract(Tracer),
}

impl Value {
    /// A float32 scalar literal.
    pub fn scalar(value: f32) -> Value {
        Value::Concrete(Array::scalar(value))
    }

    /// Returns true for concrete values.
    pub fn is_concrete(&self) -> bool {
        matches!(self, Value::Concrete(_))
    }

    /// The array of a concrete value.
    pub fn as_concrete(&self) -> Option<&Array> {
        match self {
            Value::Concrete(array) => Some(array),
            Value::Abstract(_) => None,
        }
    }

    /// The tracer of an abstract value.
    pub fn as_tracer(&self) -> Option<&Tracer> {
        match self {
            Value::Concrete(_) => None,
            Value::Abstract(tracer) => Some(tracer),
        }
    }

    /// Shape and dtype of the value.
    ///
    /// Fails under [`AbstractionLevel::Unshaped`], like [`Value::shape`].
    pub fn aval(&self) -> Result<ShapedArray> {
        match self {
            Value::Concrete(array) => Ok(array.aval()),
            Value::Abstract(tracer) => tracer.aval(),
        }
    }

    /// Shape and dtype as recorded, ignoring the abstraction level.
    pub(crate) fn aval_unchecked(&self) -> ShapedArray {
        match self {
            Value::Concrete(array) => array.aval(),
            Value::Abstract(tracer) => tracer.node.aval(),
        }
    }

    /// Dtype of the value. Always available.
    pub fn dtype(&self) -> DType {
        match self {
            Value::Concrete(array) => array.dtype(),
            Value::Abstract(tracer) => tracer.dtype(),
        }
    }

    /// Shape of the value.
    ///
    /// Fails under [`AbstractionLevel::Unshaped`], where conditioning on
    /// shape is forbidden.
    pub fn shape(&self) -> Result<Shape> {
        match self {
            Value::Abstract(tracer) if !tracer.level.exposes_shape() => {
                Err(tracer.abstract_error("shape"))
            }
            _ => Ok(self.aval_unchecked().into_parts().0),
        }
    }

    /// The concrete array behind this value, if its level exposes it.
    pub fn concrete(&self) -> Result<Array> {
        self.concretize("concrete value")
    }

    fn concretize(&self, operation: &'static str) -> Result<Array> {
        match self {
            Value::Concrete(array) => Ok(array.clone()),
            Value::Abstract(tracer) => {
                tracer.known.clone().ok_or_else(|| tracer.abstract_error(operation))
            }
        }
    }

    /// Branch decision for a size-1 value.
    ///
    /// This is what `if`/`while` conditions go through; on a tracer without
    /// a known value it fails with [`JitError::AbstractValue`].
    pub fn to_bool(&self) -> Result<bool> {
        let array = self.concretize("to_bool")?;
        array
            .item()
            .map(|x| x != 0.0)
            .ok_or(JitError::AmbiguousTruthValue { size: array.size() })
    }

    /// The single number of a size-1 value.
    pub fn item(&self) -> Result<f32> {
        let array = self.concretize("item")?;
        array.item().ok_or(JitError::AmbiguousTruthValue { size: array.size() })
    }

    /// Apply `op` to `args`, evaluating eagerly or recording into the trace.
    pub(crate) fn apply(op: Primitive, args: &[&Value]) -> Result<Value> {
        let avals: Vec<ShapedArray> = args.iter().map(|v| v.aval_unchecked()).collect();
        let aval_refs: Vec<&ShapedArray> = avals.iter().collect();
        let out_aval = ops::abstract_eval(&op, &aval_refs)?;

        let tracers: Vec<&Tracer> = args.iter().filter_map(|v| v.as_tracer()).collect();
        let Some(first) = tracers.first() else {
            let arrays: Vec<&Array> = args.iter().filter_map(|v| v.as_concrete()).collect();
            return ops::evaluate(&op, &arrays).map(Value::Concrete);
        };

        let trace_id = first.trace_id;
        if let Some(other) = tracers.iter().find(|t| t.trace_id != trace_id) {
            return Err(JitError::EscapedTracer { trace_id: other.trace_id });
        }
        record_equation(trace_id)?;

        let level = tracers.iter().map(|t| t.level).min().unwrap_or_default();
        let known = if level.exposes_value() {
            let values: Option<Vec<Array>> = args
                .iter()
                .map(|v| match v {
                    Value::Concrete(array) => Some(array.clone()),
                    Value::Abstract(tracer) => tracer.known.clone(),
                })
                .collect();
            match values {
                Some(values) => {
                    let refs: Vec<&Array> = values.iter().collect();
                    Some(ops::evaluate(&op, &refs)?)
                }
                None => None,
            }
        } else {
            None
        };

        let operands = args
            .iter()
            .map(|v| match v {
                Value::Concrete(array) => IRNode::constant(array.clone()),
                Value::Abstract(tracer) => tracer.node.clone(),
            })
            .collect();
        let node = IRNode::operation(op, operands, out_aval);
        Ok(Value::Abstract(Tracer::new(node, level, known, trace_id)))
    }

    fn unary(&self, op: Primitive) -> Result<Value> {
        Value::apply(op, &[self])
    }

    fn binary(&self, op: Primitive, rhs: &Value) -> Result<Value> {
        Value::apply(op, &[self, rhs])
    }

    /// Element-wise negation.
    pub fn neg(&self) -> Result<Value> {
        self.unary(Primitive::Neg)
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> Result<Value> {
        self.unary(Primitive::Abs)
    }

    /// Element-wise exponential.
    pub fn exp(&self) -> Result<Value> {
        self.unary(Primitive::Exp)
    }

    /// Element-wise natural logarithm.
    pub fn log(&self) -> Result<Value> {
        self.unary(Primitive::Log)
    }

    /// Element-wise sine.
    pub fn sin(&self) -> Result<Value> {
        self.unary(Primitive::Sin)
    }

    /// Element-wise cosine.
    pub fn cos(&self) -> Result<Value> {
        self.unary(Primitive::Cos)
    }

    /// Element-wise hyperbolic tangent.
    pub fn tanh(&self) -> Result<Value> {
        self.unary(Primitive::Tanh)
    }

    /// Element-wise square root.
    pub fn sqrt(&self) -> Result<Value> {
        self.unary(Primitive::Sqrt)
    }

    /// Add two values element-wise with broadcasting.
    ///
    /// ```
    /// # use tracejit::{Array, Shape, Value};
    /// let a = Value::from(Array::from_vec(vec![1.0, 2.0, 3.0], Shape::new(vec![3])));
    /// let b = a.add(&Value::scalar(10.0)).unwrap();
    /// assert_eq!(b.concrete().unwrap().to_vec(), vec![11.0, 12.0, 13.0]);
    /// ```
    pub fn add(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Add, rhs)
    }

    /// Subtract element-wise with broadcasting.
    pub fn sub(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Sub, rhs)
    }

    /// Multiply element-wise with broadcasting.
    pub fn mul(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Mul, rhs)
    }

    /// True division element-wise with broadcasting. Always float32.
    pub fn div(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Div, rhs)
    }

    /// Element-wise power.
    pub fn pow(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Pow, rhs)
    }

    /// Element-wise minimum.
    pub fn minimum(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Min, rhs)
    }

    /// Element-wise maximum.
    pub fn maximum(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Max, rhs)
    }

    /// Element-wise `<`.
    pub fn lt(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Lt, rhs)
    }

    /// Element-wise `<=`.
    pub fn le(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Le, rhs)
    }

    /// Element-wise `>`.
    pub fn gt(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Gt, rhs)
    }

    /// Element-wise `>=`.
    pub fn ge(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Ge, rhs)
    }

    /// Element-wise `==`.
    pub fn eq(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Eq, rhs)
    }

    /// Element-wise `!=`.
    pub fn ne(&self, rhs: &Value) -> Result<Value> {
        self.binary(Primitive::Ne, rhs)
    }

    /// Element-wise choice between `on_true` and `on_false`.
    ///
    /// Both branches are computed; no branch decision is extracted, so this
    /// works on tracers at every abstraction level.
    pub fn select(pred: &Value, on_true: &Value, on_false: &Value) -> Result<Value> {
        Value::apply(Primitive::Select, &[pred, on_true, on_false])
    }

    /// Sum of all elements.
    pub fn sum_all(&self) -> Result<Value> {
        self.unary(Primitive::SumAll)
    }

    /// Sum along `axis`.
    pub fn sum(&self, axis: usize) -> Result<Value> {
        self.unary(Primitive::Sum { axis })
    }

    /// Mean of all elements.
    pub fn mean_all(&self) -> Result<Value> {
        self.unary(Primitive::MeanAll)
    }

    /// Maximum of all elements.
    pub fn max_all(&self) -> Result<Value> {
        self.unary(Primitive::MaxAll)
    }

    /// Reshape to `shape` (same number of elements).
    pub fn reshape(&self, shape: Shape) -> Result<Value> {
        self.unary(Primitive::Reshape { new_shape: shape.as_slice().to_vec() })
    }

    /// Convert to `dtype`.
    pub fn astype(&self, dtype: DType) -> Result<Value> {
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        self.unary(Primitive::Convert { dtype })
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Concrete(array)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::scalar(value)
    }
}
