//! Intermediate representation for traced operations.

use crate::trace::ShapedArray;
use crate::{Array, DType, Shape};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

/// Primitive operations that can be traced and compiled.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    // Unary operations
    /// Negation
    Neg,
    /// Absolute value
    Abs,
    /// Exponential
    Exp,
    /// Natural logarithm
    Log,
    /// Sine
    Sin,
    /// Cosine
    Cos,
    /// Hyperbolic tangent
    Tanh,
    /// Square root
    Sqrt,

    // Binary operations
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// True division
    Div,
    /// Power
    Pow,
    /// Element-wise minimum
    Min,
    /// Element-wise maximum
    Max,

    // Comparisons
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,

    /// Branch-free selection: `select(pred, on_true, on_false)`
    Select,

    // Reductions
    /// Sum of all elements
    SumAll,
    /// Sum along one axis
    Sum {
        /// Reduced axis
        axis: usize,
    },
    /// Mean of all elements
    MeanAll,
    /// Maximum of all elements
    MaxAll,

    // Shape and dtype operations
    /// Reshape to the same number of elements
    Reshape {
        /// Target dimensions
        new_shape: Vec<usize>,
    },
    /// Element type conversion
    Convert {
        /// Target dtype
        dtype: DType,
    },
}

impl Primitive {
    /// Name used when printing the IR.
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Neg => "neg",
            Primitive::Abs => "abs",
            Primitive::Exp => "exp",
            Primitive::Log => "log",
            Primitive::Sin => "sin",
            Primitive::Cos => "cos",
            Primitive::Tanh => "tanh",
            Primitive::Sqrt => "sqrt",
            Primitive::Add => "add",
            Primitive::Sub => "sub",
            Primitive::Mul => "mul",
            Primitive::Div => "div",
            Primitive::Pow => "pow",
            Primitive::Min => "min",
            Primitive::Max => "max",
            Primitive::Lt => "lt",
            Primitive::Le => "le",
            Primitive::Gt => "gt",
            Primitive::Ge => "ge",
            Primitive::Eq => "eq",
            Primitive::Ne => "ne",
            Primitive::Select => "select",
            Primitive::SumAll | Primitive::Sum { .. } => "reduce_sum",
            Primitive::MeanAll => "reduce_mean",
            Primitive::MaxAll => "reduce_max",
            Primitive::Reshape { .. } => "reshape",
            Primitive::Convert { .. } => "convert_element_type",
        }
    }

    /// Number of operands.
    pub fn arity(&self) -> usize {
        match self {
            Primitive::Add
            | Primitive::Sub
            | Primitive::Mul
            | Primitive::Div
            | Primitive::Pow
            | Primitive::Min
            | Primitive::Max
            | Primitive::Lt
            | Primitive::Le
            | Primitive::Gt
            | Primitive::Ge
            | Primitive::Eq
            | Primitive::Ne => 2,
            Primitive::Select => 3,
            _ => 1,
        }
    }

    /// Returns true for reductions.
    pub fn is_reduction(&self) -> bool {
        matches!(
            self,
            Primitive::SumAll | Primitive::Sum { .. } | Primitive::MeanAll | Primitive::MaxAll
        )
    }

    /// Returns true for comparisons.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Primitive::Lt
                | Primitive::Le
                | Primitive::Gt
                | Primitive::Ge
                | Primitive::Eq
                | Primitive::Ne
        )
    }

    /// Bracketed parameter list for printing, if any.
    fn params(&self) -> Option<String> {
        match self {
            Primitive::Sum { axis } => Some(format!("axes=({},)", axis)),
            Primitive::Reshape { new_shape } => {
                Some(format!("new_sizes={}", Shape::new(new_shape.clone())))
            }
            Primitive::Convert { dtype } => Some(format!("new_dtype={}", dtype)),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params() {
            Some(params) => write!(f, "{}[{}]", self.name(), params),
            None => f.write_str(self.name()),
        }
    }
}

static SELECT: Primitive = Primitive::Select;

/// A node in the intermediate representation graph.
///
/// Each node represents either an input, a constant, or an operation.
/// Operation nodes carry the shape and dtype computed at trace time.
#[derive(Debug, Clone)]
pub enum IRNode {
    /// Input to the computation (a traced argument)
    Input {
        /// Position among the traced arguments
        id: usize,
        /// Shape seen at trace time
        shape: Shape,
        /// Element type
        dtype: DType,
    },

    /// Constant captured during tracing (static values, literals)
    Constant {
        /// The captured array
        value: Array,
    },

    /// Element-wise unary operation or reshape/convert
    Unary {
        /// Applied primitive
        op: Primitive,
        /// Operand
        input: Arc<IRNode>,
        /// Result shape
        shape: Shape,
        /// Result dtype
        dtype: DType,
    },

    /// Binary operation or comparison
    Binary {
        /// Applied primitive
        op: Primitive,
        /// Left operand
        lhs: Arc<IRNode>,
        /// Right operand
        rhs: Arc<IRNode>,
        /// Broadcast result shape
        shape: Shape,
        /// Result dtype
        dtype: DType,
    },

    /// Reduction operation
    Reduce {
        /// Applied primitive
        op: Primitive,
        /// Operand
        input: Arc<IRNode>,
        /// Result shape
        shape: Shape,
        /// Result dtype
        dtype: DType,
    },

    /// Element-wise selection between two operands
    Select {
        /// Boolean condition
        pred: Arc<IRNode>,
        /// Taken where `pred` is true
        on_true: Arc<IRNode>,
        /// Taken where `pred` is false
        on_false: Arc<IRNode>,
        /// Broadcast result shape
        shape: Shape,
        /// Result dtype
        dtype: DType,
    },
}

impl IRNode {
    /// Get the shape of this node's output.
    pub fn shape(&self) -> Shape {
        match self {
            IRNode::Input { shape, .. }
            | IRNode::Unary { shape, .. }
            | IRNode::Binary { shape, .. }
            | IRNode::Reduce { shape, .. }
            | IRNode::Select { shape, .. } => shape.clone(),
            IRNode::Constant { value } => value.shape().clone(),
        }
    }

    /// Get the dtype of this node's output.
    pub fn dtype(&self) -> DType {
        match self {
            IRNode::Input { dtype, .. }
            | IRNode::Unary { dtype, .. }
            | IRNode::Binary { dtype, .. }
            | IRNode::Reduce { dtype, .. }
            | IRNode::Select { dtype, .. } => *dtype,
            IRNode::Constant { value } => value.dtype(),
        }
    }

    /// Abstract value of this node's output.
    pub fn aval(&self) -> ShapedArray {
        ShapedArray::new(self.shape(), self.dtype())
    }

    /// The primitive applied by this node, if it is an operation.
    pub fn primitive(&self) -> Option<&Primitive> {
        match self {
            IRNode::Unary { op, .. } | IRNode::Binary { op, .. } | IRNode::Reduce { op, .. } => {
                Some(op)
            }
            IRNode::Select { .. } => Some(&SELECT),
            IRNode::Input { .. } | IRNode::Constant { .. } => None,
        }
    }

    /// Operand nodes, in primitive argument order.
    pub fn operands(&self) -> Vec<&Arc<IRNode>> {
        match self {
            IRNode::Input { .. } | IRNode::Constant { .. } => Vec::new(),
            IRNode::Unary { input, .. } | IRNode::Reduce { input, .. } => vec![input],
            IRNode::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            IRNode::Select { pred, on_true, on_false, .. } => vec![pred, on_true, on_false],
        }
    }

    /// Create an input node.
    pub fn input(id: usize, shape: Shape, dtype: DType) -> Arc<Self> {
        Arc::new(IRNode::Input { id, shape, dtype })
    }

    /// Create a constant node from an array.
    pub fn constant(value: Array) -> Arc<Self> {
        Arc::new(IRNode::Constant { value })
    }

    /// Create an operation node for `op` over `operands` producing `aval`.
    ///
    /// The operand count must match the primitive's arity.
    pub fn operation(op: Primitive, mut operands: Vec<Arc<IRNode>>, aval: ShapedArray) -> Arc<Self> {
        debug_assert_eq!(operands.len(), op.arity());
        let (shape, dtype) = aval.into_parts();
        let node = match operands.len() {
            3 => {
                let on_false = operands.remove(2);
                let on_true = operands.remove(1);
                let pred = operands.remove(0);
                IRNode::Select { pred, on_true, on_false, shape, dtype }
            }
            2 => {
                let rhs = operands.remove(1);
                let lhs = operands.remove(0);
                IRNode::Binary { op, lhs, rhs, shape, dtype }
            }
            _ => {
                let input = operands.remove(0);
                if op.is_reduction() {
                    IRNode::Reduce { op, input, shape, dtype }
                } else {
                    IRNode::Unary { op, input, shape, dtype }
                }
            }
        };
        Arc::new(node)
    }
}

/// A complete computation graph.
///
/// Represents a traced function as a directed acyclic graph (DAG)
/// of operations.
#[derive(Debug, Clone)]
pub struct IRGraph {
    /// Input nodes (traced arguments, in call order)
    pub inputs: Vec<Arc<IRNode>>,
    /// Output nodes (function results)
    pub outputs: Vec<Arc<IRNode>>,
    /// Human-readable name for debugging
    pub name: String,
}

impl IRGraph {
    /// Create a new IR graph.
    pub fn new(
        name: String,
        inputs: Vec<Arc<IRNode>>,
        outputs: Vec<Arc<IRNode>>,
    ) -> Self {
        Self { inputs, outputs, name }
    }

    /// Get the number of inputs.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Get the number of outputs.
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// All nodes reachable from the outputs, operands before users.
    ///
    /// Inputs come first in argument order (including unused ones), then
    /// constants and operations in first-use order. Shared nodes appear once.
    pub fn topo_order(&self) -> Vec<Arc<IRNode>> {
        let mut order: Vec<Arc<IRNode>> = self.inputs.clone();
        let mut visited: FxHashSet<*const IRNode> =
            self.inputs.iter().map(Arc::as_ptr).collect();

        for output in &self.outputs {
            // (node, operands already pushed)
            let mut stack: Vec<(&Arc<IRNode>, bool)> = vec![(output, false)];
            while let Some((node, expanded)) = stack.pop() {
                let ptr = Arc::as_ptr(node);
                if expanded {
                    if visited.insert(ptr) {
                        order.push(Arc::clone(node));
                    }
                    continue;
                }
                if visited.contains(&ptr) {
                    continue;
                }
                stack.push((node, true));
                for operand in node.operands().into_iter().rev() {
                    if !visited.contains(&Arc::as_ptr(operand)) {
                        stack.push((operand, false));
                    }
                }
            }
        }

        order
    }

    /// Number of operation nodes (equations).
    pub fn num_equations(&self) -> usize {
        self.topo_order().iter().filter(|n| n.primitive().is_some()).count()
    }
}

/// Variable names `a`..`z`, then `ba`, `bb`, ...
fn var_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'a' + (index % 26) as u8);
        index /= 26;
        if index == 0 {
            break;
        }
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Prints the graph as a let-bound listing:
///
/// ```text
/// { lambda ; a:f32[3] b:f32[]. let
///     c:f32[3] = mul a b
///   in (c) }
/// ```
///
/// Scalar constants are printed inline; other constants are bound before `;`.
impl fmt::Display for IRGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.topo_order();
        let mut names: FxHashMap<*const IRNode, String> = FxHashMap::default();
        let mut next = 0;
        let mut fresh = || {
            let name = var_name(next);
            next += 1;
            name
        };

        let mut constvars = Vec::new();
        for node in &order {
            if let IRNode::Constant { value } = node.as_ref() {
                let name = if value.is_scalar() {
                    format!("{:?}", value.as_slice()[0])
                } else {
                    let name = fresh();
                    constvars.push(format!("{}:{}", name, node.aval()));
                    name
                };
                names.insert(Arc::as_ptr(node), name);
            }
        }

        let mut invars = Vec::new();
        for node in &self.inputs {
            let name = fresh();
            invars.push(format!("{}:{}", name, node.aval()));
            names.insert(Arc::as_ptr(node), name);
        }

        writeln!(f, "{{ lambda {}; {}. let", join_prefixed(&constvars), invars.join(" "))?;
        for node in &order {
            let Some(op) = node.primitive() else { continue };
            let name = fresh();
            let args: Vec<&str> = node
                .operands()
                .into_iter()
                .map(|operand| names.get(&Arc::as_ptr(operand)).map_or("?", String::as_str))
                .collect();
            writeln!(f, "    {}:{} = {} {}", name, node.aval(), op, args.join(" "))?;
            names.insert(Arc::as_ptr(node), name);
        }

        let outs: Vec<&str> = self
            .outputs
            .iter()
            .map(|node| names.get(&Arc::as_ptr(node)).map_or("?", String::as_str))
            .collect();
        write!(f, "  in ({}) }}", outs.join(", "))
    }
}

fn join_prefixed(items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!("{} ", items.join(" "))
    }
}
