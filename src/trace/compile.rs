//! Compilation of IR graphs into executable artifacts.
//!
//! A [`Backend`] turns a traced [`IRGraph`] into an opaque [`Executable`].
//! The bundled [`InterpreterBackend`] linearizes the graph into a
//! register program that the [`Interpreter`](crate::trace::Interpreter)
//! runs on the CPU.

use crate::trace::{AbstractionLevel, IRGraph, IRNode, Interpreter, Primitive, ShapedArray};
use crate::{Array, DType, Result, Shape};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Options passed to a backend for one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Abstraction level the graph was traced at.
    ///
    /// Artifacts check input shapes only when the level exposes them; an
    /// `Unshaped` artifact is reused across shapes.
    pub level: AbstractionLevel,
}

/// A compiled, immutable artifact for one signature.
pub trait Executable: Send + Sync + fmt::Debug {
    /// Name of the compiled function.
    fn name(&self) -> &str;

    /// Run the artifact on the traced arguments, in call order.
    fn execute(&self, inputs: &[Array]) -> Result<Vec<Array>>;
}

/// A compilation backend. Must be deterministic for a given graph.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Compile `graph` into an executable artifact.
    fn compile(&self, graph: &IRGraph, options: CompileOptions) -> Result<Arc<dyn Executable>>;
}

/// Expected input of a compiled program.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InputSpec {
    pub(crate) shape: Option<Shape>,
    pub(crate) dtype: DType,
}

impl InputSpec {
    pub(crate) fn describe(&self) -> String {
        match &self.shape {
            Some(shape) => ShapedArray::new(shape.clone(), self.dtype).to_string(),
            None => format!("{}[?]", self.dtype),
        }
    }
}

/// One instruction; its result lands in the register with the same index.
#[derive(Debug, Clone)]
pub(crate) enum Instr {
    /// Copy traced argument `n`
    Input(usize),
    /// Materialize a constant captured at trace time
    Constant(Array),
    /// Apply a primitive to earlier registers
    Apply { op: Primitive, args: Vec<usize> },
}

/// A linearized IR graph.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) name: String,
    pub(crate) inputs: Vec<InputSpec>,
    pub(crate) instrs: Vec<Instr>,
    pub(crate) outputs: Vec<usize>,
}

impl Program {
    /// Linearize `graph` in topological order, one register per node.
    pub fn from_graph(graph: &IRGraph, options: CompileOptions) -> Program {
        let mut registers: FxHashMap<*const IRNode, usize> = FxHashMap::default();
        let mut instrs = Vec::new();
        let mut inputs = Vec::with_capacity(graph.num_inputs());

        for node in graph.topo_order() {
            let instr = match node.as_ref() {
                IRNode::Input { id, shape, dtype } => {
                    inputs.push(InputSpec {
                        shape: options.level.exposes_shape().then(|| shape.clone()),
                        dtype: *dtype,
                    });
                    Instr::Input(*id)
                }
                IRNode::Constant { value } => Instr::Constant(value.clone()),
                op_node => {
                    let Some(op) = op_node.primitive() else { continue };
                    let args = op_node
                        .operands()
                        .into_iter()
                        .map(|operand| registers[&Arc::as_ptr(operand)])
                        .collect();
                    Instr::Apply { op: op.clone(), args }
                }
            };
            registers.insert(Arc::as_ptr(&node), instrs.len());
            instrs.push(instr);
        }

        let outputs = graph.outputs.iter().map(|node| registers[&Arc::as_ptr(node)]).collect();

        Program { name: graph.name.clone(), inputs, instrs, outputs }
    }

    /// Number of instructions (registers).
    pub fn num_instructions(&self) -> usize {
        self.instrs.len()
    }

    /// Number of primitive applications.
    pub fn num_operations(&self) -> usize {
        self.instrs.iter().filter(|i| matches!(i, Instr::Apply { .. })).count()
    }

    /// Number of traced inputs the program expects.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Executable for Program {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, inputs: &[Array]) -> Result<Vec<Array>> {
        Interpreter::new().execute(self, inputs)
    }
}

/// Compiles graphs into interpreted register programs.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpreterBackend;

impl Backend for InterpreterBackend {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn compile(&self, graph: &IRGraph, options: CompileOptions) -> Result<Arc<dyn Executable>> {
        let program = Program::from_graph(graph, options);
        log::debug!(
            "[{}] compiled {} into {} instructions ({} operations)",
            self.name(),
            program.name,
            program.num_instructions(),
            program.num_operations()
        );
        Ok(Arc::new(program))
    }
}
