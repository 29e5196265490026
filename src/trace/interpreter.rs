//! CPU interpreter for compiled programs.

use crate::ops;
use crate::trace::compile::{Instr, Program};
use crate::{Array, JitError, Result};

/// Executes a [`Program`] on the CPU, one register per instruction.
#[derive(Debug, Default)]
pub struct Interpreter {
    registers: Vec<Array>,
}

impl Interpreter {
    /// Create a new interpreter.
    pub fn new() -> Self {
        Self { registers: Vec::new() }
    }

    /// Execute a program with the given inputs.
    ///
    /// Inputs are checked against the program's expected dtypes (and shapes,
    /// when it was traced at a level that exposes them).
    pub fn execute(&mut self, program: &Program, inputs: &[Array]) -> Result<Vec<Array>> {
        if inputs.len() != program.inputs.len() {
            return Err(JitError::ArgumentCount {
                expected: program.inputs.len(),
                got: inputs.len(),
            });
        }
        for (index, (spec, input)) in program.inputs.iter().zip(inputs).enumerate() {
            let shape_ok = spec.shape.as_ref().map_or(true, |shape| shape == input.shape());
            if !shape_ok || spec.dtype != input.dtype() {
                return Err(JitError::InputMismatch {
                    index,
                    expected: spec.describe(),
                    got: input.aval().to_string(),
                });
            }
        }

        self.registers.clear();
        self.registers.reserve(program.instrs.len());

        for instr in &program.instrs {
            let value = match instr {
                Instr::Input(index) => inputs[*index].clone(),
                Instr::Constant(value) => value.clone(),
                Instr::Apply { op, args } => {
                    let operands: Vec<&Array> = args.iter().map(|&r| &self.registers[r]).collect();
                    ops::evaluate(op, &operands)?
                }
            };
            self.registers.push(value);
        }

        Ok(program.outputs.iter().map(|&r| self.registers[r].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{AbstractionLevel, CompileOptions, IRGraph, IRNode, Primitive, ShapedArray};
    use crate::{DType, Shape};

    fn compile(graph: &IRGraph, level: AbstractionLevel) -> Program {
        Program::from_graph(graph, CompileOptions { level })
    }

    fn f32_aval(dims: Vec<usize>) -> ShapedArray {
        ShapedArray::new(Shape::new(dims), DType::Float32)
    }

    #[test]
    fn test_interpreter_unary() {
        let input = IRNode::input(0, Shape::new(vec![3]), DType::Float32);
        let neg = IRNode::operation(Primitive::Neg, vec![input.clone()], f32_aval(vec![3]));
        let graph = IRGraph::new("test_neg".to_string(), vec![input], vec![neg]);

        let input_data = Array::from_vec(vec![1.0, -2.0, 3.0], Shape::new(vec![3]));
        let outputs = Interpreter::new()
            .execute(&compile(&graph, AbstractionLevel::Shaped), &[input_data])
            .unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].to_vec(), vec![-1.0, 2.0, -3.0]);
    }

    #[test]
    fn test_interpreter_complex() {
        // mul(add(input0, input1), input0)
        let input0 = IRNode::input(0, Shape::new(vec![3]), DType::Float32);
        let input1 = IRNode::input(1, Shape::new(vec![3]), DType::Float32);
        let add = IRNode::operation(
            Primitive::Add,
            vec![input0.clone(), input1.clone()],
            f32_aval(vec![3]),
        );
        let mul = IRNode::operation(Primitive::Mul, vec![add, input0.clone()], f32_aval(vec![3]));
        let graph = IRGraph::new("test_complex".to_string(), vec![input0, input1], vec![mul]);

        let a = Array::from_vec(vec![1.0, 2.0, 3.0], Shape::new(vec![3]));
        let b = Array::from_vec(vec![3.0, 2.0, 1.0], Shape::new(vec![3]));
        let outputs = Interpreter::new()
            .execute(&compile(&graph, AbstractionLevel::Shaped), &[a, b])
            .unwrap();

        assert_eq!(outputs[0].to_vec(), vec![4.0, 8.0, 12.0]);
    }

    #[test]
    fn test_interpreter_constant_and_reduce() {
        let input = IRNode::input(0, Shape::new(vec![2]), DType::Float32);
        let five = IRNode::constant(Array::scalar(5.0));
        let add = IRNode::operation(Primitive::Add, vec![input.clone(), five], f32_aval(vec![2]));
        let sum = IRNode::operation(Primitive::SumAll, vec![add], f32_aval(vec![]));
        let graph = IRGraph::new("test_const".to_string(), vec![input], vec![sum]);

        let input_data = Array::from_vec(vec![1.0, 2.0], Shape::new(vec![2]));
        let outputs = Interpreter::new()
            .execute(&compile(&graph, AbstractionLevel::Shaped), &[input_data])
            .unwrap();
        assert_eq!(outputs[0].to_vec(), vec![13.0]);
    }

    #[test]
    fn test_interpreter_rejects_mismatched_input() {
        let input = IRNode::input(0, Shape::new(vec![2]), DType::Float32);
        let graph = IRGraph::new("id".to_string(), vec![input.clone()], vec![input]);
        let program = compile(&graph, AbstractionLevel::Shaped);

        let wrong_shape = Array::zeros(Shape::new(vec![3]), DType::Float32);
        let err = Interpreter::new().execute(&program, &[wrong_shape]).unwrap_err();
        assert!(matches!(err, JitError::InputMismatch { index: 0, .. }));

        let wrong_dtype = Array::zeros(Shape::new(vec![2]), DType::Int32);
        assert!(Interpreter::new().execute(&program, &[wrong_dtype]).is_err());

        assert!(matches!(
            Interpreter::new().execute(&program, &[]),
            Err(JitError::ArgumentCount { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_unshaped_program_accepts_any_shape() {
        let input = IRNode::input(0, Shape::new(vec![2]), DType::Float32);
        let neg = IRNode::operation(Primitive::Neg, vec![input.clone()], f32_aval(vec![2]));
        let graph = IRGraph::new("neg".to_string(), vec![input], vec![neg]);
        let program = compile(&graph, AbstractionLevel::Unshaped);

        let x = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0], Shape::new(vec![4]));
        let out = Interpreter::new().execute(&program, &[x]).unwrap();
        assert_eq!(out[0].to_vec(), vec![-1.0, -2.0, -3.0, -4.0]);
    }
}
