//! Tracing infrastructure for JIT compilation.
//!
//! This module provides the foundation for tracing array operations into an
//! intermediate representation (IR), compiling it, and caching the compiled
//! artifacts per call signature.

pub mod abstraction;
pub mod compile;
pub mod interpreter;
pub mod ir;
pub mod jit;
pub mod signature;
pub mod tracer;
pub mod value;

pub use abstraction::{AbstractionLevel, ShapedArray};
pub use compile::{Backend, CompileOptions, Executable, InterpreterBackend, Program};
pub use interpreter::Interpreter;
pub use ir::{IRGraph, IRNode, Primitive};
pub use jit::{jit, CacheStats, JitBuilder, JitFunction, TraceEvent, TraceHook};
pub use signature::{AbstractKey, ArgKey, FunctionId, Signature, StaticKey};
pub use tracer::{current_trace, is_tracing, record_equation, with_trace, TraceContext};
pub use value::{Tracer, Value};
