//! Tracing infrastructure for capturing operations.
//!
//! A [`TraceContext`] owns the input nodes of one trace. While the traced
//! function runs, a frame for the trace sits on a thread-local stack; every
//! primitive applied to a tracer is checked against the innermost frame and
//! counted there. Tracers from a finished trace, or from an enclosing trace
//! while an inner one is active, are rejected as escaped.

use crate::trace::{AbstractionLevel, IRGraph, IRNode};
use crate::{DType, JitError, Result, Shape};
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Global counter for trace identifiers.
static TRACE_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug)]
struct TraceFrame {
    id: usize,
    equations: usize,
}

thread_local! {
    /// Active traces on this thread, innermost last.
    static TRACE_STACK: RefCell<Vec<TraceFrame>> = const { RefCell::new(Vec::new()) };
}

/// Context for one trace.
///
/// Holds the placeholder input nodes and, after the traced function ran,
/// the number of primitives it recorded.
#[derive(Debug)]
pub struct TraceContext {
    id: usize,
    name: String,
    level: AbstractionLevel,
    inputs: Vec<Arc<IRNode>>,
    num_equations: usize,
}

impl TraceContext {
    /// Create a new trace context with a fresh identifier.
    pub fn new(name: String, level: AbstractionLevel) -> Self {
        Self {
            id: TRACE_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            name,
            level,
            inputs: Vec::new(),
            num_equations: 0,
        }
    }

    /// Identifier stamped on every tracer of this trace.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Abstraction level of the placeholders.
    pub fn level(&self) -> AbstractionLevel {
        self.level
    }

    /// Number of primitives recorded while the traced function ran.
    pub fn num_equations(&self) -> usize {
        self.num_equations
    }

    /// Register the next traced argument and return its input node.
    pub fn register_input(&mut self, shape: Shape, dtype: DType) -> Arc<IRNode> {
        let node = IRNode::input(self.inputs.len(), shape, dtype);
        self.inputs.push(node.clone());
        node
    }

    /// Finalize the trace and return the IR graph.
    pub fn finalize(self, outputs: Vec<Arc<IRNode>>) -> IRGraph {
        IRGraph::new(self.name, self.inputs, outputs)
    }
}

/// Check if we're currently tracing on this thread.
pub fn is_tracing() -> bool {
    TRACE_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Identifier of the innermost active trace, if any.
pub fn current_trace() -> Option<usize> {
    TRACE_STACK.with(|stack| stack.borrow().last().map(|frame| frame.id))
}

/// Record one primitive on the trace `trace_id`.
///
/// Fails with [`JitError::EscapedTracer`] unless `trace_id` is the
/// innermost active trace.
pub fn record_equation(trace_id: usize) -> Result<()> {
    TRACE_STACK.with(|stack| match stack.borrow_mut().last_mut() {
        Some(frame) if frame.id == trace_id => {
            frame.equations += 1;
            Ok(())
        }
        _ => Err(JitError::EscapedTracer { trace_id }),
    })
}

/// Pops the frame on drop, so a panicking traced function leaves the stack balanced.
struct FrameGuard {
    id: usize,
}

impl FrameGuard {
    fn enter(id: usize) -> Self {
        TRACE_STACK.with(|stack| stack.borrow_mut().push(TraceFrame { id, equations: 0 }));
        Self { id }
    }

    fn equations(&self) -> usize {
        TRACE_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|frame| frame.id == self.id)
                .map_or(0, |frame| frame.equations)
        })
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        TRACE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|frame| frame.id == self.id) {
                stack.truncate(pos);
            }
        });
    }
}

/// Execute a function with tracing enabled for `ctx`.
pub fn with_trace<F, R>(mut ctx: TraceContext, f: F) -> (R, TraceContext)
where
    F: FnOnce() -> R,
{
    let guard = FrameGuard::enter(ctx.id);
    let result = f();
    ctx.num_equations = guard.equations();
    drop(guard);
    (result, ctx)
}
