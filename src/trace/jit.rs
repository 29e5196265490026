//! JIT compilation infrastructure.
//!
//! Provides [`jit`] and [`JitBuilder`], which wrap a function into a
//! [`JitFunction`] that traces and caches compiled versions of it, one per
//! call [`Signature`].
//!
//! Call protocol:
//!
//! 1. Arguments are split into traced and static positions (fixed when the
//!    wrapper is built).
//! 2. The signature is computed from the traced arguments' abstract keys and
//!    the static arguments' values.
//! 3. On a cache hit the compiled artifact runs; the function body does not.
//! 4. On a miss the body runs once on tracers, the recorded graph is
//!    compiled and cached, and the artifact runs.
//!
//! Side effects of the body therefore happen once per distinct signature,
//! at trace time. [`JitBuilder::on_trace`] exposes that moment explicitly.

use crate::config::config;
use crate::trace::{
    with_trace, AbstractKey, AbstractionLevel, ArgKey, Backend, CompileOptions, Executable,
    FunctionId, IRGraph, IRNode, InterpreterBackend, Signature, StaticKey, TraceContext, Tracer,
    Value,
};
use crate::{Array, JitError, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// Global counter for wrapper identities.
static FUNCTION_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a trace hook sees: one successful trace, before compilation.
#[derive(Debug)]
pub struct TraceEvent<'a> {
    /// Name of the wrapped function
    pub function: &'a str,
    /// Signature being traced
    pub signature: &'a Signature,
    /// Recorded graph
    pub graph: &'a IRGraph,
}

/// Callback invoked once per successful trace.
pub type TraceHook = Arc<dyn Fn(&TraceEvent<'_>) + Send + Sync>;

/// Counters for one wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls served by a cached artifact
    pub hits: usize,
    /// Calls that found no artifact for their signature
    pub misses: usize,
    /// Times the function body ran under tracing (including failed traces)
    pub traces: usize,
    /// Artifacts compiled
    pub compiles: usize,
    /// Calls inlined into an enclosing trace
    pub inlined: usize,
    /// Calls run eagerly because jit was disabled
    pub eager: usize,
}

/// Cache entry for one signature. The mutex serializes tracing per signature.
#[derive(Debug, Default)]
struct CacheSlot {
    executable: Mutex<Option<Arc<dyn Executable>>>,
}

impl CacheSlot {
    /// Filled and not being traced right now.
    fn is_filled(&self) -> bool {
        match self.executable.try_lock() {
            Ok(guard) => guard.is_some(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.get_ref().is_some(),
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// Empty and not being traced right now.
    fn is_vacant(&self) -> bool {
        match self.executable.try_lock() {
            Ok(guard) => guard.is_none(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.get_ref().is_none(),
            Err(TryLockError::WouldBlock) => false,
        }
    }
}

/// Builder for [`JitFunction`] with static arguments, abstraction level,
/// backend and trace hook.
///
/// ```
/// use tracejit::{Array, JitBuilder, Value};
///
/// // g(x, n): count i up to the static n, return x + i
/// let g = JitBuilder::new("g", 2)
///     .static_argnums([1])
///     .build(|args: &[Value]| {
///         let n = &args[1];
///         let mut i = 0.0;
///         while Value::scalar(i).lt(n)?.to_bool()? {
///             i += 1.0;
///         }
///         Ok(vec![args[0].add(&Value::scalar(i))?])
///     })
///     .unwrap();
///
/// let out = g.call(&[Array::scalar(10.0), Array::scalar(20.0)]).unwrap();
/// assert_eq!(out[0].item(), Some(30.0));
/// ```
pub struct JitBuilder {
    name: String,
    num_args: usize,
    static_argnums: Vec<usize>,
    level: Option<AbstractionLevel>,
    backend: Option<Arc<dyn Backend>>,
    on_trace: Option<TraceHook>,
}

impl JitBuilder {
    /// Start building a wrapper for a function of `num_args` parameters.
    pub fn new(name: &str, num_args: usize) -> Self {
        Self {
            name: name.to_string(),
            num_args,
            static_argnums: Vec::new(),
            level: None,
            backend: None,
            on_trace: None,
        }
    }

    /// Mark parameter positions as static.
    pub fn static_argnums(mut self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.static_argnums.extend(positions);
        self
    }

    /// Abstraction level of the placeholders for traced arguments.
    pub fn abstraction(mut self, level: AbstractionLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Compilation backend (defaults to [`InterpreterBackend`]).
    pub fn backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Callback run once per successful trace, before compilation.
    pub fn on_trace(mut self, hook: impl Fn(&TraceEvent<'_>) + Send + Sync + 'static) -> Self {
        self.on_trace = Some(Arc::new(hook));
        self
    }

    /// Build the wrapper.
    ///
    /// Fails with [`JitError::InvalidStaticArgument`] if a static position
    /// is not a parameter index.
    pub fn build<F>(self, function: F) -> Result<JitFunction<F>>
    where
        F: Fn(&[Value]) -> Result<Vec<Value>>,
    {
        if let Some(&position) = self.static_argnums.iter().find(|&&p| p >= self.num_args) {
            return Err(JitError::InvalidStaticArgument { position, num_args: self.num_args });
        }

        Ok(JitFunction::new(self, function))
    }
}

/// A traced and compiled function.
///
/// Returned by [`jit`] and [`JitBuilder::build`]. Each instance owns an
/// independent cache; the cache is unbounded and only emptied by
/// [`JitFunction::clear_cache`] or by dropping the wrapper.
pub struct JitFunction<F> {
    function: F,
    name: String,
    id: FunctionId,
    num_args: usize,
    static_argnums: BTreeSet<usize>,
    level: AbstractionLevel,
    backend: Arc<dyn Backend>,
    on_trace: Option<TraceHook>,
    cache: Mutex<FxHashMap<Signature, Arc<CacheSlot>>>,
    stats: Mutex<CacheStats>,
}

impl<F> JitFunction<F>
where
    F: Fn(&[Value]) -> Result<Vec<Value>>,
{
    /// Execute the function on concrete arrays, using a cached compilation
    /// when one exists for the call's signature.
    pub fn call(&self, args: &[Array]) -> Result<Vec<Array>> {
        self.check_arity(args.len())?;
        if config().disable_jit {
            return self.call_eager(args);
        }

        let signature = self.signature(args)?;
        let slot = self.slot(&signature);

        let mut compiled = lock(&slot.executable);
        let cached = compiled.clone();
        let executable = match cached {
            Some(executable) => {
                self.record(|s| s.hits += 1);
                log::trace!("[JIT] {} cache hit for {}", self.name, signature);
                executable
            }
            None => {
                self.record(|s| s.misses += 1);
                match self.trace_and_compile(&signature, args) {
                    Ok(executable) => {
                        *compiled = Some(Arc::clone(&executable));
                        executable
                    }
                    Err(err) => {
                        drop(compiled);
                        self.discard_vacant(&signature, &slot);
                        log::debug!("[JIT] {} failed to trace {}: {}", self.name, signature, err);
                        return Err(err);
                    }
                }
            }
        };
        drop(compiled);

        executable.execute(&self.traced_args(args))
    }

    /// Apply the function to values.
    ///
    /// With concrete arguments this is [`JitFunction::call`]. When a traced
    /// position holds a tracer of an enclosing trace, the function is
    /// inlined into that trace instead; its placeholders then run at the
    /// stricter of the enclosing level and this wrapper's level.
    pub fn apply(&self, args: &[Value]) -> Result<Vec<Value>> {
        self.check_arity(args.len())?;

        let nested = args.iter().enumerate().any(|(i, v)| !self.is_static(i) && !v.is_concrete());
        if nested {
            return self.inline(args);
        }

        let arrays = args.iter().map(Value::concrete).collect::<Result<Vec<_>>>()?;
        Ok(self.call(&arrays)?.into_iter().map(Value::Concrete).collect())
    }

    /// Trace the function for `args` and return the graph, without
    /// compiling or caching. The body runs (side effects included).
    pub fn lower(&self, args: &[Array]) -> Result<IRGraph> {
        self.check_arity(args.len())?;
        self.trace(args)
    }

    /// Signature a call with `args` would be cached under.
    pub fn signature(&self, args: &[Array]) -> Result<Signature> {
        self.check_arity(args.len())?;
        let keys = args
            .iter()
            .enumerate()
            .map(|(i, array)| {
                if self.is_static(i) {
                    ArgKey::Static(StaticKey::new(array))
                } else {
                    ArgKey::Traced(AbstractKey::new(array, self.level))
                }
            })
            .collect();
        Ok(Signature::new(self.id, keys))
    }

    fn trace_and_compile(
        &self,
        signature: &Signature,
        args: &[Array],
    ) -> Result<Arc<dyn Executable>> {
        let graph = self.trace(args)?;

        if let Some(hook) = &self.on_trace {
            hook(&TraceEvent { function: &self.name, signature, graph: &graph });
        }

        let executable =
            self.backend.compile(&graph, CompileOptions { level: self.level })?;
        self.record(|s| s.compiles += 1);

        let level = if config().log_compiles { log::Level::Info } else { log::Level::Debug };
        log::log!(
            level,
            "[JIT] compiled {} for {} with {} backend",
            self.name,
            signature,
            self.backend.name()
        );
        Ok(executable)
    }

    /// Run the body once on placeholders and record its graph.
    fn trace(&self, args: &[Array]) -> Result<IRGraph> {
        self.record(|s| s.traces += 1);

        let mut ctx = TraceContext::new(self.name.clone(), self.level);
        let trace_id = ctx.id();
        let values: Vec<Value> = args
            .iter()
            .enumerate()
            .map(|(i, array)| {
                if self.is_static(i) {
                    Value::Concrete(array.clone())
                } else {
                    let node = ctx.register_input(array.shape().clone(), array.dtype());
                    Value::Abstract(Tracer::new(node, self.level, Some(array.clone()), trace_id))
                }
            })
            .collect();

        let (result, ctx) = with_trace(ctx, || (self.function)(&values));
        let outputs = result?;

        let nodes = outputs
            .into_iter()
            .map(|value| match value {
                Value::Abstract(tracer) if tracer.trace_id() == trace_id => Ok(tracer.node().clone()),
                Value::Abstract(tracer) => {
                    Err(JitError::EscapedTracer { trace_id: tracer.trace_id() })
                }
                Value::Concrete(array) => Ok(IRNode::constant(array)),
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "[JIT] traced {} ({} equations, level {})",
            self.name,
            ctx.num_equations(),
            ctx.level()
        );
        Ok(ctx.finalize(nodes))
    }

    fn inline(&self, args: &[Value]) -> Result<Vec<Value>> {
        let values = args
            .iter()
            .enumerate()
            .map(|(i, value)| match value {
                _ if self.is_static(i) => value.concrete().map(Value::Concrete),
                Value::Abstract(tracer) => Ok(Value::Abstract(tracer.restrict(self.level))),
                Value::Concrete(_) => Ok(value.clone()),
            })
            .collect::<Result<Vec<_>>>()?;

        self.record(|s| s.inlined += 1);
        log::trace!("[JIT] inlining {} into enclosing trace", self.name);
        (self.function)(&values)
    }

    fn call_eager(&self, args: &[Array]) -> Result<Vec<Array>> {
        self.record(|s| s.eager += 1);
        let values: Vec<Value> = args.iter().cloned().map(Value::Concrete).collect();
        (self.function)(&values)?.iter().map(Value::concrete).collect()
    }
}

impl<F> JitFunction<F> {
    /// Wrapper with a fresh identity and an empty cache. Unset builder
    /// options take the configured defaults.
    fn new(builder: JitBuilder, function: F) -> Self {
        Self {
            function,
            name: builder.name,
            id: FunctionId(FUNCTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)),
            num_args: builder.num_args,
            static_argnums: builder.static_argnums.into_iter().collect(),
            level: builder.level.unwrap_or_else(|| config().default_abstraction),
            backend: builder.backend.unwrap_or_else(|| Arc::new(InterpreterBackend)),
            on_trace: builder.on_trace,
            cache: Mutex::new(FxHashMap::default()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Name for debugging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity used in signatures.
    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// Declared number of parameters.
    pub fn num_args(&self) -> usize {
        self.num_args
    }

    /// Static parameter positions, ascending.
    pub fn static_argnums(&self) -> Vec<usize> {
        self.static_argnums.iter().copied().collect()
    }

    /// Abstraction level of traced arguments.
    pub fn abstraction(&self) -> AbstractionLevel {
        self.level
    }

    /// Number of compiled artifacts in the cache.
    pub fn cache_size(&self) -> usize {
        lock(&self.cache).values().filter(|slot| slot.is_filled()).count()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        *lock(&self.stats)
    }

    /// Drop every compiled artifact. The next call of each signature retraces.
    pub fn clear_cache(&self) {
        let mut cache = lock(&self.cache);
        log::debug!("[JIT] clearing {} cache entries of {}", cache.len(), self.name);
        cache.clear();
    }

    fn is_static(&self, position: usize) -> bool {
        self.static_argnums.contains(&position)
    }

    fn check_arity(&self, got: usize) -> Result<()> {
        if got != self.num_args {
            return Err(JitError::ArgumentCount { expected: self.num_args, got });
        }
        Ok(())
    }

    fn traced_args(&self, args: &[Array]) -> Vec<Array> {
        args.iter()
            .enumerate()
            .filter(|(i, _)| !self.is_static(*i))
            .map(|(_, array)| array.clone())
            .collect()
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut lock(&self.stats));
    }

    fn slot(&self, signature: &Signature) -> Arc<CacheSlot> {
        let mut cache = lock(&self.cache);
        Arc::clone(cache.entry(signature.clone()).or_default())
    }

    /// Remove the slot for `signature` if it is still `slot` and empty.
    fn discard_vacant(&self, signature: &Signature, slot: &Arc<CacheSlot>) {
        let mut cache = lock(&self.cache);
        let vacant = cache
            .get(signature)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.is_vacant());
        if vacant {
            cache.remove(signature);
        }
    }
}

impl<F> fmt::Debug for JitFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitFunction")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("num_args", &self.num_args)
            .field("static_argnums", &self.static_argnums)
            .field("level", &self.level)
            .field("backend", &self.backend.name())
            .field("stats", &self.stats())
            .finish()
    }
}

/// JIT-compile a function whose arguments are all traced.
///
/// The function is traced on the first call with given input shapes and
/// dtypes, compiled, and cached.
///
/// # Examples
///
/// ```
/// use tracejit::{jit, Array, Shape, Value};
///
/// let f = jit("add_mul", 2, |args: &[Value]| {
///     Ok(vec![args[0].add(&args[1])?.mul(&args[0])?])
/// });
///
/// let a = Array::from_vec(vec![1.0, 2.0], Shape::new(vec![2]));
/// let b = Array::from_vec(vec![3.0, 4.0], Shape::new(vec![2]));
/// let out = f.call(&[a, b]).unwrap();
/// assert_eq!(out[0].to_vec(), vec![4.0, 12.0]);
/// ```
pub fn jit<F>(name: &str, num_args: usize, function: F) -> JitFunction<F>
where
    F: Fn(&[Value]) -> Result<Vec<Value>>,
{
    JitFunction::new(JitBuilder::new(name, num_args), function)
}
