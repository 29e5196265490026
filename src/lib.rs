//! # tracejit: trace-and-compile function caching
//!
//! Wraps array functions so that each distinct call signature is traced
//! once into an IR graph, compiled, and cached. Later calls with a matching
//! signature run the compiled artifact without re-running the function body.
//!
//! ## Key Features
//!
//! - **Traced and static arguments**: traced arguments become placeholders
//!   keyed by shape and dtype; static arguments are keyed by value
//! - **Abstraction levels**: `Unshaped`, `Shaped` (default) and `Concrete`
//!   control how much of a traced argument the body may inspect
//! - **Clear failures**: branching on a placeholder raises
//!   [`JitError::AbstractValue`], with `select` and static arguments as remedies
//! - **Pluggable backends**: compiled artifacts come from a [`trace::Backend`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tracejit::{jit, Array, Shape, Value};
//!
//! // f(x) = x if x > 0 else 2x, without branching on the traced argument
//! let f = jit("f", 1, |args: &[Value]| {
//!     let x = &args[0];
//!     let positive = x.gt(&Value::scalar(0.0))?;
//!     Ok(vec![Value::select(&positive, x, &x.mul(&Value::scalar(2.0))?)?])
//! });
//!
//! let out = f.call(&[Array::scalar(-5.0)]).unwrap();
//! assert_eq!(out[0].item(), Some(-10.0));
//!
//! // Same shape and dtype: served from the cache
//! let x = Array::from_vec(vec![1.0, -1.0], Shape::new(vec![2]));
//! f.call(&[x.clone()]).unwrap();
//! f.call(&[x]).unwrap();
//! assert_eq!(f.stats().traces, 2);
//! assert_eq!(f.cache_size(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod array;
pub mod config;
mod dtype;
mod error;
mod ops;
mod shape;
pub mod trace;

// Public exports
pub use array::Array;
pub use config::{config, set_config, with_jit_disabled, Config};
pub use dtype::DType;
pub use error::{JitError, Result};
pub use shape::Shape;
pub use trace::{jit, AbstractionLevel, CacheStats, JitBuilder, JitFunction, Value};
