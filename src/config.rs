//! Process-wide configuration.
//!
//! Read once from the environment on first use:
//!
//! - `TRACEJIT_DISABLE_JIT=1`: run wrapped functions eagerly, without tracing
//!   or caching.
//! - `TRACEJIT_LOG_COMPILES=1`: log every trace and compile at `info` level
//!   instead of `debug`.
//! - `TRACEJIT_ABSTRACTION=unshaped|shaped|concrete`: default abstraction
//!   level for wrappers that don't set one.
//!
//! [`with_jit_disabled`] overrides `disable_jit` for the current thread only.

use crate::trace::AbstractionLevel;
use std::cell::Cell;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Run wrapped functions eagerly.
    pub disable_jit: bool,
    /// Log traces and compiles at `info` level.
    pub log_compiles: bool,
    /// Abstraction level used when a wrapper doesn't choose one.
    pub default_abstraction: AbstractionLevel,
}

impl Config {
    /// Configuration from the `TRACEJIT_*` environment variables.
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            std::env::var(name).is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
        };
        let default_abstraction = match std::env::var("TRACEJIT_ABSTRACTION") {
            Ok(value) => value.parse().unwrap_or_else(|err| {
                log::warn!("ignoring TRACEJIT_ABSTRACTION: {}", err);
                AbstractionLevel::default()
            }),
            Err(_) => AbstractionLevel::default(),
        };
        Self {
            disable_jit: flag("TRACEJIT_DISABLE_JIT"),
            log_compiles: flag("TRACEJIT_LOG_COMPILES"),
            default_abstraction,
        }
    }
}

static CONFIG: LazyLock<RwLock<Config>> = LazyLock::new(|| RwLock::new(Config::from_env()));

thread_local! {
    static DISABLE_JIT_OVERRIDE: Cell<Option<bool>> = const { Cell::new(None) };
}

/// Current configuration, with thread-local overrides applied.
pub fn config() -> Config {
    let mut config = *CONFIG.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(disabled) = DISABLE_JIT_OVERRIDE.with(Cell::get) {
        config.disable_jit = disabled;
    }
    config
}

/// Replace the process-wide configuration.
pub fn set_config(config: Config) {
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = config;
}

/// Run `f` with jit disabled on this thread.
///
/// Wrapped functions called inside `f` run their body eagerly on concrete
/// values every time; nothing is traced, compiled or cached.
pub fn with_jit_disabled<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    struct Restore(Option<bool>);
    impl Drop for Restore {
        fn drop(&mut self) {
            DISABLE_JIT_OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let _restore = Restore(DISABLE_JIT_OVERRIDE.with(|cell| cell.replace(Some(true))));
    f()
}
