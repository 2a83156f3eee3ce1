//! Bounded-concurrency enforcement around command execution.
//!
//! Two strategies are provided. Thread-pool isolation runs the primary
//! action on a dedicated worker thread, so a stalled dependency occupies one
//! worker slot instead of the caller's thread. Semaphore isolation only
//! counts concurrency: the caller thread runs the action after winning a
//! permit. Both acquire immediately or reject; neither ever queues a caller.

pub mod semaphore;
pub mod thread_pool;

pub use semaphore::{ExecutionSemaphore, SemaphorePermit};
pub use thread_pool::{CommandThreadPool, PoolStats};

use std::sync::Arc;

use tracing::warn;

use crate::config::IsolationConfig;
use crate::core::error::ConfigError;

/// A per-key isolation strategy instance.
///
/// Exactly one instance exists per `(group_key, command_key)` within a
/// registry, shared by every command issued for that logical operation.
#[derive(Debug)]
pub enum IsolationStrategy {
    /// Dedicated worker pool; rejection when all workers and queue slots are
    /// busy.
    ThreadPool(CommandThreadPool),
    /// Counting permit set; rejection when no permit is available.
    Semaphore(Arc<ExecutionSemaphore>),
}

impl IsolationStrategy {
    /// Build a strategy instance from a validated configuration.
    ///
    /// `key` identifies the guarded operation in logs and thread names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails
    /// validation.
    pub(crate) fn from_config(key: &str, config: &IsolationConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;

        match config {
            IsolationConfig::ThreadPool {
                pool_size,
                queue_capacity,
                ..
            } => Ok(Self::ThreadPool(CommandThreadPool::new(
                key,
                *pool_size,
                *queue_capacity,
            ))),
            IsolationConfig::Semaphore {
                max_concurrent,
                timeout,
                timeout_enabled,
            } => {
                if *timeout_enabled && timeout.is_some() {
                    warn!(
                        key = key,
                        "semaphore isolation runs on the caller thread, timeout settings are ignored"
                    );
                }
                Ok(Self::Semaphore(Arc::new(ExecutionSemaphore::new(
                    *max_concurrent,
                ))))
            }
        }
    }

    /// Concurrency slots currently claimed for this key.
    #[must_use]
    pub fn in_flight(&self) -> u32 {
        match self {
            Self::ThreadPool(pool) => pool.in_flight(),
            Self::Semaphore(semaphore) => semaphore.in_use(),
        }
    }
}
