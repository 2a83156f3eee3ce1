//! Command isolation configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout applied to thread-pool commands when none is configured.
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 1000;

/// Default number of semaphore permits when none is configured.
pub const DEFAULT_MAX_CONCURRENT: u32 = 10;

/// Isolation mechanism selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationStrategyKind {
    /// Dedicated worker pool; the primary action runs on a worker thread.
    ThreadPool,
    /// Counting permit set; the primary action runs on the caller thread.
    Semaphore,
}

/// Flat configuration surface for a command key.
///
/// These are the recognized options supplied at key registration time; the
/// resolved policy is immutable for the lifetime of that key's isolation
/// strategy instance. Convert to the typed model with
/// [`CommandConfig::into_isolation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Which isolation mechanism guards the key.
    #[serde(default = "default_strategy")]
    pub isolation_strategy: IsolationStrategyKind,
    /// Worker pool size (thread-pool isolation only).
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Queued submissions accepted beyond busy workers. Zero means a
    /// submission is rejected unless a worker slot is free.
    #[serde(default)]
    pub queue_capacity: usize,
    /// Maximum concurrent executions (semaphore isolation only).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,
    /// Whether the execution timeout is enforced.
    #[serde(default = "default_timeout_enabled")]
    pub timeout_enabled: bool,
    /// Execution timeout in milliseconds.
    #[serde(default = "default_timeout_millis")]
    pub timeout_millis: u64,
}

fn default_strategy() -> IsolationStrategyKind {
    IsolationStrategyKind::ThreadPool
}

fn default_pool_size() -> usize {
    num_cpus::get()
}

const fn default_max_concurrent() -> u32 {
    DEFAULT_MAX_CONCURRENT
}

const fn default_timeout_enabled() -> bool {
    true
}

const fn default_timeout_millis() -> u64 {
    DEFAULT_TIMEOUT_MILLIS
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            isolation_strategy: default_strategy(),
            pool_size: default_pool_size(),
            queue_capacity: 0,
            max_concurrent_requests: default_max_concurrent(),
            timeout_enabled: default_timeout_enabled(),
            timeout_millis: default_timeout_millis(),
        }
    }
}

impl CommandConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        match self.isolation_strategy {
            IsolationStrategyKind::ThreadPool => {
                if self.pool_size == 0 {
                    return Err("pool_size must be greater than 0".into());
                }
            }
            IsolationStrategyKind::Semaphore => {
                if self.max_concurrent_requests == 0 {
                    return Err("max_concurrent_requests must be greater than 0".into());
                }
            }
        }
        if self.timeout_enabled && self.timeout_millis == 0 {
            return Err("timeout_millis must be greater than 0 when timeout is enabled".into());
        }
        Ok(())
    }

    /// Parse a command configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Convert the flat surface into the typed isolation model.
    #[must_use]
    pub fn into_isolation(self) -> IsolationConfig {
        let timeout = Some(Duration::from_millis(self.timeout_millis));
        match self.isolation_strategy {
            IsolationStrategyKind::ThreadPool => IsolationConfig::ThreadPool {
                pool_size: self.pool_size,
                queue_capacity: self.queue_capacity,
                timeout,
                timeout_enabled: self.timeout_enabled,
            },
            IsolationStrategyKind::Semaphore => IsolationConfig::Semaphore {
                max_concurrent: self.max_concurrent_requests,
                timeout,
                timeout_enabled: self.timeout_enabled,
            },
        }
    }
}

/// Typed isolation configuration bound to a command spec.
///
/// Exactly one instance is shared (by `group_key` + `command_key`) across all
/// commands issued for the same logical operation, so concurrency bounds are
/// enforced per operation rather than per command instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationConfig {
    /// Dedicated worker pool with immediate accept-or-reject admission.
    ThreadPool {
        /// Number of worker threads.
        pool_size: usize,
        /// Queued submissions accepted beyond busy workers.
        queue_capacity: usize,
        /// How long the submitter waits for the worker's result.
        timeout: Option<Duration>,
        /// Whether the timeout is enforced.
        timeout_enabled: bool,
    },
    /// Counting permit set; the caller thread runs the primary action.
    Semaphore {
        /// Maximum concurrent executions.
        max_concurrent: u32,
        /// Accepted but operationally ignored: execution is synchronous on
        /// the caller thread, so there is no waiter to time out.
        timeout: Option<Duration>,
        /// Accepted but operationally ignored, see `timeout`.
        timeout_enabled: bool,
    },
}

impl IsolationConfig {
    /// Thread-pool isolation with `pool_size` workers, zero queue capacity
    /// and the default timeout enabled.
    #[must_use]
    pub const fn thread_pool(pool_size: usize) -> Self {
        Self::ThreadPool {
            pool_size,
            queue_capacity: 0,
            timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MILLIS)),
            timeout_enabled: true,
        }
    }

    /// Semaphore isolation admitting at most `max_concurrent` executions.
    #[must_use]
    pub const fn semaphore(max_concurrent: u32) -> Self {
        Self::Semaphore {
            max_concurrent,
            timeout: None,
            timeout_enabled: false,
        }
    }

    /// Set the queue capacity (thread-pool isolation only; no effect on
    /// semaphore isolation).
    #[must_use]
    pub const fn with_queue_capacity(self, capacity: usize) -> Self {
        match self {
            Self::ThreadPool {
                pool_size,
                timeout,
                timeout_enabled,
                ..
            } => Self::ThreadPool {
                pool_size,
                queue_capacity: capacity,
                timeout,
                timeout_enabled,
            },
            Self::Semaphore { .. } => self,
        }
    }

    /// Set and enable the execution timeout.
    #[must_use]
    pub const fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            Self::ThreadPool {
                pool_size,
                queue_capacity,
                ..
            } => Self::ThreadPool {
                pool_size,
                queue_capacity,
                timeout: Some(timeout),
                timeout_enabled: true,
            },
            Self::Semaphore { max_concurrent, .. } => Self::Semaphore {
                max_concurrent,
                timeout: Some(timeout),
                timeout_enabled: true,
            },
        }
    }

    /// Disable the execution timeout.
    #[must_use]
    pub const fn no_timeout(self) -> Self {
        match self {
            Self::ThreadPool {
                pool_size,
                queue_capacity,
                timeout,
                ..
            } => Self::ThreadPool {
                pool_size,
                queue_capacity,
                timeout,
                timeout_enabled: false,
            },
            Self::Semaphore {
                max_concurrent,
                timeout,
                ..
            } => Self::Semaphore {
                max_concurrent,
                timeout,
                timeout_enabled: false,
            },
        }
    }

    /// The timeout the executor enforces, if any.
    ///
    /// Always `None` for semaphore isolation: execution is synchronous on
    /// the caller thread, so timeout settings have no operational effect.
    #[must_use]
    pub const fn effective_timeout(&self) -> Option<Duration> {
        match self {
            Self::ThreadPool {
                timeout,
                timeout_enabled,
                ..
            } => {
                if *timeout_enabled {
                    *timeout
                } else {
                    None
                }
            }
            Self::Semaphore { .. } => None,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::ThreadPool { pool_size, .. } => {
                if *pool_size == 0 {
                    return Err("pool_size must be greater than 0".into());
                }
            }
            Self::Semaphore { max_concurrent, .. } => {
                if *max_concurrent == 0 {
                    return Err("max_concurrent must be greater than 0".into());
                }
            }
        }
        Ok(())
    }
}

impl Default for IsolationConfig {
    /// Thread-pool isolation sized to the number of logical CPUs, with the
    /// default timeout enabled.
    fn default() -> Self {
        Self::thread_pool(num_cpus::get())
    }
}
