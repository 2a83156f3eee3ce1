//! Error types for command execution.

use thiserror::Error;

/// Result type produced by primary and fallback actions.
///
/// Actions report domain failures through `anyhow::Error` so callers can
/// attach arbitrary context without the core prescribing an error type.
pub type ActionResult<V> = Result<V, anyhow::Error>;

/// Classification tag carried by every failed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureType {
    /// The primary action did not complete within the configured timeout.
    Timeout,
    /// All worker threads (and queue slots, if any) were busy.
    RejectedThreadExecution,
    /// No semaphore permit was available.
    RejectedSemaphoreExecution,
    /// The primary action itself returned an error.
    RunFailure,
    /// The fallback raised while handling a primary-path failure.
    FallbackFailure,
}

/// Which isolation mechanism refused to admit a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// All worker threads busy and no free queue slot.
    ThreadPoolExhausted,
    /// No counting permit available.
    SemaphoreExhausted,
}

/// Errors produced when resolving or registering an isolation strategy.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration values failed validation.
    #[error("invalid isolation configuration: {0}")]
    Invalid(String),
    /// The key is already registered with a different isolation configuration.
    ///
    /// Isolation policy is immutable for the lifetime of a key; attempts to
    /// re-register with different values fail instead of silently taking
    /// effect.
    #[error("key `{key}` is already registered with a different isolation configuration")]
    ConflictingRegistration {
        /// The qualified `group:command` key.
        key: String,
    },
}

/// A failed command execution, as seen by the caller.
///
/// Every primary-path failure is intercepted by the executor and converted
/// into either a fallback value or one of these variants; callers never see
/// raw worker-thread internals.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The primary action did not produce a result within the timeout.
    ///
    /// The in-flight action is abandoned, never interrupted; it runs to
    /// natural completion on its worker and releases its slot there.
    #[error("command execution timed out")]
    TimedOut,
    /// The thread pool had no free worker or queue slot.
    #[error("thread pool at capacity, execution rejected")]
    RejectedThreadExecution,
    /// The semaphore had no free permit.
    #[error("semaphore at capacity, execution rejected")]
    RejectedSemaphoreExecution,
    /// The primary action returned an error and no fallback was present.
    #[error("primary action failed")]
    RunFailure(#[source] anyhow::Error),
    /// The fallback itself failed while handling a primary-path failure.
    ///
    /// Carries both the original failure and the fallback's own error so no
    /// diagnostic information is lost.
    #[error("fallback failed while handling: {original}")]
    FallbackFailure {
        /// The failure that triggered the fallback.
        original: Box<CommandError>,
        /// The error raised by the fallback action.
        #[source]
        fallback_error: anyhow::Error,
    },
    /// The command's isolation configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CommandError {
    /// Classification tag for this failure.
    ///
    /// Returns `None` for configuration errors, which occur before any
    /// execution is attempted.
    #[must_use]
    pub const fn failure_type(&self) -> Option<FailureType> {
        match self {
            Self::TimedOut => Some(FailureType::Timeout),
            Self::RejectedThreadExecution => Some(FailureType::RejectedThreadExecution),
            Self::RejectedSemaphoreExecution => Some(FailureType::RejectedSemaphoreExecution),
            Self::RunFailure(_) => Some(FailureType::RunFailure),
            Self::FallbackFailure { .. } => Some(FailureType::FallbackFailure),
            Self::Config(_) => None,
        }
    }
}
