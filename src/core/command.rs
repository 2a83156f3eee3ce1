//! Command and outcome model.

use crate::config::IsolationConfig;
use crate::core::error::{ActionResult, CommandError, RejectionReason};

/// A boxed primary or fallback action.
type ActionFn<V> = Box<dyn FnOnce() -> ActionResult<V> + Send + 'static>;

/// Identity and isolation policy of a logical call site.
///
/// Immutable once built. `Clone` so a single spec can be cached and shared
/// across all command instances issued for the same logical operation; every
/// command built from equal specs is admitted through the same isolation
/// strategy instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    group_key: String,
    command_key: String,
    isolation: IsolationConfig,
}

impl CommandSpec {
    /// Start building a spec for the given group key.
    pub fn builder(group_key: impl Into<String>) -> CommandSpecBuilder {
        CommandSpecBuilder {
            group_key: group_key.into(),
            command_key: None,
            isolation: None,
        }
    }

    /// The logical group this call site belongs to.
    #[must_use]
    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    /// The command key within the group. Defaults to the group key when not
    /// set explicitly.
    #[must_use]
    pub fn command_key(&self) -> &str {
        &self.command_key
    }

    /// The isolation policy for this call site.
    #[must_use]
    pub const fn isolation(&self) -> &IsolationConfig {
        &self.isolation
    }
}

/// Builder for [`CommandSpec`].
#[derive(Debug)]
pub struct CommandSpecBuilder {
    group_key: String,
    command_key: Option<String>,
    isolation: Option<IsolationConfig>,
}

impl CommandSpecBuilder {
    /// Set an explicit command key. Without one, the group key is used.
    #[must_use]
    pub fn command_key(mut self, command_key: impl Into<String>) -> Self {
        self.command_key = Some(command_key.into());
        self
    }

    /// Set the isolation policy. Without one, the default thread-pool
    /// isolation applies.
    #[must_use]
    pub fn isolation(mut self, isolation: IsolationConfig) -> Self {
        self.isolation = Some(isolation);
        self
    }

    /// Finish building the spec.
    #[must_use]
    pub fn build(self) -> CommandSpec {
        let command_key = self.command_key.unwrap_or_else(|| self.group_key.clone());
        CommandSpec {
            group_key: self.group_key,
            command_key,
            isolation: self.isolation.unwrap_or_default(),
        }
    }
}

/// A unit of work with a primary action and an optional fallback.
///
/// Owned exclusively by the caller and consumed by a single execution; the
/// actions are `FnOnce`, so the fallback can run at most once per execution.
pub struct Command<V> {
    spec: CommandSpec,
    run: ActionFn<V>,
    fallback: Option<ActionFn<V>>,
}

impl<V> Command<V> {
    /// Create a command from a spec and its primary action.
    pub fn new(
        spec: CommandSpec,
        run: impl FnOnce() -> ActionResult<V> + Send + 'static,
    ) -> Self {
        Self {
            spec,
            run: Box::new(run),
            fallback: None,
        }
    }

    /// Attach a fallback action, invoked when the primary action fails,
    /// times out or is rejected.
    #[must_use]
    pub fn with_fallback(
        mut self,
        fallback: impl FnOnce() -> ActionResult<V> + Send + 'static,
    ) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// The spec this command is bound to.
    #[must_use]
    pub const fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Whether a fallback is attached.
    #[must_use]
    pub const fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub(crate) fn into_parts(self) -> (CommandSpec, ActionFn<V>, Option<ActionFn<V>>) {
        (self.spec, self.run, self.fallback)
    }
}

/// The definite outcome of one command execution.
#[derive(Debug)]
pub enum ExecutionOutcome<V> {
    /// The primary action completed and produced a value.
    Success(V),
    /// The primary path failed and the fallback produced a value.
    FallbackSuccess(V),
    /// The primary path failed and the fallback itself failed.
    FallbackFailed {
        /// The failure that triggered the fallback.
        original: CommandError,
        /// The error raised by the fallback action.
        fallback_error: anyhow::Error,
    },
    /// No concurrency slot could be acquired and no fallback was present.
    Rejected(RejectionReason),
    /// The primary action timed out and no fallback was present.
    TimedOut,
    /// The primary action failed and no fallback was present.
    Failed(anyhow::Error),
}

impl<V> ExecutionOutcome<V> {
    /// Whether this outcome carries a usable value.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_) | Self::FallbackSuccess(_))
    }

    /// Collapse the outcome into the caller-facing result: the primary or
    /// fallback value on recoverable outcomes, a typed error otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] tagged with the matching
    /// [`FailureType`](crate::core::FailureType) when no usable value was
    /// produced.
    pub fn into_result(self) -> Result<V, CommandError> {
        match self {
            Self::Success(value) | Self::FallbackSuccess(value) => Ok(value),
            Self::FallbackFailed {
                original,
                fallback_error,
            } => Err(CommandError::FallbackFailure {
                original: Box::new(original),
                fallback_error,
            }),
            Self::Rejected(RejectionReason::ThreadPoolExhausted) => {
                Err(CommandError::RejectedThreadExecution)
            }
            Self::Rejected(RejectionReason::SemaphoreExhausted) => {
                Err(CommandError::RejectedSemaphoreExecution)
            }
            Self::TimedOut => Err(CommandError::TimedOut),
            Self::Failed(source) => Err(CommandError::RunFailure(source)),
        }
    }
}
