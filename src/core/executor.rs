//! Command executor: runs one command to a definite outcome.

use std::sync::Arc;

use anyhow::anyhow;
use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{debug, warn};

use crate::core::command::{Command, CommandSpec, ExecutionOutcome};
use crate::core::error::{ActionResult, CommandError, ConfigError, RejectionReason};
use crate::core::isolation::{CommandThreadPool, ExecutionSemaphore, IsolationStrategy};
use crate::core::registry::IsolationRegistry;

/// Outcome of the primary path, before fallback routing.
enum PrimaryFailure {
    /// The primary action returned an error.
    Run(anyhow::Error),
    /// No concurrency slot could be acquired.
    Rejected(RejectionReason),
    /// The worker result did not arrive within the timeout.
    TimedOut,
}

impl PrimaryFailure {
    fn into_command_error(self) -> CommandError {
        match self {
            Self::Run(source) => CommandError::RunFailure(source),
            Self::Rejected(RejectionReason::ThreadPoolExhausted) => {
                CommandError::RejectedThreadExecution
            }
            Self::Rejected(RejectionReason::SemaphoreExhausted) => {
                CommandError::RejectedSemaphoreExecution
            }
            Self::TimedOut => CommandError::TimedOut,
        }
    }
}

/// Runs commands under their isolation strategy, routing every non-success
/// through the fallback leg.
///
/// The executor owns an explicit [`IsolationRegistry`]; strategies are
/// created on a key's first execution and reused for the executor's
/// lifetime. Callers typically create one executor and share it
/// (`Arc<Executor>`) across threads.
#[derive(Debug, Default)]
pub struct Executor {
    registry: Arc<IsolationRegistry>,
}

impl Executor {
    /// Create an executor with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry of per-key isolation strategies.
    #[must_use]
    pub fn registry(&self) -> &IsolationRegistry {
        &self.registry
    }

    /// Run a command and collapse the outcome into a value or a typed error.
    ///
    /// Blocks until the execution settles: at most the configured timeout
    /// for thread-pool isolation, or for the duration of the action itself
    /// on semaphore isolation. Returns the primary or fallback value on
    /// recoverable outcomes.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] carrying a
    /// [`FailureType`](crate::core::FailureType) when no usable value could
    /// be produced, or [`CommandError::Config`] when the spec's isolation
    /// configuration is invalid or conflicts with an earlier registration.
    pub fn execute<V: Send + 'static>(&self, command: Command<V>) -> Result<V, CommandError> {
        match self.run(command) {
            Ok(outcome) => outcome.into_result(),
            Err(config_error) => Err(CommandError::Config(config_error)),
        }
    }

    /// Run a command to its full [`ExecutionOutcome`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the spec's isolation configuration is
    /// invalid or conflicts with an earlier registration for the same key.
    pub fn run<V: Send + 'static>(
        &self,
        command: Command<V>,
    ) -> Result<ExecutionOutcome<V>, ConfigError> {
        let (spec, run, fallback) = command.into_parts();
        let strategy = self.registry.resolve(&spec)?;

        debug!(
            group = spec.group_key(),
            command = spec.command_key(),
            "executing command"
        );

        let primary = match strategy.as_ref() {
            IsolationStrategy::ThreadPool(pool) => run_on_pool(pool, &spec, run),
            IsolationStrategy::Semaphore(semaphore) => run_with_permit(semaphore, &spec, run),
        };

        Ok(resolve_outcome(&spec, primary, fallback))
    }
}

/// Submit the primary action to the worker pool and wait for its result,
/// honoring the spec's timeout policy.
fn run_on_pool<V: Send + 'static>(
    pool: &CommandThreadPool,
    spec: &CommandSpec,
    run: Box<dyn FnOnce() -> ActionResult<V> + Send + 'static>,
) -> Result<V, PrimaryFailure> {
    let (result_tx, result_rx) = bounded::<ActionResult<V>>(1);
    let job = Box::new(move || {
        // The send fails only when the submitter timed out and dropped the
        // receiver; the late result is discarded.
        let _ = result_tx.send(run());
    });

    if !pool.try_execute(job) {
        warn!(
            group = spec.group_key(),
            command = spec.command_key(),
            "thread pool rejected execution"
        );
        return Err(PrimaryFailure::Rejected(
            RejectionReason::ThreadPoolExhausted,
        ));
    }

    match spec.isolation().effective_timeout() {
        Some(timeout) => match result_rx.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(PrimaryFailure::Run(source)),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    group = spec.group_key(),
                    command = spec.command_key(),
                    timeout = ?timeout,
                    "primary action timed out, worker abandoned to run to completion"
                );
                Err(PrimaryFailure::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(PrimaryFailure::Run(anyhow!("primary action panicked")))
            }
        },
        None => match result_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(PrimaryFailure::Run(source)),
            Err(_) => Err(PrimaryFailure::Run(anyhow!("primary action panicked"))),
        },
    }
}

/// Run the primary action on the caller thread under a semaphore permit.
fn run_with_permit<V>(
    semaphore: &Arc<ExecutionSemaphore>,
    spec: &CommandSpec,
    run: Box<dyn FnOnce() -> ActionResult<V> + Send + 'static>,
) -> Result<V, PrimaryFailure> {
    let Some(permit) = ExecutionSemaphore::acquire(semaphore) else {
        warn!(
            group = spec.group_key(),
            command = spec.command_key(),
            "semaphore rejected execution"
        );
        return Err(PrimaryFailure::Rejected(
            RejectionReason::SemaphoreExhausted,
        ));
    };

    // Held for the duration of the action; returned even if `run` unwinds.
    let _permit = permit;
    run().map_err(PrimaryFailure::Run)
}

/// Route a primary-path failure through the fallback, if present.
fn resolve_outcome<V>(
    spec: &CommandSpec,
    primary: Result<V, PrimaryFailure>,
    fallback: Option<Box<dyn FnOnce() -> ActionResult<V> + Send + 'static>>,
) -> ExecutionOutcome<V> {
    let failure = match primary {
        Ok(value) => return ExecutionOutcome::Success(value),
        Err(failure) => failure,
    };

    let Some(fallback) = fallback else {
        return match failure {
            PrimaryFailure::Run(source) => ExecutionOutcome::Failed(source),
            PrimaryFailure::Rejected(reason) => ExecutionOutcome::Rejected(reason),
            PrimaryFailure::TimedOut => ExecutionOutcome::TimedOut,
        };
    };

    debug!(
        group = spec.group_key(),
        command = spec.command_key(),
        "running fallback"
    );
    match fallback() {
        Ok(value) => ExecutionOutcome::FallbackSuccess(value),
        Err(fallback_error) => {
            warn!(
                group = spec.group_key(),
                command = spec.command_key(),
                "fallback failed"
            );
            ExecutionOutcome::FallbackFailed {
                original: failure.into_command_error(),
                fallback_error,
            }
        }
    }
}
