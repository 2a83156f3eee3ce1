//! Core command execution, isolation and outcome types.

pub mod command;
pub mod error;
pub mod executor;
pub mod isolation;
pub mod registry;

pub use command::{Command, CommandSpec, CommandSpecBuilder, ExecutionOutcome};
pub use error::{ActionResult, CommandError, ConfigError, FailureType, RejectionReason};
pub use executor::Executor;
pub use isolation::{
    CommandThreadPool, ExecutionSemaphore, IsolationStrategy, PoolStats, SemaphorePermit,
};
pub use registry::{IsolationRegistry, StrategyKey};
