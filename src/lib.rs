//! # Cordon
//!
//! Bounded-concurrency command execution with timeout, rejection and
//! fallback isolation.
//!
//! Cordon wraps a unit of work — a *command* — with a hard concurrency bound
//! and a recovery path. Each command is bound to a logical key (group plus
//! command name); every execution for that key is admitted through a single
//! shared isolation strategy, so one slow or failing dependency consumes a
//! bounded set of resources instead of every caller thread in the process.
//!
//! ## Core Problem Solved
//!
//! Synchronous calls to slow dependencies fail badly under load:
//!
//! - **Caller pile-up**: every caller blocks on the same stalled dependency
//!   until threads run out
//! - **Unbounded fan-in**: nothing caps how many concurrent calls hit a
//!   struggling backend
//! - **No recovery path**: failures surface as raw errors instead of a
//!   degraded-but-usable value
//!
//! Cordon makes overload explicit: slot acquisition is immediate
//! success-or-reject, never a queueing wait, so under saturation callers
//! fail fast and fall back instead of piling up.
//!
//! ## Key Features
//!
//! - **Thread-pool isolation**: the primary action runs on a dedicated
//!   worker thread; a stalled dependency occupies one worker slot, not the
//!   caller's thread
//! - **Semaphore isolation**: lock-free concurrency counting with the action
//!   on the caller thread, for cheap in-process work
//! - **Fallback substitution**: on failure, timeout or rejection, a fallback
//!   action supplies a degraded value
//! - **Typed outcomes**: every failure carries a [`FailureType`] tag; the
//!   fallback's own failure preserves both errors
//! - **Per-key registration**: isolation policy is set once per key and
//!   immutable afterwards; conflicting re-registration fails loudly
//!
//! ## Quick Start
//!
//! ```
//! use cordon::{Command, CommandSpec, Executor, IsolationConfig};
//!
//! # fn main() -> Result<(), cordon::CommandError> {
//! let executor = Executor::new();
//! let spec = CommandSpec::builder("ExampleGroup")
//!     .isolation(IsolationConfig::semaphore(2))
//!     .build();
//!
//! let command = Command::new(spec, || Ok("primary".to_string()))
//!     .with_fallback(|| Ok("fallback".to_string()));
//!
//! let value = executor.execute(command)?;
//! assert_eq!(value, "primary");
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread-Pool Isolation
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use cordon::{Command, CommandSpec, Executor, IsolationConfig};
//!
//! let executor = Executor::new();
//! let spec = CommandSpec::builder("RemoteCalls")
//!     .command_key("GetQuote")
//!     .isolation(
//!         IsolationConfig::thread_pool(10).with_timeout(Duration::from_millis(250)),
//!     )
//!     .build();
//!
//! // Runs on a pool worker; the calling thread waits at most 250ms.
//! let quote = executor.execute(
//!     Command::new(spec, || fetch_quote("ACME"))
//!         .with_fallback(|| Ok(Quote::stale("ACME"))),
//! )?;
//! ```
//!
//! For complete examples, see:
//! - `tests/thread_pool_test.rs` - pool saturation and timeout behavior
//! - `tests/semaphore_test.rs` - permit-bounded execution with fallback

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core command execution, isolation and outcome types.
pub mod core;
/// Configuration models for command isolation policies.
pub mod config;
/// Shared utilities.
pub mod util;

pub use crate::config::{CommandConfig, IsolationConfig, IsolationStrategyKind};
pub use crate::core::{
    ActionResult, Command, CommandError, CommandSpec, ConfigError, ExecutionOutcome, Executor,
    FailureType, RejectionReason,
};
