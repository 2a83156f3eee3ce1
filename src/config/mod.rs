//! Configuration models for command isolation policies.

pub mod command;

pub use command::{
    CommandConfig, IsolationConfig, IsolationStrategyKind, DEFAULT_MAX_CONCURRENT,
    DEFAULT_TIMEOUT_MILLIS,
};
