//! Per-key registry of isolation strategy instances.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::IsolationConfig;
use crate::core::command::CommandSpec;
use crate::core::error::ConfigError;
use crate::core::isolation::IsolationStrategy;

/// Identity of one logical operation: group key plus command key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StrategyKey {
    group_key: String,
    command_key: String,
}

impl StrategyKey {
    /// Build a key from a command spec.
    #[must_use]
    pub fn from_spec(spec: &CommandSpec) -> Self {
        Self {
            group_key: spec.group_key().to_owned(),
            command_key: spec.command_key().to_owned(),
        }
    }

    /// The group component.
    #[must_use]
    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    /// The command component.
    #[must_use]
    pub fn command_key(&self) -> &str {
        &self.command_key
    }
}

impl fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_key, self.command_key)
    }
}

/// A registered strategy with the configuration it was built from.
///
/// The configuration is retained so later resolutions can detect conflicting
/// registrations.
#[derive(Debug)]
struct Registered {
    config: IsolationConfig,
    strategy: Arc<IsolationStrategy>,
}

/// Registry mapping each key to its single isolation strategy instance.
///
/// Strategies are created lazily on first resolution and never removed for
/// the lifetime of the registry, so concurrency bounds are enforced per
/// logical operation across all callers. Lookup is guarded by a `RwLock`
/// with a read fast path; creation takes the write lock and re-checks.
#[derive(Debug, Default)]
pub struct IsolationRegistry {
    entries: RwLock<HashMap<StrategyKey, Registered>>,
}

impl IsolationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the strategy instance for a spec, creating it on first use.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Invalid`] when a new key's configuration fails
    ///   validation.
    /// - [`ConfigError::ConflictingRegistration`] when the key is already
    ///   registered with a different isolation configuration. Isolation
    ///   policy is immutable per key; conflicting re-registration fails
    ///   loudly instead of silently taking effect.
    pub fn resolve(&self, spec: &CommandSpec) -> Result<Arc<IsolationStrategy>, ConfigError> {
        let key = StrategyKey::from_spec(spec);

        {
            let entries = self.entries.read();
            if let Some(registered) = entries.get(&key) {
                return Self::check_conflict(&key, registered, spec.isolation());
            }
        }

        let mut entries = self.entries.write();
        match entries.entry(key) {
            Entry::Occupied(occupied) => {
                // Another caller won the race between our read and write.
                Self::check_conflict(occupied.key(), occupied.get(), spec.isolation())
            }
            Entry::Vacant(vacant) => {
                let key_name = vacant.key().to_string();
                let strategy = Arc::new(IsolationStrategy::from_config(
                    &key_name,
                    spec.isolation(),
                )?);
                info!(key = %key_name, "isolation strategy registered");
                vacant.insert(Registered {
                    config: spec.isolation().clone(),
                    strategy: Arc::clone(&strategy),
                });
                Ok(strategy)
            }
        }
    }

    /// Look up an already-registered strategy.
    #[must_use]
    pub fn get(&self, group_key: &str, command_key: &str) -> Option<Arc<IsolationStrategy>> {
        let key = StrategyKey {
            group_key: group_key.to_owned(),
            command_key: command_key.to_owned(),
        };
        let entries = self.entries.read();
        entries.get(&key).map(|r| Arc::clone(&r.strategy))
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no key has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn check_conflict(
        key: &StrategyKey,
        registered: &Registered,
        requested: &IsolationConfig,
    ) -> Result<Arc<IsolationStrategy>, ConfigError> {
        if registered.config == *requested {
            Ok(Arc::clone(&registered.strategy))
        } else {
            warn!(key = %key, "conflicting isolation configuration for registered key");
            Err(ConfigError::ConflictingRegistration {
                key: key.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semaphore_spec(max_concurrent: u32) -> CommandSpec {
        CommandSpec::builder("RegistryGroup")
            .command_key("GetValue")
            .isolation(IsolationConfig::semaphore(max_concurrent))
            .build()
    }

    #[test]
    fn test_resolve_creates_then_reuses() {
        let registry = IsolationRegistry::new();
        assert!(registry.is_empty());

        let first = registry.resolve(&semaphore_spec(2)).expect("created");
        let second = registry.resolve(&semaphore_spec(2)).expect("reused");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_registration_fails_loudly() {
        let registry = IsolationRegistry::new();
        registry.resolve(&semaphore_spec(2)).expect("created");

        let err = registry.resolve(&semaphore_spec(3)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ConflictingRegistration { ref key } if key == "RegistryGroup:GetValue"
        ));
        // The original registration is untouched.
        assert_eq!(registry.len(), 1);
        assert!(registry.get("RegistryGroup", "GetValue").is_some());
    }

    #[test]
    fn test_keys_are_isolated_per_group_and_command() {
        let registry = IsolationRegistry::new();

        let spec_a = CommandSpec::builder("GroupA")
            .isolation(IsolationConfig::semaphore(1))
            .build();
        let spec_b = CommandSpec::builder("GroupA")
            .command_key("Other")
            .isolation(IsolationConfig::semaphore(1))
            .build();

        let a = registry.resolve(&spec_a).expect("a");
        let b = registry.resolve(&spec_b).expect("b");

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_config_is_not_registered() {
        let registry = IsolationRegistry::new();
        let spec = CommandSpec::builder("Bad")
            .isolation(IsolationConfig::semaphore(0))
            .build();

        assert!(matches!(registry.resolve(&spec), Err(ConfigError::Invalid(_))));
        assert!(registry.is_empty());
    }
}
