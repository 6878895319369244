//! Router configuration and its one-time validation.

use std::collections::HashSet;
use std::fmt;

/// Tunables applied to every dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterSettings {
    /// Maximum number of calls accepted in one batch (`None` = unlimited)
    pub max_batch_size: Option<usize>,
}

impl RouterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of calls in one batch
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = Some(max);
        self
    }
}

/// Which side of the method call a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Before,
    After,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Before => f.write_str("before"),
            HookPhase::After => f.write_str("after"),
        }
    }
}

/// Structural problems in a router configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("method '{0}' is registered more than once")]
    DuplicateMethod(String),

    #[error("{phase} hook for '{method}' is registered more than once")]
    DuplicateHook { phase: HookPhase, method: String },

    #[error("{phase} hook is registered for unknown method '{method}'")]
    UnknownHookTarget { phase: HookPhase, method: String },

    #[error("max_batch_size must be greater than zero")]
    ZeroBatchSize,
}

/// Check the registration tables before the router becomes active.
///
/// Method names must be unique, each method has at most one hook per phase,
/// and every hook must target a registered method.
pub fn validate_tables<'a>(
    methods: impl IntoIterator<Item = &'a str>,
    hooks: impl IntoIterator<Item = (HookPhase, &'a str)>,
    settings: &RouterSettings,
) -> Result<(), ConfigError> {
    let mut known = HashSet::new();
    for method in methods {
        if !known.insert(method) {
            return Err(ConfigError::DuplicateMethod(method.to_string()));
        }
    }

    let mut hooked = HashSet::new();
    for (phase, method) in hooks {
        if !known.contains(method) {
            return Err(ConfigError::UnknownHookTarget {
                phase,
                method: method.to_string(),
            });
        }
        if !hooked.insert((phase, method)) {
            return Err(ConfigError::DuplicateHook {
                phase,
                method: method.to_string(),
            });
        }
    }

    if settings.max_batch_size == Some(0) {
        return Err(ConfigError::ZeroBatchSize);
    }

    Ok(())
}
