//! Three-level configuration cascade.
//!
//! A [`ConfigurationParameter`] describes how one level (endpoint or server)
//! treats the value handed down from the level above it. Resolution is pure:
//! the same parameter and parent value always produce the same result, so a
//! single parameter value can be shared by any number of in-flight calls.

use std::fmt;
use std::sync::Arc;

/// Shared combine function of a [`ConfigurationParameter::Merge`].
pub type MergeFn<T> = Arc<dyn Fn(T, T) -> T + Send + Sync>;

/// How a configuration level derives its value from its parent.
pub enum ConfigurationParameter<T> {
    /// Use the parent value unchanged.
    Inherit,
    /// Replace the parent value entirely.
    Override(T),
    /// Combine `(parent, value)` with the supplied function.
    Merge(T, MergeFn<T>),
}

impl<T> ConfigurationParameter<T> {
    /// Build a `Merge` parameter from a plain closure.
    pub fn merge<F>(value: T, combine: F) -> Self
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        ConfigurationParameter::Merge(value, Arc::new(combine))
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, ConfigurationParameter::Inherit)
    }
}

impl<T: Clone> ConfigurationParameter<T> {
    /// Resolve this level against its parent value.
    pub fn resolve(&self, parent: T) -> T {
        match self {
            ConfigurationParameter::Inherit => parent,
            ConfigurationParameter::Override(value) => value.clone(),
            ConfigurationParameter::Merge(value, combine) => combine(parent, value.clone()),
        }
    }
}

/// Resolve endpoint → server → session default.
///
/// The endpoint is the most specific level: a server `Override` is still
/// subject to the endpoint's `Override` or `Merge`.
pub fn cascade<T: Clone>(
    endpoint: &ConfigurationParameter<T>,
    server: &ConfigurationParameter<T>,
    session_default: T,
) -> T {
    endpoint.resolve(server.resolve(session_default))
}

impl<T> Default for ConfigurationParameter<T> {
    fn default() -> Self {
        ConfigurationParameter::Inherit
    }
}

impl<T: Clone> Clone for ConfigurationParameter<T> {
    fn clone(&self) -> Self {
        match self {
            ConfigurationParameter::Inherit => ConfigurationParameter::Inherit,
            ConfigurationParameter::Override(value) => {
                ConfigurationParameter::Override(value.clone())
            }
            ConfigurationParameter::Merge(value, combine) => {
                ConfigurationParameter::Merge(value.clone(), Arc::clone(combine))
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ConfigurationParameter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationParameter::Inherit => f.write_str("Inherit"),
            ConfigurationParameter::Override(value) => {
                f.debug_tuple("Override").field(value).finish()
            }
            ConfigurationParameter::Merge(value, _) => {
                f.debug_tuple("Merge").field(value).field(&"<fn>").finish()
            }
        }
    }
}
