//! Resolver configuration.
//!
//! Serializable so it can sit inside an application's own config file:
//!
//! ```toml
//! [resolver]
//! detect_cycles = true
//! factory_field_failure = "fall_through"
//! ```

use serde::{Deserialize, Serialize};

/// Behaviour switches for a [`Resolver`](crate::resolver::Resolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Fail with `CircularDependency` when a type is requested while it is
    /// already being resolved on the same thread. When off, such a cycle
    /// recurses until the stack overflows.
    pub detect_cycles: bool,

    /// What to do when a field of a factory-built instance cannot be set.
    pub factory_field_failure: FactoryFieldPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            factory_field_failure: FactoryFieldPolicy::default(),
        }
    }
}

/// Handling of a field-access failure on a factory-built instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryFieldPolicy {
    /// Discard the factory result and try the type's constructors.
    #[default]
    FallThrough,
    /// Give up on the type.
    Fail,
}
