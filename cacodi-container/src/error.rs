//! Error types for cacodi resolver operations.
//!
//! Callers of `get` only ever see [`CacodiError`]. Why an individual
//! constructor candidate failed is logged, not returned.

use std::fmt;

use cacodi_support::rendering::render_chain;

use crate::key::TypeKey;

/// Boxed error returned by constructors and factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all cacodi operations.
#[derive(Debug, thiserror::Error)]
pub enum CacodiError {
    /// No construction strategy succeeded for the requested type.
    #[error("{}", .0)]
    Unresolvable(UnresolvableDependencyError),

    /// An abstract type or trait object was registered as an implementation.
    #[error("{}", .0)]
    Uninstantiable(UninstantiableTypeError),

    /// The requested type is already being resolved further up this call stack.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A factory reported its own failure.
    #[error("Factory for {key} failed: {source}")]
    FactoryFailed {
        key: TypeKey,
        #[source]
        source: BoxError,
    },

    /// The instance stored for a key does not have the requested type.
    #[error("Instance resolved for {key} is not a {expected}")]
    TypeMismatch {
        key: TypeKey,
        expected: &'static str,
    },

    /// [`init_global`](crate::global::init_global) was called after the
    /// process-wide resolver already existed.
    #[error("The global resolver is already initialized")]
    GlobalAlreadyInitialized,
}

impl CacodiError {
    /// Wraps a failure raised inside a factory for `S`.
    pub fn factory_failed<S: ?Sized + 'static>(source: impl Into<BoxError>) -> Self {
        Self::FactoryFailed {
            key: TypeKey::of::<S>(),
            source: source.into(),
        }
    }

    /// Returns `true` for [`CacodiError::Unresolvable`].
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Self::Unresolvable(_))
    }

    /// Returns `true` for [`CacodiError::CircularDependency`].
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency(_))
    }
}

/// No construction strategy succeeded for a type.
#[derive(Debug)]
pub struct UnresolvableDependencyError {
    /// The type that was requested.
    pub requested: TypeKey,
    /// The implementing type that was instantiated instead, if mapped.
    pub implementation: Option<TypeKey>,
    /// The type whose construction needed this one, if any.
    pub required_by: Option<TypeKey>,
    /// Factory and constructor attempts made before giving up.
    pub attempts: usize,
    /// Known types with similar names.
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnresolvableDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unresolvable dependency: {}", self.requested)?;

        if let Some(ref implementation) = self.implementation {
            write!(f, "\n  Implemented by: {implementation}")?;
        }

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if self.attempts == 0 {
            write!(
                f,
                "\n  No factory or constructor is known for {}",
                self.implementation.as_ref().unwrap_or(&self.requested).short_name()
            )?;

            if !self.suggestions.is_empty() {
                write!(f, "\n  Did you mean one of:")?;
                for suggestion in &self.suggestions {
                    write!(f, "\n    - {suggestion}")?;
                }
            }

            write!(
                f,
                "\n  Hint: Declare constructors with #[injectable], register a factory, or map an implementation"
            )
        } else {
            write!(f, "\n  Strategies tried: {}", self.attempts)?;
            write!(
                f,
                "\n  Hint: Enable debug logging for `cacodi_container` to see why each attempt failed"
            )
        }
    }
}

/// An implementing type that can never be instantiated was registered.
#[derive(Debug)]
pub struct UninstantiableTypeError {
    /// The requested (interface) type.
    pub interface: TypeKey,
    /// The rejected implementing type.
    pub implementation: TypeKey,
}

impl fmt::Display for UninstantiableTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot implement {} with {}: the type is abstract or declares no constructors",
            self.interface, self.implementation,
        )?;
        write!(
            f,
            "\n  Hint: Map {} to a concrete type declared with #[injectable], or register a factory for it first",
            self.interface.short_name(),
        )
    }
}

/// A type depends on itself through its constructors or fields.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The resolution chain, starting and ending with the repeated type.
    pub chain: Vec<TypeKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(TypeKey::short_name).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: Break the cycle with a factory, a #[manual] constructor, or an injected field resolved later"
        )
    }
}

/// A field setter could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum FieldAccessError {
    /// The target instance is not the type that declares the field.
    #[error("field `{field}` is declared on {declared_on}, which is not the target instance's type")]
    TargetMismatch {
        field: &'static str,
        declared_on: TypeKey,
    },

    /// The resolved value does not have the field's type.
    #[error("value for field `{field}` is not a {expected}")]
    ValueMismatch {
        field: &'static str,
        expected: TypeKey,
    },

    /// The embedded ancestor holding the field could not be reached.
    #[error("field `{field}` lives on ancestor {ancestor}, which is not reachable from the target")]
    AncestorUnreachable {
        field: &'static str,
        ancestor: TypeKey,
    },
}

/// Why a single construction attempt failed.
///
/// Logged and swallowed by the resolver; only contributes to the final
/// [`CacodiError::Unresolvable`] once every candidate is exhausted.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AttemptError {
    #[error("{key} is abstract and cannot be instantiated")]
    Abstract { key: TypeKey },

    #[error("constructor `{constructor}` is not accessible")]
    Inaccessible { constructor: &'static str },

    #[error("constructor `{constructor}` failed: {source}")]
    Constructor {
        constructor: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("dependency failed: {0}")]
    Dependency(#[source] CacodiError),

    #[error(transparent)]
    FieldAccess(#[from] FieldAccessError),
}

/// Convenient Result type for cacodi operations.
pub type Result<T> = std::result::Result<T, CacodiError>;
