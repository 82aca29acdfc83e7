//! Resolver capabilities, one trait each.
//!
//! Code that only looks things up takes a [`DependencyResolver`]; code
//! that registers takes the narrowest capability it needs. [`ResolverApi`]
//! is the full set, implemented by anything that has all of them.

use std::any::type_name;
use std::sync::Arc;

use crate::error::{CacodiError, Result};
use crate::factory::{Factory, Supplier};
use crate::instance::{Instance, Upcast};
use crate::key::TypeKey;

/// Looks up instances by type. Object safe; factories receive it as
/// `&dyn DependencyResolver`.
pub trait DependencyResolver: Send + Sync {
    /// Returns an instance for `key`, building and caching it if needed.
    ///
    /// # Errors
    /// [`CacodiError::Unresolvable`] when no strategy produces one.
    fn resolve_key(&self, key: &TypeKey) -> Result<Instance>;
}

/// Typed lookups on any [`DependencyResolver`].
pub trait ResolveExt: DependencyResolver {
    /// Resolves `T`. Works for sized types and trait objects alike.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use cacodi_container::prelude::*;
    ///
    /// let resolver = Resolver::new();
    /// resolver.add::<String, _>(Arc::new(String::from("ready")));
    ///
    /// let value: Arc<String> = resolver.get().unwrap();
    /// assert_eq!(*value, "ready");
    /// ```
    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let key = TypeKey::of::<T>();
        let instance = self.resolve_key(&key)?;

        instance.downcast::<T>().ok_or_else(|| CacodiError::TypeMismatch {
            key,
            expected: type_name::<T>(),
        })
    }
}

impl<R: DependencyResolver + ?Sized> ResolveExt for R {}

/// Stores ready-made instances.
pub trait CachingResolver: DependencyResolver {
    /// Caches `instance` as the `I` for every later lookup, replacing any
    /// cached value.
    fn add<I, T>(&self, instance: Arc<T>)
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static;

    /// Like [`add`](Self::add) unless an implementation of `I` is already
    /// registered. Returns the `I` now in effect.
    fn add_default<I, T>(&self, instance: Arc<T>) -> Result<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static;
}

/// Builds instances through registered factories.
pub trait FactoryInvokingResolver: DependencyResolver {
    /// Registers `factory` for `S`, replacing any previous factory.
    fn add_factory<S, F>(&self, factory: F)
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static;

    /// Registers `factory` for `S` unless one exists. Returns the factory
    /// in effect.
    fn add_default_factory<S, F>(&self, factory: F) -> Arc<dyn Factory<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static;

    /// Registers a zero-argument supplier for `S`.
    fn add_supplier<S, F>(&self, supplier: F)
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.add_factory::<S, _>(Supplier::new(supplier));
    }

    /// Registers a zero-argument supplier for `S` unless a factory exists.
    fn add_default_supplier<S, F>(&self, supplier: F) -> Arc<dyn Factory<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.add_default_factory::<S, _>(Supplier::new(supplier))
    }

    /// Resolves the factory type `F` through this resolver and registers
    /// it for `S`.
    fn add_factory_type<S, F>(&self) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static;

    /// Like [`add_factory_type`](Self::add_factory_type), but `F` is only
    /// resolved when no factory for `S` exists.
    fn add_default_factory_type<S, F>(&self) -> Result<Arc<dyn Factory<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static;
}

/// Maps requested types to implementing types.
pub trait InterfaceMappingResolver: DependencyResolver {
    /// Builds a `T` whenever an `I` is requested.
    ///
    /// # Errors
    /// [`CacodiError::Uninstantiable`] if `T` can never be built: it has no
    /// factory and is abstract or declares no constructors.
    fn implement<I, T>(&self) -> Result<()>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static;

    /// Like [`implement`](Self::implement) unless `I` is already mapped.
    /// Returns the implementing type in effect.
    fn implement_default<I, T>(&self) -> Result<TypeKey>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static;
}

/// Every resolver capability.
pub trait ResolverApi: CachingResolver + FactoryInvokingResolver + InterfaceMappingResolver {}

impl<R> ResolverApi for R where R: CachingResolver + FactoryInvokingResolver + InterfaceMappingResolver {}
