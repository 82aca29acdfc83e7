//! Factories: user code that produces one instance of a service per call.
//!
//! A factory receives the resolver as a [`DependencyResolver`] so it can look
//! up its own dependencies. Results are cached by the resolver, not here.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use cacodi_container::prelude::*;
//!
//! let resolver = Resolver::new();
//! resolver.add::<u16, _>(Arc::new(8080u16));
//! resolver.add_factory::<String, _>(|r: &dyn DependencyResolver| -> Result<Arc<String>> {
//!     let port = r.get::<u16>()?;
//!     Ok(Arc::new(format!("localhost:{port}")))
//! });
//!
//! assert_eq!(*resolver.get::<String>().unwrap(), "localhost:8080");
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::capability::DependencyResolver;
use crate::error::Result;
use crate::instance::Instance;
use crate::key::TypeKey;

/// Produces instances of `S`.
///
/// Closures `Fn(&dyn DependencyResolver) -> Result<Arc<S>>` implement this
/// trait directly. Wrap a zero-argument closure in [`Supplier`] when the
/// factory needs nothing from the resolver.
pub trait Factory<S: ?Sized>: Send + Sync {
    /// Builds one instance. Errors reach the caller of `get` unchanged.
    fn build(&self, resolver: &dyn DependencyResolver) -> Result<Arc<S>>;
}

impl<S, F> Factory<S> for F
where
    S: ?Sized,
    F: Fn(&dyn DependencyResolver) -> Result<Arc<S>> + Send + Sync,
{
    fn build(&self, resolver: &dyn DependencyResolver) -> Result<Arc<S>> {
        self(resolver)
    }
}

/// A factory that ignores the resolver.
///
/// The wrapped supplier stays reachable through [`Supplier::supplier`], so a
/// caller can tell which supplier ended up registered.
#[derive(Clone)]
pub struct Supplier<F> {
    supplier: F,
}

impl<F> Supplier<F> {
    pub fn new(supplier: F) -> Self {
        Self { supplier }
    }

    /// The wrapped supplier.
    pub fn supplier(&self) -> &F {
        &self.supplier
    }
}

impl<S, F> Factory<S> for Supplier<F>
where
    S: ?Sized,
    F: Fn() -> Arc<S> + Send + Sync,
{
    fn build(&self, _resolver: &dyn DependencyResolver) -> Result<Arc<S>> {
        Ok((self.supplier)())
    }
}

impl<F> fmt::Debug for Supplier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supplier")
            .field("supplier", &std::any::type_name::<F>())
            .finish()
    }
}

type InvokeFn = Arc<dyn Fn(&dyn DependencyResolver) -> Result<Instance> + Send + Sync>;

/// A registered factory with its service type erased.
///
/// Keeps the typed `Arc<dyn Factory<S>>` alongside so `add_default_factory`
/// can hand back the factory that is in effect.
#[derive(Clone)]
pub struct FactoryEntry {
    produces: TypeKey,
    invoke: InvokeFn,
    typed: Arc<dyn Any + Send + Sync>,
}

impl FactoryEntry {
    pub fn new<S: ?Sized + Send + Sync + 'static>(factory: Arc<dyn Factory<S>>) -> Self {
        let typed: Arc<dyn Any + Send + Sync> = Arc::new(factory.clone());

        Self {
            produces: TypeKey::of::<S>(),
            invoke: Arc::new(move |resolver: &dyn DependencyResolver| {
                factory.build(resolver).map(Instance::new)
            }),
            typed,
        }
    }

    /// The service type this factory builds.
    pub fn produces(&self) -> &TypeKey {
        &self.produces
    }

    /// Runs the factory once.
    pub fn invoke(&self, resolver: &dyn DependencyResolver) -> Result<Instance> {
        (self.invoke)(resolver)
    }

    /// The factory as registered, if it builds `S`.
    pub fn typed<S: ?Sized + 'static>(&self) -> Option<Arc<dyn Factory<S>>> {
        self.typed.downcast_ref::<Arc<dyn Factory<S>>>().cloned()
    }
}

impl fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryEntry")
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}
