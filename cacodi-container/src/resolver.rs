//! # The Resolver: heart of cacodi
//!
//! Returns cached instances, runs registered factories, or builds a type
//! through its constructors, resolving every parameter and injectable
//! field through itself.
//!
//! # Architecture
//! ```text
//! get::<T>() ──> cache ──hit──────────────────────────────────> Arc<T>
//!                  │ miss
//!                  ▼
//!            factory for T? ──yes──> build ─> inject fields ──┐
//!                  │ no                                       │
//!                  ▼                                          ▼
//!            implementing type ─> constructors ─> inject ─> upcast ─> cache
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use cacodi_container::prelude::*;
//!
//! struct Clock;
//! struct Scheduler {
//!     clock: Arc<Clock>,
//! }
//!
//! let resolver = Resolver::builder()
//!     .describe(TypeMetadata::of::<Clock>().constructor(Constructor::new(
//!         "new",
//!         Visibility::Public,
//!         vec![],
//!         |_| Ok(Clock),
//!     )))
//!     .describe(TypeMetadata::of::<Scheduler>().constructor(Constructor::new(
//!         "new",
//!         Visibility::Public,
//!         vec![TypeKey::of::<Clock>()],
//!         |args| Ok(Scheduler { clock: args.get(0)? }),
//!     )))
//!     .build()
//!     .expect("Failed to build resolver");
//!
//! let scheduler: Arc<Scheduler> = resolver.get().expect("Failed to resolve");
//! assert!(Arc::ptr_eq(&scheduler.clock, &resolver.get::<Clock>().unwrap()));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use cacodi_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace, warn};

use crate::capability::{
    CachingResolver, DependencyResolver, FactoryInvokingResolver, InterfaceMappingResolver,
    ResolveExt,
};
use crate::config::{FactoryFieldPolicy, ResolverConfig};
use crate::error::{
    AttemptError, CacodiError, Result, UninstantiableTypeError, UnresolvableDependencyError,
};
use crate::factory::{Factory, FactoryEntry};
use crate::inflight::ResolutionGuard;
use crate::instance::{Instance, Upcast};
use crate::key::TypeKey;
use crate::metadata::{Arguments, Constructor, FieldInjector, Inspector, TypeMetadata};
use crate::provider::Provider;
use crate::registry::{Implementation, Registry};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

const MAX_SUGGESTIONS: usize = 3;

// ============================================================
// ResolverBuilder
// ============================================================

/// Builds a [`Resolver`].
///
/// # Examples
/// ```rust,ignore
/// let resolver = Resolver::builder()
///     .detect_cycles(true)
///     .factory_field_failure(FactoryFieldPolicy::Fail)
///     .add_provider(StorageProvider)
///     .build()?;
/// ```
pub struct ResolverBuilder {
    config: ResolverConfig,
    inspector: Option<Arc<Inspector>>,
    descriptors: Vec<TypeMetadata>,
    registry: Registry,
    providers: Vec<Box<dyn Provider>>,
}

impl ResolverBuilder {
    fn new() -> Self {
        Self {
            config: ResolverConfig::default(),
            inspector: None,
            descriptors: Vec::new(),
            registry: Registry::new(),
            providers: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn detect_cycles(mut self, detect: bool) -> Self {
        self.config.detect_cycles = detect;
        self
    }

    pub fn factory_field_failure(mut self, policy: FactoryFieldPolicy) -> Self {
        self.config.factory_field_failure = policy;
        self
    }

    /// Uses `inspector` instead of discovering descriptors.
    pub fn inspector(mut self, inspector: Arc<Inspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Adds a hand-written descriptor.
    pub fn describe(mut self, metadata: TypeMetadata) -> Self {
        self.descriptors.push(metadata);
        self
    }

    /// Starts from an existing registry.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a [`Provider`] module, applied during [`build`](Self::build).
    pub fn add_provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Builds the resolver and applies every provider in order.
    ///
    /// # Errors
    /// The first error a provider returns.
    #[instrument(skip(self), name = "resolver_build")]
    pub fn build(mut self) -> Result<Arc<Resolver>> {
        let providers = std::mem::take(&mut self.providers);
        info!(providers = providers.len(), "Building resolver");

        let resolver = self.assemble();
        for provider in &providers {
            debug!(provider = provider.name(), "Applying provider");
            provider.register(&resolver)?;
        }

        info!(resolver = resolver.id, "Resolver built successfully ✓");
        Ok(resolver)
    }

    fn assemble(self) -> Arc<Resolver> {
        let inspector = self
            .inspector
            .unwrap_or_else(|| Arc::new(Inspector::discover()));
        for metadata in self.descriptors {
            inspector.register(metadata);
        }

        let resolver = Arc::new_cyclic(|this| Resolver {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            this: this.clone(),
            registry: self.registry,
            inspector,
            config: self.config,
        });

        resolver.registry.seed(
            TypeKey::of::<Inspector>(),
            Instance::new(resolver.inspector.clone()),
        );
        resolver
    }
}

// ============================================================
// Resolver
// ============================================================

/// Caching constructor-injection resolver.
///
/// Always handled through an `Arc`: requesting `Resolver` or
/// `dyn DependencyResolver` from it yields the resolver itself.
pub struct Resolver {
    id: usize,
    this: Weak<Resolver>,
    registry: Registry,
    inspector: Arc<Inspector>,
    config: ResolverConfig,
}

impl Resolver {
    /// A resolver over every descriptor the declaration macros emitted.
    ///
    /// Distinct from the process-wide [`global`](crate::global::global)
    /// resolver.
    pub fn new() -> Arc<Self> {
        ResolverBuilder::new().assemble()
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// A new resolver starting with every entry of `other`.
    ///
    /// Cached instances are shared; later registrations and descriptors on
    /// either side stay on that side.
    pub fn copy_of(other: &Resolver) -> Arc<Self> {
        debug!(from = other.id, "Copying resolver");
        ResolverBuilder::new()
            .registry(other.registry.clone())
            .inspector(Arc::new(other.inspector.as_ref().clone()))
            .config(other.config.clone())
            .assemble()
    }

    /// The process-wide resolver.
    pub fn global() -> &'static Arc<Resolver> {
        crate::global::global()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn inspector(&self) -> &Arc<Inspector> {
        &self.inspector
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Adds a descriptor to this resolver's inspector.
    pub fn describe(&self, metadata: TypeMetadata) {
        self.inspector.register(metadata);
    }

    fn self_entry(&self, key: &TypeKey) -> Option<Instance> {
        if *key == TypeKey::of::<Resolver>() {
            return self.this.upgrade().map(Instance::new);
        }
        if *key == TypeKey::of::<dyn DependencyResolver>() {
            return self
                .this
                .upgrade()
                .map(|this| Instance::new(this as Arc<dyn DependencyResolver>));
        }
        None
    }

    fn instantiate(
        &self,
        requested: &TypeKey,
        target: &TypeKey,
        implementation: Option<&Implementation>,
        required_by: Option<&TypeKey>,
    ) -> Result<Instance> {
        let mut attempts = 0;

        if let Some(factory) = self.registry.factory(target) {
            attempts += 1;
            let produced = factory.invoke(self)?;

            match self.inject_shared(target, produced) {
                Ok(instance) => return Ok(instance),
                Err(AttemptError::Dependency(err)) => return Err(err),
                Err(err) => match self.config.factory_field_failure {
                    FactoryFieldPolicy::FallThrough => {
                        warn!(key = %target, error = %err, "Discarding factory result, trying constructors");
                    }
                    FactoryFieldPolicy::Fail => {
                        warn!(key = %target, error = %err, "Factory result rejected");
                        return Err(self.unresolvable(requested, implementation, required_by, attempts));
                    }
                },
            }
        }

        if let Some(metadata) = self.inspector.metadata(target) {
            let fields = self.inspector.injectable_fields(target);

            for constructor in metadata.candidate_constructors() {
                attempts += 1;
                match self.construct(&metadata, &constructor, &fields) {
                    Ok(instance) => return Ok(instance),
                    Err(AttemptError::Dependency(err)) if err.is_circular() => return Err(err),
                    Err(err) => {
                        debug!(key = %target, constructor = constructor.name(), error = %err, "Constructor attempt failed");
                    }
                }
            }
        }

        Err(self.unresolvable(requested, implementation, required_by, attempts))
    }

    fn construct(
        &self,
        metadata: &TypeMetadata,
        constructor: &Constructor,
        fields: &[FieldInjector],
    ) -> std::result::Result<Instance, AttemptError> {
        if metadata.is_abstract() {
            return Err(AttemptError::Abstract {
                key: metadata.key().clone(),
            });
        }

        if !constructor.is_public() {
            return Err(AttemptError::Inaccessible {
                constructor: constructor.name(),
            });
        }

        let args = constructor
            .params()
            .iter()
            .map(|param| self.resolve_key(param))
            .collect::<Result<Vec<_>>>()
            .map_err(AttemptError::Dependency)?;

        let mut value = constructor.invoke(&Arguments::new(args))?;
        self.inject_fields(&mut *value, fields)?;

        metadata.seal(value).ok_or_else(|| AttemptError::Constructor {
            constructor: constructor.name(),
            source: format!("did not build a {}", metadata.key()).into(),
        })
    }

    fn inject_shared(
        &self,
        target: &TypeKey,
        mut produced: Instance,
    ) -> std::result::Result<Instance, AttemptError> {
        let fields = self.inspector.injectable_fields(target);
        if fields.is_empty() {
            return Ok(produced);
        }

        let Some(metadata) = self.inspector.metadata(target) else {
            return Ok(produced);
        };

        match metadata.shared_mut(&mut produced) {
            Some(value) => self.inject_fields(value, &fields)?,
            None => {
                warn!(key = %target, fields = fields.len(), "Factory result is shared, leaving injectable fields unset");
            }
        }
        Ok(produced)
    }

    fn inject_fields(
        &self,
        target: &mut (dyn Any + Send + Sync),
        fields: &[FieldInjector],
    ) -> std::result::Result<(), AttemptError> {
        for field in fields {
            let value = self
                .resolve_key(field.ty())
                .map_err(AttemptError::Dependency)?;
            field.set(target, value)?;
            trace!(field = field.name(), declared_on = %field.declared_on(), "Injected field");
        }
        Ok(())
    }

    fn unresolvable(
        &self,
        requested: &TypeKey,
        implementation: Option<&Implementation>,
        required_by: Option<&TypeKey>,
        attempts: usize,
    ) -> CacodiError {
        let implementation = implementation
            .map(|implementation| implementation.key().clone())
            .filter(|key| key != requested);

        let suggestions = if attempts == 0 {
            let mut known = self.inspector.known_types();
            known.extend(self.registry.registered_keys());
            let names: Vec<&str> = known.iter().map(TypeKey::type_name).collect();
            let mut suggestions = suggest_similar(requested.type_name(), &names, MAX_SUGGESTIONS);
            suggestions.dedup();
            suggestions
        } else {
            Vec::new()
        };

        debug!(key = %requested, attempts, "Unresolvable dependency");
        CacodiError::Unresolvable(UnresolvableDependencyError {
            requested: requested.clone(),
            implementation,
            required_by: required_by.cloned(),
            attempts,
            suggestions,
        })
    }

    fn checked_implementation<I, T>(&self) -> Result<Implementation>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        if !self.inspector.is_instantiable(&key) && !self.registry.has_factory(&key) {
            return Err(CacodiError::Uninstantiable(UninstantiableTypeError {
                interface: TypeKey::of::<I>(),
                implementation: key,
            }));
        }
        Ok(Implementation::of::<I, T>())
    }
}

impl DependencyResolver for Resolver {
    fn resolve_key(&self, key: &TypeKey) -> Result<Instance> {
        if let Some(hit) = self.registry.get(key) {
            return Ok(hit);
        }

        if let Some(this) = self.self_entry(key) {
            return Ok(this);
        }

        trace!(key = %key, "Resolving");
        let guard = ResolutionGuard::enter(self.id, key, self.config.detect_cycles)?;

        let implementation = if self.registry.has_factory(key) {
            None
        } else {
            self.registry.implementation(key)
        };
        let target = implementation
            .as_ref()
            .map_or(key, Implementation::key)
            .clone();

        let built = self.instantiate(key, &target, implementation.as_ref(), guard.required_by())?;

        let instance = match implementation {
            Some(ref implementation) if target != *key => {
                implementation
                    .upcast(built)
                    .ok_or_else(|| CacodiError::TypeMismatch {
                        key: key.clone(),
                        expected: key.type_name(),
                    })?
            }
            _ => built,
        };

        debug!(key = %key, runtime_type = %instance.runtime_type(), "Resolved");
        Ok(self.registry.cache_resolved(key.clone(), instance))
    }
}

impl CachingResolver for Resolver {
    fn add<I, T>(&self, instance: Arc<T>)
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static,
    {
        let instance = Instance::new(<T as Upcast<I>>::upcast(instance))
            .with_runtime_type(TypeKey::of::<T>());
        self.registry
            .add(TypeKey::of::<I>(), instance, Implementation::of::<I, T>());
    }

    fn add_default<I, T>(&self, instance: Arc<T>) -> Result<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static,
    {
        let instance = Instance::new(<T as Upcast<I>>::upcast(instance))
            .with_runtime_type(TypeKey::of::<T>());
        self.registry
            .add_default(TypeKey::of::<I>(), instance, Implementation::of::<I, T>());
        self.get::<I>()
    }
}

impl FactoryInvokingResolver for Resolver {
    fn add_factory<S, F>(&self, factory: F)
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static,
    {
        let factory: Arc<dyn Factory<S>> = Arc::new(factory);
        self.registry
            .add_factory(TypeKey::of::<S>(), FactoryEntry::new(factory));
    }

    fn add_default_factory<S, F>(&self, factory: F) -> Arc<dyn Factory<S>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static,
    {
        let factory: Arc<dyn Factory<S>> = Arc::new(factory);
        self.registry
            .add_default_factory(TypeKey::of::<S>(), FactoryEntry::new(factory.clone()))
            .typed::<S>()
            .unwrap_or(factory)
    }

    fn add_factory_type<S, F>(&self) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static,
    {
        let factory: Arc<F> = self.get::<F>()?;
        let factory: Arc<dyn Factory<S>> = factory;
        self.registry
            .add_factory(TypeKey::of::<S>(), FactoryEntry::new(factory));
        Ok(())
    }

    fn add_default_factory_type<S, F>(&self) -> Result<Arc<dyn Factory<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S> + 'static,
    {
        let key = TypeKey::of::<S>();
        if let Some(existing) = self.registry.factory(&key).and_then(|entry| entry.typed::<S>()) {
            return Ok(existing);
        }

        let factory: Arc<F> = self.get::<F>()?;
        let factory: Arc<dyn Factory<S>> = factory;
        Ok(self
            .registry
            .add_default_factory(key, FactoryEntry::new(factory.clone()))
            .typed::<S>()
            .unwrap_or(factory))
    }
}

impl InterfaceMappingResolver for Resolver {
    fn implement<I, T>(&self) -> Result<()>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static,
    {
        let implementation = self.checked_implementation::<I, T>()?;
        self.registry.implement(TypeKey::of::<I>(), implementation);
        Ok(())
    }

    fn implement_default<I, T>(&self) -> Result<TypeKey>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static,
    {
        let implementation = self.checked_implementation::<I, T>()?;
        let in_effect = self
            .registry
            .implement_default(TypeKey::of::<I>(), implementation);
        Ok(in_effect.key().clone())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("id", &self.id)
            .field("registry", &self.registry)
            .field("inspector", &self.inspector)
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================
// Prelude
// ============================================================

pub mod prelude {
    pub use super::{Resolver, ResolverBuilder};
    pub use crate::capability::{
        CachingResolver, DependencyResolver, FactoryInvokingResolver, InterfaceMappingResolver,
        ResolveExt, ResolverApi,
    };
    pub use crate::config::{FactoryFieldPolicy, ResolverConfig};
    pub use crate::error::{BoxError, CacodiError, Result};
    pub use crate::factory::{Factory, Supplier};
    pub use crate::global::{global, init_global};
    pub use crate::instance::{Instance, Upcast};
    pub use crate::key::TypeKey;
    pub use crate::metadata::{Constructor, FieldInjector, Inspector, TypeMetadata, Visibility};
    pub use crate::provider::Provider;
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::metadata::Visibility;
    use std::sync::atomic::AtomicU32;

    #[derive(Debug)]
    struct Nullary;

    #[derive(Debug)]
    struct Pair {
        left: Arc<Nullary>,
        right: Arc<Nullary>,
    }

    #[derive(Debug)]
    struct Complex {
        greeting: Arc<String>,
        count: Arc<i32>,
        field_dep: Option<Arc<String>>,
    }

    #[derive(Debug)]
    struct Hidden;

    #[derive(Debug)]
    struct Missing;

    #[derive(Debug)]
    struct NeedsMissing {
        _missing: Arc<Missing>,
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    impl Upcast<dyn Greeter> for English {
        fn upcast(self: Arc<Self>) -> Arc<dyn Greeter> {
            self
        }
    }

    struct Loud;

    impl Greeter for Loud {
        fn greet(&self) -> String {
            "HELLO".into()
        }
    }

    impl Upcast<dyn Greeter> for Loud {
        fn upcast(self: Arc<Self>) -> Arc<dyn Greeter> {
            self
        }
    }

    fn nullary() -> TypeMetadata {
        TypeMetadata::of::<Nullary>().constructor(Constructor::new(
            "new",
            Visibility::Public,
            vec![],
            |_| Ok(Nullary),
        ))
    }

    fn pair() -> TypeMetadata {
        TypeMetadata::of::<Pair>().constructor(Constructor::new(
            "new",
            Visibility::Public,
            vec![TypeKey::of::<Nullary>(), TypeKey::of::<Nullary>()],
            |args| {
                Ok(Pair {
                    left: args.get(0)?,
                    right: args.get(1)?,
                })
            },
        ))
    }

    fn complex() -> TypeMetadata {
        TypeMetadata::of::<Complex>()
            .constructor(Constructor::new(
                "new",
                Visibility::Public,
                vec![TypeKey::of::<String>(), TypeKey::of::<i32>()],
                |args| {
                    Ok(Complex {
                        greeting: args.get(0)?,
                        count: args.get(1)?,
                        field_dep: None,
                    })
                },
            ))
            .field(FieldInjector::new(
                "field_dep",
                |c: &mut Complex, v: Arc<String>| c.field_dep = Some(v),
            ))
    }

    fn english() -> TypeMetadata {
        TypeMetadata::of::<English>().constructor(Constructor::new(
            "new",
            Visibility::Public,
            vec![],
            |_| Ok(English),
        ))
    }

    fn resolver_with(descriptors: Vec<TypeMetadata>) -> Arc<Resolver> {
        descriptors
            .into_iter()
            .fold(
                Resolver::builder().inspector(Arc::new(Inspector::new())),
                ResolverBuilder::describe,
            )
            .build()
            .unwrap()
    }

    fn unresolvable(err: CacodiError) -> UnresolvableDependencyError {
        match err {
            CacodiError::Unresolvable(e) => e,
            other => panic!("Expected Unresolvable, got: {other:?}"),
        }
    }

    #[test]
    fn nullary_constructor_is_cached() {
        let resolver = resolver_with(vec![nullary()]);

        let a = resolver.get::<Nullary>().unwrap();
        let b = resolver.get::<Nullary>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn shared_dependency_is_the_same_instance() {
        let resolver = resolver_with(vec![nullary(), pair()]);

        let pair = resolver.get::<Pair>().unwrap();
        assert!(Arc::ptr_eq(&pair.left, &pair.right));
    }

    #[test]
    fn constructor_and_field_injection() {
        let resolver = resolver_with(vec![complex()]);
        resolver.add::<String, _>(Arc::new(String::from("hello")));
        resolver.add::<i32, _>(Arc::new(3));

        let complex = resolver.get::<Complex>().unwrap();
        assert_eq!(*complex.greeting, "hello");
        assert_eq!(*complex.count, 3);
        assert_eq!(complex.field_dep.as_deref().map(String::as_str), Some("hello"));
    }

    #[test]
    fn private_constructors_are_refused() {
        let resolver = resolver_with(vec![TypeMetadata::of::<Hidden>().constructor(
            Constructor::new("new", Visibility::Private, vec![], |_| Ok(Hidden)),
        )]);

        let err = unresolvable(resolver.get::<Hidden>().unwrap_err());
        assert_eq!(err.attempts, 1);
    }

    #[test]
    fn abstract_types_are_refused() {
        let resolver = resolver_with(vec![nullary().abstract_type()]);
        assert!(resolver.get::<Nullary>().unwrap_err().is_unresolvable());
    }

    #[test]
    fn trait_object_without_mapping_is_unresolvable() {
        let resolver = resolver_with(vec![]);
        let err = unresolvable(resolver.get::<dyn Greeter>().err().unwrap());
        assert_eq!(err.attempts, 0);
        assert_eq!(err.requested, TypeKey::of::<dyn Greeter>());
    }

    #[test]
    fn failing_constructor_falls_back_to_the_next() {
        let resolver = resolver_with(vec![TypeMetadata::of::<Nullary>()
            .constructor(Constructor::new("risky", Visibility::Public, vec![TypeKey::of::<u8>()], |_| {
                Err::<Nullary, _>("boom".into())
            }))
            .constructor(Constructor::new("safe", Visibility::Public, vec![TypeKey::of::<u8>()], |_| {
                Ok(Nullary)
            }))]);
        resolver.add::<u8, _>(Arc::new(1));

        assert!(resolver.get::<Nullary>().is_ok());
    }

    #[test]
    fn unresolvable_parameter_falls_back_to_nullary() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = calls.clone();

        let resolver = resolver_with(vec![TypeMetadata::of::<NeedsMissing>()
            .constructor(Constructor::new(
                "with_missing",
                Visibility::Public,
                vec![TypeKey::of::<Missing>()],
                |args| Ok(NeedsMissing { _missing: args.get(0)? }),
            ))
            .constructor(Constructor::new("empty", Visibility::Public, vec![], move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(NeedsMissing {
                    _missing: Arc::new(Missing),
                })
            }))]);

        assert!(resolver.get::<NeedsMissing>().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_constructors_are_skipped() {
        let resolver = resolver_with(vec![
            nullary(),
            TypeMetadata::of::<Pair>()
                .constructor(
                    Constructor::new("manual", Visibility::Public, vec![], |_| -> std::result::Result<Pair, BoxError> {
                        panic!("manual constructors are never invoked")
                    })
                    .manual(),
                )
                .constructor(Constructor::new(
                    "new",
                    Visibility::Public,
                    vec![TypeKey::of::<Nullary>()],
                    |args| {
                        let only = args.get::<Nullary>(0)?;
                        Ok(Pair {
                            left: only.clone(),
                            right: only,
                        })
                    },
                )),
        ]);

        assert!(resolver.get::<Pair>().is_ok());
    }

    #[test]
    fn all_manual_is_unresolvable() {
        let resolver = resolver_with(vec![TypeMetadata::of::<Nullary>()
            .constructor(Constructor::opaque("raw", Visibility::Public, vec![]))]);

        let err = unresolvable(resolver.get::<Nullary>().unwrap_err());
        assert_eq!(err.attempts, 0);
    }

    #[test]
    fn factory_output_is_cached() {
        let calls = Arc::new(AtomicU32::new(0));
        let resolver = resolver_with(vec![]);

        let counted = calls.clone();
        resolver.add_factory::<String, _>(move |_: &dyn DependencyResolver| -> Result<Arc<String>> {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new("made".into()))
        });

        let a = resolver.get::<String>().unwrap();
        let b = resolver.get::<String>().unwrap();
        assert_eq!(*a, "made");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_errors_propagate() {
        let resolver = resolver_with(vec![]);
        resolver.add_factory::<String, _>(|_: &dyn DependencyResolver| -> Result<Arc<String>> {
            Err(CacodiError::factory_failed::<String>("no disk"))
        });

        assert!(matches!(
            resolver.get::<String>().unwrap_err(),
            CacodiError::FactoryFailed { .. }
        ));
    }

    #[test]
    fn implement_maps_trait_to_type() {
        let resolver = resolver_with(vec![english()]);
        resolver.implement::<dyn Greeter, English>().unwrap();

        let greeter = resolver.get::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
        assert_eq!(
            resolver.registry().get(&TypeKey::of::<dyn Greeter>()).unwrap().runtime_type(),
            &TypeKey::of::<English>()
        );
        // Stored only under the requested type.
        assert!(resolver.registry().get(&TypeKey::of::<English>()).is_none());
    }

    #[test]
    fn factory_wins_over_implementation() {
        let resolver = resolver_with(vec![english()]);
        resolver.implement::<dyn Greeter, English>().unwrap();
        resolver.add_factory::<dyn Greeter, _>(|_: &dyn DependencyResolver| -> Result<Arc<dyn Greeter>> {
            Ok(Arc::new(Loud))
        });

        assert_eq!(resolver.get::<dyn Greeter>().unwrap().greet(), "HELLO");
    }

    #[test]
    fn implementing_type_may_have_a_factory() {
        let resolver = resolver_with(vec![]);
        resolver.add_supplier::<Loud, _>(|| Arc::new(Loud));
        resolver.implement::<dyn Greeter, Loud>().unwrap();

        assert_eq!(resolver.get::<dyn Greeter>().unwrap().greet(), "HELLO");
    }

    #[test]
    fn uninstantiable_implementations_are_rejected() {
        let resolver = resolver_with(vec![english().abstract_type()]);

        let err = resolver.implement::<dyn Greeter, English>().unwrap_err();
        assert!(matches!(err, CacodiError::Uninstantiable(_)));

        let err = resolver.implement_default::<dyn Greeter, Loud>().unwrap_err();
        assert!(matches!(err, CacodiError::Uninstantiable(_)));
    }

    #[test]
    fn implement_default_keeps_existing_mapping() {
        let resolver = resolver_with(vec![english()]);
        resolver.add_supplier::<Loud, _>(|| Arc::new(Loud));

        assert_eq!(
            resolver.implement_default::<dyn Greeter, English>().unwrap(),
            TypeKey::of::<English>()
        );
        assert_eq!(
            resolver.implement_default::<dyn Greeter, Loud>().unwrap(),
            TypeKey::of::<English>()
        );
    }

    #[test]
    fn add_default_is_a_no_op_when_present() {
        let resolver = resolver_with(vec![]);
        let first = Arc::new(String::from("first"));
        resolver.add::<String, _>(first.clone());

        let in_effect = resolver
            .add_default::<String, _>(Arc::new(String::from("second")))
            .unwrap();
        assert!(Arc::ptr_eq(&in_effect, &first));
    }

    #[test]
    fn add_default_inserts_when_absent() {
        let resolver = resolver_with(vec![]);
        let greeter = resolver
            .add_default::<dyn Greeter, _>(Arc::new(English))
            .unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn default_factory_returns_factory_in_effect() {
        let resolver = resolver_with(vec![]);
        let first = resolver.add_default_supplier::<String, _>(|| Arc::new("first".into()));
        let second = resolver.add_default_supplier::<String, _>(|| Arc::new("second".into()));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*resolver.get::<String>().unwrap(), "first");
    }

    #[test]
    fn factory_type_is_resolved_then_registered() {
        struct Greeting;

        impl Factory<String> for Greeting {
            fn build(&self, _: &dyn DependencyResolver) -> Result<Arc<String>> {
                Ok(Arc::new("from factory type".into()))
            }
        }

        let resolver = resolver_with(vec![TypeMetadata::of::<Greeting>().constructor(
            Constructor::new("new", Visibility::Public, vec![], |_| Ok(Greeting)),
        )]);

        resolver.add_factory_type::<String, Greeting>().unwrap();
        assert_eq!(*resolver.get::<String>().unwrap(), "from factory type");
    }

    #[test]
    fn default_factory_type_is_not_resolved_when_present() {
        struct Unbuildable;

        impl Factory<String> for Unbuildable {
            fn build(&self, _: &dyn DependencyResolver) -> Result<Arc<String>> {
                unreachable!()
            }
        }

        let resolver = resolver_with(vec![]);
        resolver.add_supplier::<String, _>(|| Arc::new("kept".into()));

        assert!(resolver.add_default_factory_type::<String, Unbuildable>().is_ok());
        assert_eq!(*resolver.get::<String>().unwrap(), "kept");

        let err = resolver.add_factory_type::<String, Unbuildable>().unwrap_err();
        assert!(err.is_unresolvable());
    }

    #[test]
    fn fields_of_shared_factory_results_stay_unset() {
        let resolver = resolver_with(vec![complex()]);
        resolver.add::<String, _>(Arc::new(String::from("field")));

        let kept = Arc::new(Complex {
            greeting: Arc::new("kept".into()),
            count: Arc::new(0),
            field_dep: None,
        });
        let shared = kept.clone();
        resolver.add_supplier::<Complex, _>(move || shared.clone());

        let complex = resolver.get::<Complex>().unwrap();
        assert!(Arc::ptr_eq(&complex, &kept));
        assert!(complex.field_dep.is_none());
    }

    #[test]
    fn fields_of_unique_factory_results_are_injected() {
        let resolver = resolver_with(vec![complex()]);
        resolver.add::<String, _>(Arc::new(String::from("field")));
        resolver.add_supplier::<Complex, _>(|| {
            Arc::new(Complex {
                greeting: Arc::new("made".into()),
                count: Arc::new(0),
                field_dep: None,
            })
        });

        let complex = resolver.get::<Complex>().unwrap();
        assert_eq!(*complex.greeting, "made");
        assert_eq!(complex.field_dep.as_deref().map(String::as_str), Some("field"));
    }

    fn broken_field() -> TypeMetadata {
        // The setter targets another type, so it can never apply.
        nullary().field(FieldInjector::new("broken", |_: &mut Pair, _: Arc<u8>| {}))
    }

    #[test]
    fn field_failure_on_factory_falls_through_to_constructors() {
        let resolver = resolver_with(vec![broken_field()]);
        resolver.add::<u8, _>(Arc::new(0));
        resolver.add_supplier::<Nullary, _>(|| Arc::new(Nullary));

        // The constructor path fails the same way, so nothing succeeds.
        let err = unresolvable(resolver.get::<Nullary>().unwrap_err());
        assert_eq!(err.attempts, 2);
    }

    #[test]
    fn field_failure_on_factory_can_fail_fast() {
        let resolver = Resolver::builder()
            .inspector(Arc::new(Inspector::new()))
            .describe(broken_field())
            .factory_field_failure(FactoryFieldPolicy::Fail)
            .build()
            .unwrap();
        resolver.add::<u8, _>(Arc::new(0));
        resolver.add_supplier::<Nullary, _>(|| Arc::new(Nullary));

        let err = unresolvable(resolver.get::<Nullary>().unwrap_err());
        assert_eq!(err.attempts, 1);
    }

    #[test]
    fn unresolvable_field_on_factory_propagates() {
        let resolver = resolver_with(vec![complex()]);
        resolver.add_supplier::<Complex, _>(|| {
            Arc::new(Complex {
                greeting: Arc::new("made".into()),
                count: Arc::new(0),
                field_dep: None,
            })
        });

        let err = unresolvable(resolver.get::<Complex>().unwrap_err());
        assert_eq!(err.requested, TypeKey::of::<String>());
        assert_eq!(err.required_by, Some(TypeKey::of::<Complex>()));
    }

    #[test]
    fn cycles_fail_cleanly() {
        #[derive(Debug)]
        struct Chicken;
        #[derive(Debug)]
        struct Egg;

        let resolver = resolver_with(vec![
            TypeMetadata::of::<Chicken>().constructor(Constructor::new(
                "new",
                Visibility::Public,
                vec![TypeKey::of::<Egg>()],
                |_| Ok(Chicken),
            )),
            TypeMetadata::of::<Egg>().constructor(Constructor::new(
                "new",
                Visibility::Public,
                vec![TypeKey::of::<Chicken>()],
                |_| Ok(Egg),
            )),
        ]);

        match resolver.get::<Chicken>().unwrap_err() {
            CacodiError::CircularDependency(cycle) => {
                assert_eq!(
                    cycle.chain,
                    vec![TypeKey::of::<Chicken>(), TypeKey::of::<Egg>(), TypeKey::of::<Chicken>()]
                );
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }

        // Nothing stays in flight after the failure.
        assert!(resolver.get::<Chicken>().unwrap_err().is_circular());
    }

    #[test]
    fn resolves_itself_and_its_inspector() {
        let resolver = resolver_with(vec![]);

        let this = resolver.get::<Resolver>().unwrap();
        assert!(Arc::ptr_eq(&this, &resolver));

        let dynamic = resolver.get::<dyn DependencyResolver>().unwrap();
        assert!(dynamic.resolve_key(&TypeKey::of::<Inspector>()).is_ok());

        let inspector = resolver.get::<Inspector>().unwrap();
        assert!(Arc::ptr_eq(&inspector, resolver.inspector()));
    }

    #[test]
    fn factories_receive_the_resolver() {
        let resolver = resolver_with(vec![nullary()]);
        resolver.add_factory::<Pair, _>(|r: &dyn DependencyResolver| -> Result<Arc<Pair>> {
            Ok(Arc::new(Pair {
                left: r.get()?,
                right: r.get()?,
            }))
        });

        let pair = resolver.get::<Pair>().unwrap();
        assert!(Arc::ptr_eq(&pair.left, &resolver.get::<Nullary>().unwrap()));
    }

    #[test]
    fn copy_shares_instances_but_not_later_changes() {
        let resolver = resolver_with(vec![nullary()]);
        let original = resolver.get::<Nullary>().unwrap();

        let copy = Resolver::copy_of(&resolver);
        assert!(Arc::ptr_eq(&copy.get::<Nullary>().unwrap(), &original));
        assert!(Arc::ptr_eq(&copy.get::<Resolver>().unwrap(), &copy));

        copy.add::<u8, _>(Arc::new(1));
        assert!(resolver.get::<u8>().is_err());
    }

    #[test]
    fn error_reports_requirer_and_suggestions() {
        let resolver = resolver_with(vec![
            TypeMetadata::of::<NeedsMissing>().constructor(Constructor::new(
                "new",
                Visibility::Public,
                vec![TypeKey::of::<Missing>()],
                |args| Ok(NeedsMissing { _missing: args.get(0)? }),
            )),
        ]);

        let outer = unresolvable(resolver.get::<NeedsMissing>().unwrap_err());
        assert_eq!(outer.attempts, 1);
        assert!(outer.suggestions.is_empty());

        let inner = unresolvable(resolver.resolve_key(&TypeKey::of::<Missing>()).unwrap_err());
        assert_eq!(inner.attempts, 0);
        assert!(inner.suggestions.iter().any(|s| s.contains("NeedsMissing")));
    }

    #[test]
    fn providers_run_at_build() {
        struct Defaults;

        impl Provider for Defaults {
            fn register(&self, resolver: &Resolver) -> Result<()> {
                resolver.add::<String, _>(Arc::new(String::from("provided")));
                Ok(())
            }
        }

        let resolver = Resolver::builder()
            .inspector(Arc::new(Inspector::new()))
            .add_provider(Defaults)
            .build()
            .unwrap();

        assert_eq!(*resolver.get::<String>().unwrap(), "provided");
    }

    #[test]
    fn debug_display() {
        let resolver = resolver_with(vec![nullary()]);
        let debug = format!("{resolver:?}");
        assert!(debug.contains("Resolver"));
        assert!(debug.contains("cached: 1"));
    }
}
