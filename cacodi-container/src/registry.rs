//! Resolver state: cached instances, implementation mappings and factories.
//!
//! The registry is a plain store. It never builds anything; the
//! [`Resolver`](crate::resolver::Resolver) decides what to put in it.
//! Cloning a registry copies every entry into new maps, so the copy shares
//! cached instances but not future registrations.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

use crate::factory::FactoryEntry;
use crate::instance::{Instance, Upcast};
use crate::key::TypeKey;

type UpcastFn = Arc<dyn Fn(Instance) -> Option<Instance> + Send + Sync>;

/// The implementing type registered for a requested type.
///
/// Carries the conversion from an instance of the implementing type into
/// the requested one.
#[derive(Clone)]
pub struct Implementation {
    key: TypeKey,
    upcast: UpcastFn,
}

impl Implementation {
    /// `T` implements `I`.
    pub fn of<I, T>() -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Upcast<I> + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let runtime_type = key.clone();

        Self {
            key,
            upcast: Arc::new(move |instance: Instance| {
                let concrete = instance.downcast::<T>()?;
                let runtime_type = runtime_type.clone();
                Some(Instance::new(<T as Upcast<I>>::upcast(concrete)).with_runtime_type(runtime_type))
            }),
        }
    }

    /// The implementing type.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Converts an instance of the implementing type into the requested type.
    pub fn upcast(&self, instance: Instance) -> Option<Instance> {
        (self.upcast)(instance)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Implementation").field(&self.key).finish()
    }
}

/// Instance cache, implementation map and factory map of one resolver.
#[derive(Clone, Default)]
pub struct Registry {
    cache: DashMap<TypeKey, Instance>,
    implementations: DashMap<TypeKey, Implementation>,
    factories: DashMap<TypeKey, FactoryEntry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance for `key`. Never builds anything.
    pub fn get(&self, key: &TypeKey) -> Option<Instance> {
        let hit = self.cache.get(key).map(|entry| entry.value().clone());
        if hit.is_some() {
            trace!(key = %key, "Cache hit");
        }
        hit
    }

    /// Stores `instance` under `iface`, replacing any cached value, and
    /// records `implementation` as its implementing type.
    pub fn add(&self, iface: TypeKey, instance: Instance, implementation: Implementation) {
        debug!(key = %iface, implementation = %implementation.key(), "Added instance");
        self.cache.insert(iface.clone(), instance);
        self.implementations.insert(iface, implementation);
    }

    /// Like [`add`](Self::add), but only if no implementation is registered
    /// for `iface`. Returns whether anything was stored.
    pub fn add_default(
        &self,
        iface: TypeKey,
        instance: Instance,
        implementation: Implementation,
    ) -> bool {
        match self.implementations.entry(iface.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                debug!(key = %iface, implementation = %implementation.key(), "Added default instance");
                vacant.insert(implementation);
                self.cache.insert(iface, instance);
                true
            }
        }
    }

    /// Registers `factory` for `key`, replacing any previous factory.
    pub fn add_factory(&self, key: TypeKey, factory: FactoryEntry) {
        debug!(key = %key, "Registered factory");
        self.factories.insert(key, factory);
    }

    /// Registers `factory` unless one exists. Returns the factory in effect.
    pub fn add_default_factory(&self, key: TypeKey, factory: FactoryEntry) -> FactoryEntry {
        match self.factories.entry(key) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                debug!(key = %vacant.key(), "Registered default factory");
                vacant.insert(factory).value().clone()
            }
        }
    }

    /// Maps `key` to `implementation`, replacing any previous mapping.
    pub fn implement(&self, key: TypeKey, implementation: Implementation) {
        debug!(key = %key, implementation = %implementation.key(), "Registered implementation");
        self.implementations.insert(key, implementation);
    }

    /// Maps `key` to `implementation` unless mapped. Returns the mapping in effect.
    pub fn implement_default(&self, key: TypeKey, implementation: Implementation) -> Implementation {
        match self.implementations.entry(key) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                debug!(key = %vacant.key(), implementation = %implementation.key(), "Registered default implementation");
                vacant.insert(implementation).value().clone()
            }
        }
    }

    /// The factory registered for `key`.
    pub fn factory(&self, key: &TypeKey) -> Option<FactoryEntry> {
        self.factories.get(key).map(|entry| entry.value().clone())
    }

    pub fn has_factory(&self, key: &TypeKey) -> bool {
        self.factories.contains_key(key)
    }

    /// The implementation mapped for `key`.
    pub fn implementation(&self, key: &TypeKey) -> Option<Implementation> {
        self.implementations.get(key).map(|entry| entry.value().clone())
    }

    /// Caches a freshly resolved instance unless another one got there
    /// first. Returns the cached instance.
    pub fn cache_resolved(&self, key: TypeKey, instance: Instance) -> Instance {
        self.cache.entry(key).or_insert(instance).value().clone()
    }

    /// Caches `instance` without touching the implementation map.
    pub(crate) fn seed(&self, key: TypeKey, instance: Instance) {
        self.cache.insert(key, instance);
    }

    /// Number of cached instances.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Number of registered factories.
    pub fn factories(&self) -> usize {
        self.factories.len()
    }

    /// Number of implementation mappings.
    pub fn implementations(&self) -> usize {
        self.implementations.len()
    }

    /// Every key with a cached instance, a factory or a mapping.
    pub fn registered_keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.cache.iter().map(|e| e.key().clone()).collect();
        keys.extend(self.factories.iter().map(|e| e.key().clone()));
        keys.extend(self.implementations.iter().map(|e| e.key().clone()));
        keys.sort_by_key(|key| key.type_name());
        keys.dedup();
        keys
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("cached", &self.cached())
            .field("implementations", &self.implementations())
            .field("factories", &self.factories())
            .finish()
    }
}
