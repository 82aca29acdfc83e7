//! Core resolver implementation for cacodi DI.

pub mod capability;
pub mod config;
pub mod error;
pub mod factory;
pub mod global;
mod inflight;
pub mod instance;
pub mod key;
pub mod metadata;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use capability::{
    CachingResolver, DependencyResolver, FactoryInvokingResolver, InterfaceMappingResolver,
    ResolveExt, ResolverApi,
};
pub use config::{FactoryFieldPolicy, ResolverConfig};
pub use error::{CacodiError, Result};
pub use factory::{Factory, Supplier};
pub use global::{global, init_global};
pub use instance::{Instance, Upcast};
pub use key::TypeKey;
pub use metadata::Inspector;
pub use provider::Provider;
pub use resolver::{Resolver, ResolverBuilder, prelude};

/// Items used by code the declaration macros generate. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use inventory;

    pub use crate::error::BoxError;
    pub use crate::instance::Upcast;
    pub use crate::key::TypeKey;
    pub use crate::metadata::{
        Arguments, Constructor, FieldInjector, MetadataSource, TypeMetadata, Visibility,
    };
}
