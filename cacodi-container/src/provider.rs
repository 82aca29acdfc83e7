//! Provider trait: a module of related registrations.
//!
//! Providers group the factories, instances and implementation mappings of
//! one area of an application, and are applied when the resolver is built.
//!
//! # Examples
//! ```rust,ignore
//! struct StorageProvider;
//!
//! impl Provider for StorageProvider {
//!     fn register(&self, resolver: &Resolver) -> Result<()> {
//!         resolver.add_supplier::<Database, _>(|| Arc::new(Database::connect("postgres://localhost")));
//!         resolver.implement::<dyn Repository, PostgresRepository>()
//!     }
//! }
//! ```

use crate::error::Result;
use crate::resolver::Resolver;

/// A module that registers related dependencies into a resolver.
///
/// Instead of one giant registration block, split registrations by domain
/// and hand each provider to
/// [`ResolverBuilder::add_provider`](crate::resolver::ResolverBuilder::add_provider).
pub trait Provider: Send + Sync {
    /// Registers this provider's dependencies.
    ///
    /// Called once, in the order providers were added. An error aborts
    /// the build.
    fn register(&self, resolver: &Resolver) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
