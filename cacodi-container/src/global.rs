//! The process-wide resolver.
//!
//! Created on first use with the default configuration, or once up front
//! with [`init_global`]. Never replaced afterwards.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::config::ResolverConfig;
use crate::error::{CacodiError, Result};
use crate::resolver::Resolver;

static GLOBAL: OnceCell<Arc<Resolver>> = OnceCell::new();

/// The process-wide resolver, created with defaults if nothing else has
/// created it yet.
///
/// ```
/// use std::sync::Arc;
/// use cacodi_container::global::global;
///
/// assert!(Arc::ptr_eq(global(), global()));
/// ```
pub fn global() -> &'static Arc<Resolver> {
    GLOBAL.get_or_init(|| {
        info!("Creating global resolver");
        Resolver::new()
    })
}

/// Creates the process-wide resolver with `config`.
///
/// # Errors
/// [`CacodiError::GlobalAlreadyInitialized`] if it already exists, either
/// from an earlier call or from [`global`].
pub fn init_global(config: ResolverConfig) -> Result<&'static Arc<Resolver>> {
    let resolver = Resolver::builder().config(config).build()?;
    GLOBAL
        .try_insert(resolver)
        .map_err(|_| CacodiError::GlobalAlreadyInitialized)
}
