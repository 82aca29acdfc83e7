//! # cacodi: caching constructor-injection for Rust
//!
//! A resolver that builds objects by walking their constructors, injects
//! `#[inject]` fields after construction, and caches every result so each
//! type is built at most once per resolver.
//!
//! Types describe themselves with two declaration markers:
//!
//! ```
//! use std::sync::Arc;
//! use cacodi::prelude::*;
//! use cacodi::{Inject, injectable};
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Inject)]
//! pub struct English {
//!     name: Arc<String>,
//!     #[inject]
//!     punctuation: Option<Arc<char>>,
//! }
//!
//! #[injectable(implements(Greeter))]
//! impl English {
//!     pub fn new(name: Arc<String>) -> Self {
//!         Self { name, punctuation: None }
//!     }
//! }
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         let mark = self.punctuation.as_deref().copied().unwrap_or('.');
//!         format!("Hello, {}{mark}", self.name)
//!     }
//! }
//!
//! let resolver = Resolver::new();
//! resolver.add::<String, _>(Arc::new(String::from("world")));
//! resolver.add::<char, _>(Arc::new('!'));
//! resolver.implement::<dyn Greeter, English>()?;
//!
//! let greeter = resolver.get::<dyn Greeter>()?;
//! assert_eq!(greeter.greet(), "Hello, world!");
//! assert!(Arc::ptr_eq(&greeter, &resolver.get::<dyn Greeter>()?));
//! # Ok::<(), cacodi::CacodiError>(())
//! ```
//!
//! ## Crates
//! * `cacodi-container` - resolver, registry, descriptors and errors
//! * `cacodi-derive` - `#[injectable]` and `#[derive(Inject)]`
//! * `cacodi-support` - logging setup and diagnostic rendering

pub use cacodi_container::*;
pub use cacodi_derive::*;
pub use cacodi_support::*;
