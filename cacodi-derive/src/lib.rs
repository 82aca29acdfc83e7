//! Declaration macros for cacodi, re-exported for the facade crate.

pub use cacodi_macros::{Inject, injectable};
