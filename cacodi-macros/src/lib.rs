//! Procedural macros for cacodi.
//!
//! Declaration markers that describe types to the resolver:
//! * `#[injectable]` - constructors of an inherent impl block
//! * `#[derive(Inject)]` - injectable fields and the embedded ancestor
//!
//! Both emit a `TypeMetadata` descriptor collected through `inventory`.
//! Generated code refers to `::cacodi`, so depend on the facade crate.

use proc_macro::TokenStream;

/// Field descriptor derive.
mod fields;
/// Constructor descriptor attribute.
mod injectable;
mod types;

/// Declares the constructors of a type.
///
/// Every associated fn of the block without a receiver that returns `Self`
/// (or `Result<Self, E>` with `E: Into<BoxError>`) is a constructor. Any
/// `pub` constructor, `pub(crate)` and other restricted forms included, is
/// public; the rest are private. Parameters must be `Arc<T>`
/// and are resolved as `T`. Constructors marked `#[manual]` are recorded
/// but never called. Constructors spread over several `#[injectable]`
/// blocks of one type keep their declaration order within a file.
///
/// Arguments:
/// * `implements(Trait, ...)` - generates `Upcast<dyn Trait>` so the type
///   can be mapped to the trait object
/// * `abstract_type` - the type is described but never instantiated
///
/// ```ignore
/// #[injectable(implements(Greeter))]
/// impl English {
///     pub fn new(name: Arc<String>) -> Self {
///         Self { name }
///     }
///
///     #[manual]
///     pub fn with_name(name: &str) -> Self {
///         Self { name: Arc::new(name.to_owned()) }
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn injectable(args: TokenStream, input: TokenStream) -> TokenStream {
    injectable::injectable(args, input)
}

/// Derives the injectable fields of a struct.
///
/// Attributes:
/// * `#[inject]` - on an `Option<Arc<T>>` field, set to the resolved `T`
///   after construction
/// * `#[parent]` - on at most one field, the embedded ancestor whose own
///   injectable fields are set as well
///
/// ```ignore
/// #[derive(Inject)]
/// pub struct Service {
///     #[parent]
///     base: BaseService,
///     #[inject]
///     clock: Option<Arc<dyn Clock>>,
/// }
/// ```
#[proc_macro_derive(Inject, attributes(inject, parent))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    fields::derive_inject(input)
}
