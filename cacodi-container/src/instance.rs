//! Type-erased shared instances.
//!
//! Every value the resolver hands out is an `Arc<T>`. The registry stores
//! those arcs behind [`Instance`] so that sized types and trait objects live
//! in the same maps.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::TypeKey;

/// A resolved value, stored as `Arc<T>` behind `dyn Any`.
///
/// Cloning an `Instance` clones the handle, never the value: every clone
/// downcasts to the same `Arc<T>` allocation.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    runtime_type: TypeKey,
}

impl Instance {
    /// Wraps a shared value. The runtime type is `T` until told otherwise.
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            runtime_type: TypeKey::of::<T>(),
        }
    }

    /// Records the concrete type behind an upcast trait object.
    pub fn with_runtime_type(mut self, runtime_type: TypeKey) -> Self {
        self.runtime_type = runtime_type;
        self
    }

    /// The concrete type the value was built as.
    pub fn runtime_type(&self) -> &TypeKey {
        &self.runtime_type
    }

    /// Returns the stored `Arc<T>` if this instance holds one.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns `true` if both handles point at the same stored value.
    pub fn same_as(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Mutable access to the value, granted only while nothing else holds it.
    ///
    /// `None` when either this handle or the inner `Arc<T>` is shared, or
    /// when the instance is not a `T`.
    pub(crate) fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        Arc::get_mut(&mut self.value)?
            .downcast_mut::<Arc<T>>()
            .and_then(Arc::get_mut)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("runtime_type", &self.runtime_type)
            .finish_non_exhaustive()
    }
}

/// Conversion of an implementing type into a requested interface type.
///
/// Every type converts into itself. `#[injectable(implements(Trait))]`
/// generates `Upcast<dyn Trait>` for the annotated type; by hand it reads:
///
/// ```
/// use std::sync::Arc;
/// use cacodi_container::instance::Upcast;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".into()
///     }
/// }
///
/// impl Upcast<dyn Greeter> for English {
///     fn upcast(self: Arc<Self>) -> Arc<dyn Greeter> {
///         self
///     }
/// }
///
/// let greeter: Arc<dyn Greeter> = Arc::new(English).upcast();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub trait Upcast<I: ?Sized> {
    fn upcast(self: Arc<Self>) -> Arc<I>;
}

impl<T: ?Sized> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}
