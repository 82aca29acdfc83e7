//! Type descriptors: what the resolver knows about building a type.
//!
//! A [`TypeMetadata`] lists a type's constructors, its injectable fields and
//! an optional embedded ancestor whose fields are injected as well. The
//! `#[injectable]` and `#[derive(Inject)]` macros emit descriptors into an
//! [`inventory`] collection; [`Inspector::discover`] gathers them. Tests and
//! applications without the macros build descriptors by hand.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use cacodi_container::key::TypeKey;
//! use cacodi_container::metadata::{Constructor, FieldInjector, Inspector, TypeMetadata, Visibility};
//!
//! struct Greeting {
//!     text: Arc<String>,
//!     suffix: Option<Arc<char>>,
//! }
//!
//! let inspector = Inspector::new();
//! inspector.register(
//!     TypeMetadata::of::<Greeting>()
//!         .constructor(Constructor::new(
//!             "new",
//!             Visibility::Public,
//!             vec![TypeKey::of::<String>()],
//!             |args| Ok(Greeting { text: args.get::<String>(0)?, suffix: None }),
//!         ))
//!         .field(FieldInjector::new("suffix", |g: &mut Greeting, v: Arc<char>| g.suffix = Some(v))),
//! );
//!
//! let key = TypeKey::of::<Greeting>();
//! assert_eq!(inspector.candidate_constructors(&key).len(), 1);
//! assert_eq!(inspector.injectable_fields(&key).len(), 1);
//! ```

use std::any::{Any, type_name};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{AttemptError, BoxError, FieldAccessError};
use crate::instance::Instance;
use crate::key::TypeKey;

type ConstructFn =
    Arc<dyn Fn(&Arguments) -> Result<Box<dyn Any + Send + Sync>, BoxError> + Send + Sync>;

type SetFn = Arc<
    dyn Fn(&mut (dyn Any + Send + Sync), Instance) -> Result<(), FieldAccessError> + Send + Sync,
>;

type AccessFn = Arc<
    dyn for<'a> Fn(&'a mut (dyn Any + Send + Sync)) -> Option<&'a mut (dyn Any + Send + Sync)>
        + Send
        + Sync,
>;

type SealFn = fn(Box<dyn Any + Send + Sync>) -> Option<Instance>;

type SharedMutFn = fn(&mut Instance) -> Option<&mut (dyn Any + Send + Sync)>;

// ============================================================
// Constructors
// ============================================================

/// Whether the resolver may call a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

/// One way to build a type from resolved parameters.
#[derive(Clone)]
pub struct Constructor {
    name: &'static str,
    visibility: Visibility,
    params: Vec<TypeKey>,
    manual: bool,
    position: Option<(u32, u32)>,
    invoke: Option<ConstructFn>,
}

impl Constructor {
    /// A constructor taking the instances of `params`, in order.
    pub fn new<T, F>(
        name: &'static str,
        visibility: Visibility,
        params: Vec<TypeKey>,
        body: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            name,
            visibility,
            params,
            manual: false,
            position: None,
            invoke: Some(Arc::new(move |args: &Arguments| {
                body(args).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
            })),
        }
    }

    /// A constructor the resolver knows about but can never call.
    ///
    /// Always manual.
    pub fn opaque(name: &'static str, visibility: Visibility, params: Vec<TypeKey>) -> Self {
        Self {
            name,
            visibility,
            params,
            manual: true,
            position: None,
            invoke: None,
        }
    }

    /// Marks the constructor as manual: it is never a candidate.
    pub fn manual(mut self) -> Self {
        self.manual = true;
        self
    }

    /// Records where the constructor is declared, as a line and column.
    ///
    /// Descriptors merged from several sources keep their constructors
    /// sorted by this position.
    pub fn declared_at(mut self, line: u32, column: u32) -> Self {
        self.position = Some((line, column));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn position(&self) -> Option<(u32, u32)> {
        self.position
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn is_nullary(&self) -> bool {
        self.params.is_empty()
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub(crate) fn invoke(
        &self,
        args: &Arguments,
    ) -> Result<Box<dyn Any + Send + Sync>, AttemptError> {
        let Some(ref body) = self.invoke else {
            return Err(AttemptError::Inaccessible {
                constructor: self.name,
            });
        };

        body(args).map_err(|source| AttemptError::Constructor {
            constructor: self.name,
            source,
        })
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("params", &self.params)
            .field("manual", &self.manual)
            .field("position", &self.position)
            .finish()
    }
}

/// Resolved constructor parameters, in declaration order.
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Instance>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Instance>) -> Self {
        Self { values }
    }

    /// The parameter at `index`, as an `Arc<T>`.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| BoxError::from(format!("missing argument {index}")))?;

        value.downcast::<T>().ok_or_else(|| {
            BoxError::from(format!(
                "argument {index} is a {}, not a {}",
                value.runtime_type(),
                type_name::<T>()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================
// Fields
// ============================================================

/// Sets one injectable field on a freshly built instance.
#[derive(Clone)]
pub struct FieldInjector {
    name: &'static str,
    declared_on: TypeKey,
    ty: TypeKey,
    set: SetFn,
}

impl FieldInjector {
    /// A field of `T` that receives an `Arc<V>`.
    pub fn new<T, V, F>(name: &'static str, setter: F) -> Self
    where
        T: Send + Sync + 'static,
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<V>) + Send + Sync + 'static,
    {
        let declared_on = TypeKey::of::<T>();
        let expected = TypeKey::of::<V>();

        Self {
            name,
            declared_on: declared_on.clone(),
            ty: expected.clone(),
            set: Arc::new(move |target: &mut (dyn Any + Send + Sync), value: Instance| {
                let target = target.downcast_mut::<T>().ok_or_else(|| {
                    FieldAccessError::TargetMismatch {
                        field: name,
                        declared_on: declared_on.clone(),
                    }
                })?;

                let value = value.downcast::<V>().ok_or_else(|| FieldAccessError::ValueMismatch {
                    field: name,
                    expected: expected.clone(),
                })?;

                setter(target, value);
                Ok(())
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type whose declaration carries the field.
    pub fn declared_on(&self) -> &TypeKey {
        &self.declared_on
    }

    /// The type resolved and stored into the field.
    pub fn ty(&self) -> &TypeKey {
        &self.ty
    }

    /// Stores `value` into the field of `target`.
    pub fn set(
        &self,
        target: &mut (dyn Any + Send + Sync),
        value: Instance,
    ) -> Result<(), FieldAccessError> {
        (self.set)(target, value)
    }

    /// The same field, applied through the embedded ancestor reached by `parent`.
    fn lifted(&self, parent: &Parent) -> Self {
        let inner = self.set.clone();
        let access = parent.access.clone();
        let ancestor = parent.key.clone();
        let field = self.name;

        Self {
            name: self.name,
            declared_on: self.declared_on.clone(),
            ty: self.ty.clone(),
            set: Arc::new(move |target: &mut (dyn Any + Send + Sync), value: Instance| {
                let embedded = access(target).ok_or_else(|| FieldAccessError::AncestorUnreachable {
                    field,
                    ancestor: ancestor.clone(),
                })?;
                inner(embedded, value)
            }),
        }
    }
}

impl fmt::Debug for FieldInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInjector")
            .field("name", &self.name)
            .field("declared_on", &self.declared_on)
            .field("ty", &self.ty)
            .finish()
    }
}

#[derive(Clone)]
struct Parent {
    key: TypeKey,
    access: AccessFn,
}

fn access_fn<F>(access: F) -> F
where
    F: for<'a> Fn(&'a mut (dyn Any + Send + Sync)) -> Option<&'a mut (dyn Any + Send + Sync)>
        + Send
        + Sync
        + 'static,
{
    access
}

fn seal<T: Send + Sync + 'static>(value: Box<dyn Any + Send + Sync>) -> Option<Instance> {
    value
        .downcast::<T>()
        .ok()
        .map(|value| Instance::new(Arc::<T>::from(value)))
}

fn shared_mut<T: Send + Sync + 'static>(instance: &mut Instance) -> Option<&mut (dyn Any + Send + Sync)> {
    instance
        .get_mut::<T>()
        .map(|value| value as &mut (dyn Any + Send + Sync))
}

// ============================================================
// TypeMetadata
// ============================================================

/// Everything the resolver needs to know to build one type.
#[derive(Clone)]
pub struct TypeMetadata {
    key: TypeKey,
    abstract_type: bool,
    constructors: Vec<Constructor>,
    fields: Vec<FieldInjector>,
    parent: Option<Parent>,
    seal: SealFn,
    shared_mut: SharedMutFn,
}

impl TypeMetadata {
    /// An empty descriptor for `T`.
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            abstract_type: false,
            constructors: Vec::new(),
            fields: Vec::new(),
            parent: None,
            seal: seal::<T>,
            shared_mut: shared_mut::<T>,
        }
    }

    /// Appends a constructor. Declaration order is preference order.
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Appends an injectable field declared on this type.
    pub fn field(mut self, field: FieldInjector) -> Self {
        self.fields.push(field);
        self
    }

    /// Names the embedded ancestor whose injectable fields are injected too.
    pub fn parent<C, P, F>(mut self, access: F) -> Self
    where
        C: Send + Sync + 'static,
        P: Send + Sync + 'static,
        F: for<'a> Fn(&'a mut C) -> &'a mut P + Send + Sync + 'static,
    {
        let access = access_fn(move |target: &mut (dyn Any + Send + Sync)| {
            target
                .downcast_mut::<C>()
                .map(|child| access(child) as &mut (dyn Any + Send + Sync))
        });

        self.parent = Some(Parent {
            key: TypeKey::of::<P>(),
            access: Arc::new(access),
        });
        self
    }

    /// Marks the type abstract: it is described but never instantiated.
    pub fn abstract_type(mut self) -> Self {
        self.abstract_type = true;
        self
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn is_abstract(&self) -> bool {
        self.abstract_type
    }

    /// Every declared constructor, manual ones included.
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Fields declared on this type itself.
    pub fn fields(&self) -> &[FieldInjector] {
        &self.fields
    }

    /// The embedded ancestor type, if any.
    pub fn parent_key(&self) -> Option<&TypeKey> {
        self.parent.as_ref().map(|parent| &parent.key)
    }

    /// Constructors the resolver may try, best first.
    ///
    /// The first non-manual nullary constructor leads, whatever its
    /// visibility. Every other public non-manual constructor follows in
    /// declaration order.
    pub fn candidate_constructors(&self) -> Vec<Constructor> {
        let nullary = self
            .constructors
            .iter()
            .position(|c| !c.manual && c.is_nullary());

        let mut candidates = Vec::with_capacity(self.constructors.len());
        if let Some(index) = nullary {
            candidates.push(self.constructors[index].clone());
        }

        candidates.extend(
            self.constructors
                .iter()
                .enumerate()
                .filter(|&(index, c)| Some(index) != nullary && !c.manual && c.is_public())
                .map(|(_, c)| c.clone()),
        );
        candidates
    }

    /// Folds another descriptor for the same type into this one.
    ///
    /// Constructors and fields append; a parent link replaces the current one.
    /// When every constructor carries a declaration position, the merged list
    /// is ordered by it, so the order sources arrive in does not matter.
    pub fn merge(&mut self, other: TypeMetadata) {
        debug_assert_eq!(self.key, other.key);

        self.abstract_type |= other.abstract_type;
        self.constructors.extend(other.constructors);
        if self.constructors.iter().all(|c| c.position.is_some()) {
            self.constructors.sort_by_key(|c| c.position);
        }
        self.fields.extend(other.fields);
        if other.parent.is_some() {
            self.parent = other.parent;
        }
    }

    pub(crate) fn seal(&self, value: Box<dyn Any + Send + Sync>) -> Option<Instance> {
        (self.seal)(value)
    }

    pub(crate) fn shared_mut<'a>(
        &self,
        instance: &'a mut Instance,
    ) -> Option<&'a mut (dyn Any + Send + Sync)> {
        (self.shared_mut)(instance)
    }
}

impl fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("key", &self.key)
            .field("abstract", &self.abstract_type)
            .field("constructors", &self.constructors)
            .field("fields", &self.fields)
            .field("parent", &self.parent_key())
            .finish()
    }
}

/// A descriptor submitted at compile time by the declaration macros.
pub struct MetadataSource {
    describe: fn() -> TypeMetadata,
}

impl MetadataSource {
    pub const fn new(describe: fn() -> TypeMetadata) -> Self {
        Self { describe }
    }

    pub fn describe(&self) -> TypeMetadata {
        (self.describe)()
    }
}

inventory::collect!(MetadataSource);

// ============================================================
// Inspector
// ============================================================

/// Catalogue of type descriptors.
///
/// Lookups never fail: an unknown type simply has no constructors and no
/// fields.
#[derive(Default)]
pub struct Inspector {
    types: RwLock<HashMap<TypeKey, TypeMetadata>>,
}

impl Inspector {
    /// An empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalogue of every descriptor emitted by the declaration macros.
    pub fn discover() -> Self {
        let inspector = Self::new();
        for source in inventory::iter::<MetadataSource> {
            inspector.register(source.describe());
        }
        debug!(types = inspector.types.read().len(), "Discovered type metadata");
        inspector
    }

    /// Adds a descriptor, merging with any already known for the type.
    pub fn register(&self, metadata: TypeMetadata) {
        let mut types = self.types.write();
        match types.get_mut(&metadata.key) {
            Some(existing) => existing.merge(metadata),
            None => {
                types.insert(metadata.key.clone(), metadata);
            }
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(self, metadata: TypeMetadata) -> Self {
        self.register(metadata);
        self
    }

    /// The descriptor for `key`, if one is known.
    pub fn metadata(&self, key: &TypeKey) -> Option<TypeMetadata> {
        self.types.read().get(key).cloned()
    }

    /// See [`TypeMetadata::candidate_constructors`].
    pub fn candidate_constructors(&self, key: &TypeKey) -> Vec<Constructor> {
        self.types
            .read()
            .get(key)
            .map(TypeMetadata::candidate_constructors)
            .unwrap_or_default()
    }

    /// Fields declared on the type, then those of each ancestor in turn.
    ///
    /// Ancestor fields are wrapped so they apply to an instance of `key`.
    pub fn injectable_fields(&self, key: &TypeKey) -> Vec<FieldInjector> {
        let types = self.types.read();
        let mut fields = Vec::new();
        let mut visited = HashSet::new();
        collect_fields(&types, key, &mut visited, &mut fields);
        fields
    }

    /// Whether the resolver could ever build `key` from constructors.
    ///
    /// Manual constructors count: the type is concrete even if the
    /// resolver will not call them.
    pub fn is_instantiable(&self, key: &TypeKey) -> bool {
        self.types
            .read()
            .get(key)
            .is_some_and(|meta| !meta.abstract_type && !meta.constructors.is_empty())
    }

    /// Every described type.
    pub fn known_types(&self) -> Vec<TypeKey> {
        self.types.read().keys().cloned().collect()
    }
}

fn collect_fields(
    types: &HashMap<TypeKey, TypeMetadata>,
    key: &TypeKey,
    visited: &mut HashSet<TypeKey>,
    out: &mut Vec<FieldInjector>,
) {
    if !visited.insert(key.clone()) {
        return;
    }

    let Some(meta) = types.get(key) else {
        return;
    };

    out.extend(meta.fields.iter().cloned());

    if let Some(ref parent) = meta.parent {
        let mut inherited = Vec::new();
        collect_fields(types, &parent.key, visited, &mut inherited);
        out.extend(inherited.iter().map(|field| field.lifted(parent)));
    }
}

/// A deep copy: later registrations on either catalogue stay on that side.
impl Clone for Inspector {
    fn clone(&self) -> Self {
        Self {
            types: RwLock::new(self.types.read().clone()),
        }
    }
}

impl fmt::Debug for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspector")
            .field("types", &self.types.read().len())
            .finish()
    }
}
