//! Types shared by the integration tests, declared through the macros.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use cacodi::prelude::*;
use cacodi::{Inject, injectable};

/// The error a failing resolution produced.
pub fn failure<T: ?Sized>(result: Result<Arc<T>>) -> CacodiError {
    match result {
        Ok(_) => panic!("Expected {} to be unresolvable", std::any::type_name::<T>()),
        Err(err) => err,
    }
}

#[derive(Debug)]
pub struct Nullary;

#[injectable]
impl Nullary {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug)]
pub struct SimpleImplicit {
    pub left: Option<Arc<Nullary>>,
    pub right: Option<Arc<Nullary>>,
}

#[injectable]
impl SimpleImplicit {
    pub fn new(left: Arc<Nullary>, right: Arc<Nullary>) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }
}

#[derive(Debug, Inject)]
pub struct Complex {
    pub one: Arc<Nullary>,
    pub other: Arc<SimpleImplicit>,
    pub count: i32,
    #[inject]
    pub field_dep: Option<Arc<String>>,
}

#[injectable]
impl Complex {
    pub fn new(one: Arc<Nullary>, other: Arc<SimpleImplicit>, count: Arc<i32>) -> Self {
        Self {
            one,
            other,
            count: *count,
            field_dep: None,
        }
    }
}

/// Embeds `Complex` and inherits its injectable field.
#[derive(Debug, Inject)]
pub struct ComplexNested {
    #[parent]
    pub base: Complex,
}

#[injectable]
impl ComplexNested {
    pub fn new(one: Arc<Nullary>, other: Arc<SimpleImplicit>, count: Arc<i32>) -> Self {
        Self {
            base: Complex::new(one, other, count),
        }
    }
}

#[derive(Debug, Inject)]
pub struct Greeting {
    pub text: Arc<String>,
    pub count: i32,
    #[inject]
    pub field_text: Option<Arc<String>>,
}

#[injectable]
impl Greeting {
    pub fn new(text: Arc<String>, count: Arc<i32>) -> Self {
        Self {
            text,
            count: *count,
            field_text: None,
        }
    }
}

#[derive(Debug)]
pub struct PrivateConstructor;

#[injectable]
impl PrivateConstructor {
    fn new() -> Self {
        Self
    }
}

#[derive(Debug)]
pub struct RiskyConstructor;

#[injectable]
impl RiskyConstructor {
    pub fn new() -> std::result::Result<Self, io::Error> {
        Err(io::Error::other("refusing to be built"))
    }
}

#[derive(Debug)]
pub struct PrivateDependent {
    pub dep: Arc<PrivateConstructor>,
}

#[injectable]
impl PrivateDependent {
    pub fn new(dep: Arc<PrivateConstructor>) -> Self {
        Self { dep }
    }
}

/// Has no descriptor at all.
#[derive(Debug)]
pub struct Undescribed;

#[derive(Debug)]
pub struct AbstractBase;

#[injectable(abstract_type)]
impl AbstractBase {
    pub fn new() -> Self {
        Self
    }
}

/// Its constructor is visible to the crate only.
#[derive(Debug)]
pub struct CrateVisible;

#[injectable]
impl CrateVisible {
    pub(crate) fn new() -> Self {
        Self
    }
}

/// Constructors declared across two impl blocks.
#[derive(Debug)]
pub struct TwoBlocks {
    pub made_by: &'static str,
}

#[injectable]
impl TwoBlocks {
    pub fn first(_seed: Arc<u8>) -> Self {
        Self { made_by: "first" }
    }
}

#[injectable]
impl TwoBlocks {
    pub fn second(_seed: Arc<u8>) -> Self {
        Self { made_by: "second" }
    }
}

#[derive(Debug)]
pub struct ManualConstructor {
    pub cpx: Option<Arc<Nullary>>,
}

#[injectable]
impl ManualConstructor {
    #[manual]
    pub fn empty() -> Self {
        panic!("Manual constructors are never called")
    }

    pub fn new(cpx: Arc<Nullary>) -> Self {
        Self { cpx: Some(cpx) }
    }
}

#[derive(Debug)]
pub struct OnlyManual;

#[injectable]
impl OnlyManual {
    #[manual]
    pub fn new() -> Self {
        panic!("Manual constructors are never called")
    }

    #[manual]
    pub fn named(name: &str) -> Self {
        panic!("Manual constructors are never called: {name}")
    }
}

/// Prefers a constructor that cannot be satisfied, falls back to the
/// nullary one.
#[derive(Debug)]
pub struct Fallback {
    pub dep: Option<Arc<Undescribed>>,
}

#[injectable]
impl Fallback {
    pub fn with_dep(dep: Arc<Undescribed>) -> Self {
        Self { dep: Some(dep) }
    }

    pub fn new() -> Self {
        Self { dep: None }
    }
}

#[derive(Debug)]
pub struct Chicken {
    pub egg: Arc<Egg>,
}

#[injectable]
impl Chicken {
    pub fn new(egg: Arc<Egg>) -> Self {
        Self { egg }
    }
}

#[derive(Debug)]
pub struct Egg {
    pub chicken: Arc<Chicken>,
}

#[injectable]
impl Egg {
    pub fn new(chicken: Arc<Chicken>) -> Self {
        Self { chicken }
    }
}

pub trait ThingDoer: Send + Sync {
    fn do_thing(&self) -> String;
}

#[derive(Debug)]
pub struct ThingDoerImpl;

#[injectable(implements(ThingDoer))]
impl ThingDoerImpl {
    pub fn new() -> Self {
        Self
    }
}

impl ThingDoer for ThingDoerImpl {
    fn do_thing(&self) -> String {
        String::from("implemented stuff")
    }
}

/// A second buildable implementation.
#[derive(Debug)]
pub struct LoudThingDoer;

#[injectable(implements(ThingDoer))]
impl LoudThingDoer {
    pub fn new() -> Self {
        Self
    }
}

impl ThingDoer for LoudThingDoer {
    fn do_thing(&self) -> String {
        String::from("IMPLEMENTED STUFF")
    }
}

pub struct OtherThing;

impl ThingDoer for OtherThing {
    fn do_thing(&self) -> String {
        String::from("other stuff")
    }
}

/// Implements the trait but has nothing the resolver could call.
pub struct UnbuildableThing;

impl ThingDoer for UnbuildableThing {
    fn do_thing(&self) -> String {
        String::from("never")
    }
}

impl Upcast<dyn ThingDoer> for UnbuildableThing {
    fn upcast(self: Arc<Self>) -> Arc<dyn ThingDoer> {
        self
    }
}

#[derive(Debug, PartialEq)]
pub struct Banner(pub String);

/// A factory built by the resolver itself.
pub struct BannerFactory {
    prefix: Arc<String>,
}

#[injectable]
impl BannerFactory {
    pub fn new(prefix: Arc<String>) -> Self {
        Self { prefix }
    }
}

impl Factory<Banner> for BannerFactory {
    fn build(&self, resolver: &dyn DependencyResolver) -> Result<Arc<Banner>> {
        let count = resolver.get::<i32>()?;
        Ok(Arc::new(Banner(format!("{} x{count}", self.prefix))))
    }
}

/// A factory type without a descriptor.
pub struct UnbuildableFactory;

impl Factory<Banner> for UnbuildableFactory {
    fn build(&self, _resolver: &dyn DependencyResolver) -> Result<Arc<Banner>> {
        Ok(Arc::new(Banner(String::from("unreachable"))))
    }
}
