#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod autowire;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dependency;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod lifetime;
pub(crate) mod parameter;
pub(crate) mod registry;
pub(crate) mod service;

pub mod validation;

pub use any::{ServiceKey, TypeInfo};
pub use autowire::{Autowired, Handler};
pub use config::Config;
pub use container::{Container, OverrideGuard, Resolver, ScopedContainer};
pub use context::Context;
pub use dependency::{AnnotatedParameter, Annotation};
pub use dependency_resolver::DependencyResolver;
pub use errors::{
    DFSErrorKind, InstantiateErrorKind, InstantiatorErrorKind, ParameterErrorKind, RegistrationErrorKind, ResolveErrorKind, ValidationErrorKind,
};
pub use finalizer::Finalizer;
pub use inject::{Expr, FromContext, Inject, InjectQualified, Param, ParamExpr, ParamName, Qualifier};
pub use instantiator::{instance, Instantiator};
pub use lifetime::Lifetime;
pub use parameter::{ParameterBag, ParameterReference};
pub use registry::{InstantiatorData, Registry};

#[doc(hidden)]
pub mod __private {
    pub use alloc::boxed::Box;
}
