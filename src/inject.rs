use alloc::{string::String, sync::Arc};
use core::{marker::PhantomData, ops::Deref};

use crate::{
    any::{ServiceKey, TypeInfo},
    container::Resolver,
    dependency::Annotation,
    dependency_resolver::DependencyResolver,
    errors::ResolveErrorKind,
    parameter::ParameterReference,
};

/// Qualifier of a registration, declared with [`crate::qualifier!`]
pub trait Qualifier: 'static {
    const NAME: &'static str;
}

/// Name of a parameter, declared with [`crate::param!`]
pub trait ParamName: 'static {
    const NAME: &'static str;
}

/// Template of an interpolated parameter expression, declared with [`crate::expr!`]
pub trait ParamExpr: 'static {
    const TEMPLATE: &'static str;
}

/// Service registered without a qualifier
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
        resolver.get(None).map(Self)
    }

    #[inline]
    fn annotation() -> Option<Annotation> {
        Some(Annotation::Service(ServiceKey::of::<Dep>(None)))
    }
}

impl<Dep> Deref for Inject<Dep> {
    type Target = Dep;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Service registered with the qualifier `Q`
pub struct InjectQualified<Dep, Q>(pub Arc<Dep>, pub PhantomData<Q>);

impl<Dep: Send + Sync + 'static, Q: Qualifier> DependencyResolver for InjectQualified<Dep, Q> {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
        resolver.get(Some(Q::NAME)).map(|dependency| Self(dependency, PhantomData))
    }

    #[inline]
    fn annotation() -> Option<Annotation> {
        Some(Annotation::Service(ServiceKey::of::<Dep>(Some(Q::NAME))))
    }
}

impl<Dep, Q> Deref for InjectQualified<Dep, Q> {
    type Target = Dep;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Copy of the parameter `K` from the [`crate::ParameterBag`]
pub struct Param<T, K>(pub T, pub PhantomData<K>);

impl<T: Clone + 'static, K: ParamName> DependencyResolver for Param<T, K> {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
        Ok(Self(resolver.params().get(K::NAME)?, PhantomData))
    }

    #[inline]
    fn annotation() -> Option<Annotation> {
        Some(Annotation::Parameter(ParameterReference::Typed(K::NAME, TypeInfo::of::<T>())))
    }
}

impl<T, K> Deref for Param<T, K> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The template `E` with its placeholders replaced by parameters
pub struct Expr<E>(pub String, pub PhantomData<E>);

impl<E: ParamExpr> DependencyResolver for Expr<E> {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
        Ok(Self(resolver.params().interpolate(E::TEMPLATE)?, PhantomData))
    }

    #[inline]
    fn annotation() -> Option<Annotation> {
        Some(Annotation::Parameter(ParameterReference::Template(E::TEMPLATE)))
    }
}

impl<E> Deref for Expr<E> {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Value the current scope was entered with, see [`crate::Container::enter_scope_with_context`]
pub struct FromContext<T>(pub Arc<T>);

impl<T: Send + Sync + 'static> DependencyResolver for FromContext<T> {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
        resolver.context().map(Self)
    }

    #[inline]
    fn annotation() -> Option<Annotation> {
        Some(Annotation::Context(TypeInfo::of::<T>()))
    }
}

impl<T> Deref for FromContext<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Declares a qualifier for [`InjectQualified`]
///
/// # Examples
/// ```rust
/// use wireup::{qualifier, Qualifier as _};
///
/// qualifier!(pub Replica = "replica");
///
/// assert_eq!(Replica::NAME, "replica");
/// ```
#[macro_export]
macro_rules! qualifier {
    ($(#[$meta:meta])* $vis:vis $name:ident = $value:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::Qualifier for $name {
            const NAME: &'static str = $value;
        }
    };
}

/// Declares a parameter name for [`Param`]
///
/// # Examples
/// ```rust
/// use wireup::{param, Container, Lifetime, Param, ParameterBag, Registry};
///
/// param!(Port = "port");
///
/// struct Server(u16);
///
/// let container = Container::new(
///     Registry::new().provide(|Param(port, _): Param<u16, Port>| Ok(Server(port)), Lifetime::Singleton),
///     ParameterBag::new().with("port", 8080u16),
/// )
/// .unwrap();
/// assert_eq!(container.get::<Server>().unwrap().0, 8080);
/// ```
#[macro_export]
macro_rules! param {
    ($(#[$meta:meta])* $vis:vis $name:ident = $value:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::ParamName for $name {
            const NAME: &'static str = $value;
        }
    };
}

/// Declares a template for [`Expr`]
#[macro_export]
macro_rules! expr {
    ($(#[$meta:meta])* $vis:vis $name:ident = $value:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::ParamExpr for $name {
            const TEMPLATE: &'static str = $value;
        }
    };
}
