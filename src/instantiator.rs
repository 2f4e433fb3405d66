use alloc::{sync::Arc, vec::Vec};
use tracing::debug;

use super::{
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, InstantiatorErrorKind},
    service::{service_fn, BoxCloneService},
};
use crate::{
    any::{RcAny, TypeInfo},
    container::Resolver,
    dependency::AnnotatedParameter,
    dependency_resolver::annotated_parameters,
};

/// Factory of a service. Implemented for closures whose arguments are [`DependencyResolver`]s.
pub trait Instantiator<Deps>: Clone + 'static
where
    Deps: DependencyResolver,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&mut self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;

    /// Annotated arguments of the factory in signature order
    fn dependencies() -> Vec<AnnotatedParameter>;
}

pub(crate) type BoxedCloneInstantiator<DepsErr, FactoryErr> = BoxCloneService<Resolver, RcAny, InstantiatorErrorKind<DepsErr, FactoryErr>>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedCloneInstantiator<Deps::Error, Inst::Error>
where
    Inst: Instantiator<Deps> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver,
{
    BoxCloneService::new(service_fn(move |resolver: Resolver| {
        let dependencies = match Deps::resolve(&resolver) {
            Ok(dependencies) => dependencies,
            Err(err) => return Err(InstantiatorErrorKind::Deps(err)),
        };
        let dependency = match instantiator.clone().instantiate(dependencies) {
            Ok(dependency) => dependency,
            Err(err) => return Err(InstantiatorErrorKind::Factory(err)),
        };

        debug!("Resolved");

        Ok(Arc::new(dependency) as RcAny)
    }))
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> Result<Response, Err> + Clone + 'static,
            Response: 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver + 'static, )*
        {
            type Provides = Response;
            type Error = Err;

            fn instantiate(&mut self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }

            #[inline]
            fn dependencies() -> Vec<AnnotatedParameter> {
                annotated_parameters(&[$( (TypeInfo::of::<$ty>(), $ty::annotation()) ),*])
            }
        }
    };
}

all_the_tuples!(impl_instantiator);

/// Wrapper to create an instantiator that just returns passed value.
/// It can be used when the value was created outside the container.
#[inline]
#[must_use]
pub fn instance<T: Clone + Send + Sync + 'static>(val: T) -> impl Instantiator<(), Provides = T, Error = InstantiateErrorKind> + Send + Sync {
    move || Ok(val.clone())
}

/// Creates a `Box<dyn Trait>` from a value, so a factory can provide an implementation behind an interface.
///
/// # Examples
/// ```rust
/// use wireup::boxed;
///
/// trait UserRepo {}
///
/// struct PostgresUserRepo;
///
/// impl UserRepo for PostgresUserRepo {}
///
/// let repo: Box<dyn UserRepo + Send + Sync> = boxed!(PostgresUserRepo; UserRepo + Send + Sync);
/// ```
#[macro_export]
macro_rules! boxed {
    ($val:expr ; $($bounds:tt)+) => {{
        $crate::__private::Box::new($val) as $crate::__private::Box<dyn $($bounds)+>
    }};
}
