use alloc::vec::Vec;
use core::marker::PhantomData;
use tracing::{debug, error, info_span};

use crate::{
    any::TypeInfo,
    container::{Container, ScopedContainer},
    dependency::AnnotatedParameter,
    dependency_resolver::{annotated_parameters, DependencyResolver},
    errors::ResolveErrorKind,
};

/// Function whose arguments are injected by the container, see [`Container::autowire`]
pub trait Handler<Deps>: Clone + 'static
where
    Deps: DependencyResolver,
{
    type Output;

    fn call(&mut self, dependencies: Deps) -> Self::Output;

    /// Annotated arguments of the function in signature order
    fn dependencies() -> Vec<AnnotatedParameter>;
}

macro_rules! impl_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> R + Clone + 'static,
            $( $ty: DependencyResolver + 'static, )*
        {
            type Output = R;

            #[inline]
            fn call(&mut self, ($($ty,)*): ($($ty,)*)) -> Self::Output {
                self($($ty,)*)
            }

            #[inline]
            fn dependencies() -> Vec<AnnotatedParameter> {
                annotated_parameters(&[$( (TypeInfo::of::<$ty>(), $ty::annotation()) ),*])
            }
        }
    };
}

all_the_tuples!(impl_handler);

/// Function bound to a container. Its dependencies were checked by [`Container::autowire`].
pub struct Autowired<H, Deps> {
    handler: H,
    container: Container,
    dependencies: Vec<AnnotatedParameter>,
    _deps: PhantomData<fn() -> Deps>,
}

impl<H: Clone, Deps> Clone for Autowired<H, Deps> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            container: self.container.clone(),
            dependencies: self.dependencies.clone(),
            _deps: PhantomData,
        }
    }
}

impl<H, Deps> Autowired<H, Deps>
where
    H: Handler<Deps>,
    Deps: DependencyResolver,
{
    #[inline]
    pub(crate) const fn new(handler: H, container: Container, dependencies: Vec<AnnotatedParameter>) -> Self {
        Self {
            handler,
            container,
            dependencies,
            _deps: PhantomData,
        }
    }

    /// Calls the function in a new scope, which is closed right after the call
    ///
    /// # Errors
    /// Returns the error of the first argument that can't be resolved
    pub fn call(&self) -> Result<H::Output, ResolveErrorKind> {
        let scope = self.container.enter_scope();
        let output = self.call_in(&scope);
        scope.close();
        output
    }

    /// Calls the function in a scope managed by the caller, for example the scope of the current request
    ///
    /// # Errors
    /// Returns the error of the first argument that can't be resolved
    pub fn call_in(&self, scope: &ScopedContainer) -> Result<H::Output, ResolveErrorKind> {
        let span = info_span!("call", handler = TypeInfo::of::<H>().short_name());
        let _guard = span.enter();

        let dependencies = Deps::resolve(&scope.resolver()).map_err(|err| {
            let err: ResolveErrorKind = err.into();
            error!("{}", err);
            err
        })?;
        debug!("Dependencies resolved");

        Ok(self.handler.clone().call(dependencies))
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[AnnotatedParameter] {
        &self.dependencies
    }

    #[inline]
    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }
}
