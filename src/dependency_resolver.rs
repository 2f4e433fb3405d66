use alloc::vec::Vec;

use super::errors::ResolveErrorKind;
use crate::{
    any::TypeInfo,
    container::Resolver,
    dependency::{AnnotatedParameter, Annotation},
};

/// Argument of a factory or an injected function.
///
/// The implementor both builds itself from the container and describes, through [`Self::annotation`],
/// what it asks the container for, so the dependency graph can be checked before anything is created.
/// Resolvers without an annotation aren't validated.
pub trait DependencyResolver: Sized {
    type Error: Into<ResolveErrorKind>;

    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error>;

    #[inline]
    #[must_use]
    fn annotation() -> Option<Annotation> {
        None
    }
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            type Error = ResolveErrorKind;

            #[inline]
            #[allow(unused_variables)]
            fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
                Ok(($($ty::resolve(resolver).map_err(Into::into)?,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);

/// Builds the ordered list of annotated arguments of a signature.
/// Positions count every argument, including those without an annotation.
#[must_use]
pub(crate) fn annotated_parameters(arguments: &[(TypeInfo, Option<Annotation>)]) -> Vec<AnnotatedParameter> {
    arguments
        .iter()
        .enumerate()
        .filter_map(|(position, (declared, annotation))| {
            annotation.clone().map(|annotation| AnnotatedParameter {
                position,
                declared: *declared,
                annotation,
            })
        })
        .collect()
}
