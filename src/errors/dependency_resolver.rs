use alloc::boxed::Box;
use core::any::TypeId;

use super::{instantiate::InstantiateErrorKind, instantiator::InstantiatorErrorKind, parameter::ParameterErrorKind};
use crate::{
    any::{qualifier_display, TypeInfo},
    lifetime::Lifetime,
};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Unknown service requested: {type_info} with qualifier {}", qualifier_display(.qualifier))]
    UnknownService {
        type_info: TypeInfo,
        qualifier: Option<&'static str>,
    },
    #[error(
        "Cannot create '{lifetime}' lifetime objects from the root container. \
        Please enter a scope first. Requested: {type_info}"
    )]
    ScopeRequired { type_info: TypeInfo, lifetime: Lifetime },
    #[error("{type_info} is only available within a scope entered with it in context")]
    NotInContext { type_info: TypeInfo },
    #[error("Incorrect instantiator provides type. Actual: {actual:?}, expected: {expected:?}")]
    IncorrectType { expected: TypeId, actual: TypeId },
    #[error(transparent)]
    Parameter(#[from] ParameterErrorKind),
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}
