use alloc::{format, string::String};

use super::{instantiator::DFSErrorKind, registration::RegistrationErrorKind};
use crate::{
    any::{qualifier_display, TypeInfo},
    lifetime::Lifetime,
};

/// Configuration errors found while building a container or wrapping a function for injection.
#[derive(thiserror::Error, Debug)]
pub enum ValidationErrorKind {
    #[error(transparent)]
    Registration(#[from] RegistrationErrorKind),
    #[error(
        "Parameter '#{position}' of {target} depends on an unknown service {dependency} with qualifier {}.",
        qualifier_display(.qualifier)
    )]
    UnknownService {
        position: usize,
        target: String,
        dependency: TypeInfo,
        qualifier: Option<&'static str>,
    },
    #[error(
        "Parameter '#{position}' of {target} depends on an unknown parameter '{parameter}'{}.",
        expression_suffix(.expression)
    )]
    UnknownParameter {
        position: usize,
        target: String,
        parameter: String,
        expression: Option<String>,
    },
    #[error(
        "Parameter '#{position}' of {target} reads parameter '{parameter}' as {expected}, but it was put with another type."
    )]
    IncorrectParameterType {
        position: usize,
        target: String,
        parameter: String,
        expected: &'static str,
    },
    #[error(
        "Parameter '#{position}' of {target} depends on a service with a '{lifetime}' lifetime which is not supported. \
        Singletons can only depend on other singletons."
    )]
    InvalidLifetime {
        position: usize,
        target: String,
        lifetime: Lifetime,
    },
    #[error(transparent)]
    CyclicDependency(#[from] DFSErrorKind),
}

fn expression_suffix(expression: &Option<String>) -> String {
    match expression {
        Some(expression) => format!(" requested in expression '{expression}'"),
        None => String::new(),
    }
}
