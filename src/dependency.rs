use core::fmt::{self, Display, Formatter};

use crate::{
    any::{qualifier_display, ServiceKey, TypeInfo},
    parameter::ParameterReference,
};

/// What an argument of a factory or an injected function asks for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Annotation {
    Service(ServiceKey),
    Parameter(ParameterReference),
    Context(TypeInfo),
}

impl Display for Annotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Service(ServiceKey { type_info, qualifier }) => {
                write!(f, "service {type_info} with qualifier {}", qualifier_display(qualifier))
            }
            Annotation::Parameter(reference) => write!(f, "parameter '{reference}'"),
            Annotation::Context(type_info) => write!(f, "context value {type_info}"),
        }
    }
}

/// An argument of a factory or an injected function together with its annotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AnnotatedParameter {
    /// Position of the argument in the signature
    pub position: usize,
    /// Declared type of the argument, for example `Inject<Db>`
    pub declared: TypeInfo,
    pub annotation: Annotation,
}

impl AnnotatedParameter {
    #[inline]
    #[must_use]
    pub const fn is_parameter(&self) -> bool {
        matches!(self.annotation, Annotation::Parameter(_))
    }

    #[inline]
    #[must_use]
    pub const fn service_key(&self) -> Option<&ServiceKey> {
        match &self.annotation {
            Annotation::Service(key) => Some(key),
            _ => None,
        }
    }
}
