mod dependency_resolver;
mod instantiate;
mod instantiator;
mod parameter;
mod registration;
mod validation;

pub use dependency_resolver::ResolveErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use instantiator::{DFSErrorKind, InstantiatorErrorKind};
pub use parameter::ParameterErrorKind;
pub use registration::RegistrationErrorKind;
pub use validation::ValidationErrorKind;
