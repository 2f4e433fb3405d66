use crate::any::{qualifier_display, TypeInfo};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationErrorKind {
    #[error("Cannot register type {type_info} with qualifier '{}' as it already exists.", qualifier_display(.qualifier))]
    DuplicateService {
        type_info: TypeInfo,
        qualifier: Option<&'static str>,
    },
}
