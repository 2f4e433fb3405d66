use alloc::string::String;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterErrorKind {
    #[error("Unknown parameter requested: {name}")]
    Unknown { name: String },
    #[error("Parameter {name} is not of the requested type {expected}")]
    IncorrectType { name: String, expected: &'static str },
}
