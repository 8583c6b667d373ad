use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolchestError {
    #[error("Null target: {0}")]
    NullTarget(String),
    #[error("Error while trying to access field {field}")]
    Access { field: String, reason: String },
    #[error("Unable to assign the value to field: {field}. Ensure that this field is of the correct type. Value: {value}")]
    TypeMismatch { field: String, value: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid class: {0}")]
    InvalidClass(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, ToolchestError>;

// Helper conversions
impl From<config::ConfigError> for ToolchestError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for ToolchestError {
    fn from(e: serde_json::Error) -> Self { Self::InvalidArgument(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for ToolchestError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
