use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Partition error: {0}")]
    Partition(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A single test cannot run on this sample (e.g. all paired differences are zero).
    #[error("Degenerate sample: {0}")]
    DegenerateSample(String),

    /// The whole block cannot be tested.
    #[error("Degenerate block '{method}': {reason}")]
    DegenerateBlock { method: String, reason: String },

    #[error("Singular design matrix: {0}")]
    SingularDesign(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn degenerate_block(method: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::DegenerateBlock {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}
