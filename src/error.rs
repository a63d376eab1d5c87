use thiserror::Error;

/// Main error type for c4trace operations
#[derive(Error, Debug)]
pub enum TracerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A type the model or an entry selector promised does not exist
    #[error("Type {0} was not found in any loaded module")]
    MissingType(String),

    /// The traversal reached a class that does not declare the expected overload
    #[error("Method {signature} was not found in type {owner}")]
    MissingMethod { signature: String, owner: String },

    #[error("Unsupported call container {container} of kind {kind}")]
    UnsupportedContainer { container: String, kind: String },
}

pub type Result<T> = std::result::Result<T, TracerError>;
