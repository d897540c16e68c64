use exmldoc::ExmlError;
use thiserror::Error;

/// Errors raised by the syntax preset.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// Reading or building the underlying document failed.
    #[error(transparent)]
    Document(#[from] ExmlError),

    /// A `sentence:node` reference without the separator.
    #[error("malformed node reference '{0}'")]
    NodeRef(String),

    /// A parsed sentence that cannot be turned into document objects.
    #[error("malformed tree {sentence}: {message}")]
    Tree { sentence: String, message: String },
}

pub type SyntaxResult<T> = Result<T, SyntaxError>;
