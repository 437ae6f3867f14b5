//! Parse errors of the test script dialect

/// A lexing or parsing failure with its source position
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} ({line}:{column})")]
pub struct SyntaxError {
    /// Human readable description
    pub message: String,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl SyntaxError {
    /// Create a new syntax error
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}
