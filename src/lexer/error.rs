use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Indentation of {width} spaces on line {line} is not a multiple of 2")]
    UnevenIndent { width: usize, line: usize },
    #[error("Invalid number literal '{literal}' on line {line}")]
    InvalidNumberLiteral { literal: String, line: usize },
    #[error("Failed to read source: {message}")]
    Input { message: String },
}

pub type LexResult<T> = Result<T, LexError>;
