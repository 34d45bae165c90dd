use thiserror::Error;

/// Typed errors raised while evaluating a program.
///
/// Evaluation is not resumable: the first error aborts the run and the user
/// program has no way to catch it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined field '{field}'")]
    UndefinedField { field: String },
    #[error("Expected a class instance, got {type_name}")]
    NotAnInstance { type_name: String },
    #[error("Unknown method '{method}' for class {class}")]
    UnknownMethod { method: String, class: String },
    #[error("Method '{method}' expected {expected} arguments, got {found}")]
    MethodArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("Operation '{operation}' is not supported for types {lhs} and {rhs}")]
    UnsupportedOperands {
        operation: &'static str,
        lhs: String,
        rhs: String,
    },
    #[error("Comparison method '{method}' returned a non-Bool value")]
    NonBoolComparison { method: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },
    #[error("Return outside of a method body")]
    ReturnOutsideMethod,
    #[error("Class of an instance is no longer alive")]
    ClassDropped,
    #[error("Failed to write program output: {message}")]
    OutputWrite { message: String },
}
