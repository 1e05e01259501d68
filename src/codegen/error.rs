//! Code generation error type.

/// Error type for code generation.
///
/// Splits logical errors (an AST invariant that earlier phases should have
/// already guaranteed) from formatting errors (`write!` into the output
/// buffer can fail), so both can propagate with `?`. Generation itself
/// cannot fail if prior phases succeeded, so a `Logic` error here is
/// always a compiler bug, never a user mistake.
#[derive(Debug)]
pub enum CodeGenError {
    Logic(String),
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Logic(s) => write!(f, "{}", s),
            CodeGenError::Format(e) => write!(f, "code generation formatting error: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<String> for CodeGenError {
    fn from(s: String) -> Self {
        CodeGenError::Logic(s)
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}

impl From<CodeGenError> for crate::diagnostics::CompileError {
    fn from(e: CodeGenError) -> Self {
        crate::diagnostics::CompileError::internal(e.to_string())
    }
}
