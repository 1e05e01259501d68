//! Error taxonomy for the compiler.
//!
//! Every phase reports failure through [`CompileError`]. There is no local
//! recovery anywhere in the pipeline: the first error aborts the phase and
//! propagates to `main`, which prints one line and exits 1.

use std::fmt;

use crate::token::TokenKind;

/// A fatal compilation error. Carries just enough context to print the
/// mandated one-line diagnostic; this crate does not attempt rich,
/// multi-span error reporting or recovery.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// Unrecognized byte, bad character-literal escape, or integer overflow.
    Lexical { message: String, line: usize },
    /// Unexpected token during recursive-descent parsing.
    Syntax {
        message: String,
        found: TokenKind,
        line: usize,
    },
    /// Undefined name, type mismatch, arity mismatch, non-integer index, ...
    Semantic { message: String, line: usize },
    /// An invariant was violated after semantic analysis succeeded. This is
    /// always a compiler bug, never a user-facing mistake.
    Internal(String),
}

impl CompileError {
    pub fn lexical(message: impl Into<String>, line: usize) -> Self {
        CompileError::Lexical {
            message: message.into(),
            line,
        }
    }

    pub fn syntax(message: impl Into<String>, found: TokenKind, line: usize) -> Self {
        CompileError::Syntax {
            message: message.into(),
            found,
            line,
        }
    }

    pub fn semantic(message: impl Into<String>, line: usize) -> Self {
        CompileError::Semantic {
            message: message.into(),
            line,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(message.into())
    }

    /// Process exit code for this error: 0 on success is never represented
    /// here, 1 for every variant.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lexical { message, line } => {
                write!(f, "Error: {} (line {})", message, line + 1)
            }
            CompileError::Syntax {
                message,
                found,
                line,
            } => write!(
                f,
                "Error: {} (found {:?}, line {})",
                message,
                found,
                line + 1
            ),
            CompileError::Semantic { message, line } => {
                write!(f, "Error: {} (line {})", message, line + 1)
            }
            CompileError::Internal(message) => write!(f, "Internal: {}", message),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::fmt::Error> for CompileError {
    fn from(e: std::fmt::Error) -> Self {
        CompileError::Internal(format!("code generation formatting error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_error_has_error_prefix() {
        let e = CompileError::lexical("unrecognized byte 0x7f", 3);
        assert!(e.to_string().starts_with("Error: "));
        assert_eq!(e.exit_code(), 1);
    }

    #[test]
    fn internal_error_has_internal_prefix() {
        let e = CompileError::internal("type slot left unset");
        assert!(e.to_string().starts_with("Internal: "));
    }
}
