//! User-facing compile errors.
//!
//! Every semantic violation surfaces as a `CompileError` with a message; the
//! first error aborts the pass, there is no accumulation or recovery. Internal
//! invariant violations (malformed trees the parser should have rejected,
//! unresolved labels at function end) are panics, never `CompileError`.

use thiserror::Error;

/// A diagnostic from one of the compilation phases.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("lex error: {0}")]
    Lex(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("semantic error: {0}")]
    Semantic(String),
}

impl CompileError {
    /// Shorthand for a semantic error, the most common kind.
    pub fn semantic(message: impl Into<String>) -> Self {
        CompileError::Semantic(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Lex(m) | CompileError::Syntax(m) | CompileError::Semantic(m) => m,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
