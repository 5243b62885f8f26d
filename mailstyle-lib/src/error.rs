//! Error types for CSS inlining.

use thiserror::Error;

/// Result type for inliner operations.
pub type Result<T> = std::result::Result<T, InlinerError>;

/// Errors that can occur while inlining CSS.
#[derive(Error, Debug)]
pub enum InlinerError {
    /// A selector could not be turned into an element query.
    #[error("unsupported selector `{selector}`: {reason}")]
    SelectorSyntax { selector: String, reason: String },

    /// The CSS scanner gave up, e.g. on absurdly deep nesting.
    #[error("CSS pattern processing failed: {0}")]
    InternalPattern(String),

    /// A result was requested before the phase that produces it ran.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// IO error while serializing the document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InlinerError {
    pub fn selector_syntax(selector: &str, reason: impl Into<String>) -> Self {
        InlinerError::SelectorSyntax {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}
