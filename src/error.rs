//! Error types for the autofix engine

use thiserror::Error;

use crate::text::Position;

#[derive(Error, Debug)]
pub enum AutofixError {
    #[error("failed to parse {resource}: {message}")]
    Parse { resource: String, message: String },

    /// A module declaration / require call whose arguments match no known shape.
    #[error("unsupported module declaration at {position}: {message}")]
    UnsupportedModule { message: String, position: Position },

    /// A substitute whose syntactic category does not fit the parent slot.
    #[error("unsupported replacement at {position}: {parent_kind} expects {expected}, got {actual}")]
    UnsupportedReplacement {
        parent_kind: String,
        expected: &'static str,
        actual: String,
        position: Position,
    },

    /// A structural assumption about the input did not hold.
    #[error("{message}")]
    Invariant { message: String },

    #[error("not implemented: {message}")]
    NotImplemented { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = AutofixError> = std::result::Result<T, E>;

impl AutofixError {
    pub fn parse(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_module(message: impl Into<String>, position: Position) -> Self {
        Self::UnsupportedModule {
            message: message.into(),
            position,
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }

    /// Local errors leave a single construct untransformed; everything else
    /// aborts the transformation of the whole resource.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedModule { .. } | Self::UnsupportedReplacement { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error =
            AutofixError::unsupported_module("factory is not a function", Position::new(3, 7));
        assert_eq!(
            error.to_string(),
            "unsupported module declaration at 3:7: factory is not a function"
        );
        assert!(error.is_local());

        let error = AutofixError::invariant("SyntaxList not found in factory function");
        assert!(!error.is_local());
        assert!(AutofixError::not_implemented("x").to_string().starts_with("not implemented"));
    }
}
