//! Parser error types

use crate::span::Span;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{message}")]
    Lexer { message: String, span: Span },

    #[error("{message}")]
    Syntax { message: String, span: Span },

    #[error("'{expected}' expected, found '{found}'.")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of file, '{expected}' expected.")]
    UnexpectedEof { expected: String, span: Span },
}

impl ParseError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }

    pub fn unexpected_token(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Lexer { span, .. }
            | Self::Syntax { span, .. }
            | Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEof { span, .. } => *span,
        }
    }

    /// Diagnostic code reported for this error
    pub fn code(&self) -> u32 {
        match self {
            Self::Lexer { .. } => 1127,
            Self::Syntax { .. } => 1109,
            Self::UnexpectedToken { .. } | Self::UnexpectedEof { .. } => 1005,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{ByteOffset, FileId};

    #[test]
    fn test_error_span_and_code() {
        let span = Span::new(FileId(0), ByteOffset(2), ByteOffset(3));
        let error = ParseError::unexpected_token(";", "}", span);
        assert_eq!(error.span(), span);
        assert_eq!(error.code(), 1005);
        assert_eq!(error.to_string(), "';' expected, found '}'.");
    }
}
