//! Ошибки парсера сигнатур.

use super::token::{Span, Token};
use thiserror::Error;

/// Ошибка разбора сигнатуры или типа.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    /// Неожиданный токен.
    #[error("unexpected token at position {}: expected {expected}, found `{found}`", span.start)]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    /// Ошибка лексера.
    #[error("unexpected character at position {}", span.start)]
    LexerError { span: Span },

    /// Недопустимая комбинация спецификаторов типа.
    #[error("invalid type at position {}: {message}", span.start)]
    InvalidType { span: Span, message: String },
}

impl SignatureError {
    /// Создать ошибку "неожиданный токен".
    pub fn unexpected_token(span: Span, expected: impl Into<String>, found: &Token) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Создать ошибку "недопустимый тип".
    pub fn invalid_type(span: Span, message: impl Into<String>) -> Self {
        Self::InvalidType {
            span,
            message: message.into(),
        }
    }

    /// Получить позицию ошибки.
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::LexerError { span } => *span,
            Self::InvalidType { span, .. } => *span,
        }
    }
}
