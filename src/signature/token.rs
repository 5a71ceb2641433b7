//! Токены и позиции для парсера сигнатур.

use serde::{Deserialize, Serialize};

/// Позиция в тексте сигнатуры.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Начальная позиция (байт).
    pub start: usize,
    /// Конечная позиция (байт).
    pub end: usize,
}

impl Span {
    /// Создать новый Span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Объединить два Span.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Токен с позицией.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Токены сигнатуры.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `*`
    Star,
    /// `->`
    Arrow,
    /// Идентификатор или ключевое слово C
    Ident(String),
    /// Конец ввода
    Eof,
}

impl Token {
    /// Идентификатор, если это он.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Token::Ident(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Star => write!(f, "*"),
            Token::Arrow => write!(f, "->"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
