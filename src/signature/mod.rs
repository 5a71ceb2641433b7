//! Модуль сигнатур внешних функций.
//!
//! Небольшой C-подобный синтаксис, на котором описываются операции в
//! файле описания. Это не парсер заголовков C: поддерживаются только
//! скаляры, именованные структуры за указателем и `void`.
//!
//! # Синтаксис
//!
//! ```text
//! (Counter* self, int amount) -> int
//! (const SList* list) -> size_t
//! (void) -> Counter*
//! (Self* list, int value)          ; в capability, без `->` значит void
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::SignatureError;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Span, Spanned, Token};

use serde::{Deserialize, Serialize};

use crate::types::{ForeignType, Param};

/// Разобранная сигнатура внешней функции.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub returns: ForeignType,
}

/// Парсит сигнатуру `(T name, ...) -> R`.
///
/// # Пример
///
/// ```rust
/// use handlebind::signature::parse_signature;
///
/// let sig = parse_signature("(Counter* self, int n) -> int").unwrap();
/// assert_eq!(sig.params.len(), 2);
/// ```
pub fn parse_signature(source: &str) -> Result<Signature, SignatureError> {
    Parser::new(source).parse_signature()
}

/// Парсит одиночный тип (например, тип поля структуры).
pub fn parse_type(source: &str) -> Result<ForeignType, SignatureError> {
    Parser::new(source).parse_standalone_type()
}
