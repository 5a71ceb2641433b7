//! Определения ошибок для handlebind.
//!
//! Два уровня ошибок:
//! - [`BindError`] - загрузка описаний, ввод-вывод, форматы файлов;
//! - [`SpecError`] - диагностика генерации, собирается по каждой спецификации
//!   отдельно и никогда не прерывает весь проход.

use serde::Serialize;
use thiserror::Error;

/// Основной тип `Result` для библиотеки.
pub type BindResult<T> = Result<T, BindError>;

/// Ошибки загрузки и вывода.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Description file not found: {0}")]
    ManifestNotFound(String),

    #[error("Generation failed with {0} error(s)")]
    GenerationFailed(usize),
}

/// Ошибка генерации для одной спецификации (или одной capability).
///
/// Каждый вариант несёт префикс и имя операции, чтобы вызывающий мог найти
/// проблемное место во входных данных.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecError {
    #[error("spec for `{c_type}` has an empty prefix")]
    EmptyPrefix { c_type: String },

    #[error("prefix `{prefix}` is claimed by {count} specs")]
    DuplicatePrefix { prefix: String, count: usize },

    #[error("wrapper type `{wrapper}` of `{prefix}` is generated by more than one spec")]
    DuplicateWrapper { prefix: String, wrapper: String },

    #[error("C type `{c_type}` of `{prefix}` is described by more than one spec")]
    DuplicateCType { prefix: String, c_type: String },

    #[error("invalid signature for `{operation}` in `{prefix}`: {message}")]
    InvalidSignature {
        prefix: String,
        operation: String,
        message: String,
    },

    #[error("operation `{operation}` does not start with `{prefix}_`")]
    OperationPrefixMismatch { prefix: String, operation: String },

    #[error("operation `{operation}` of `{prefix}`: expected `{expected}`, found `{found}`")]
    HandleTypeMismatch {
        prefix: String,
        operation: String,
        expected: String,
        found: String,
    },

    #[error("invalid {what} name `{name}` in `{prefix}`")]
    InvalidIdentifier {
        prefix: String,
        what: String,
        name: String,
    },

    #[error("method `{method}` of `{prefix}` (from `{operation}`) is already defined")]
    DuplicateMethod {
        prefix: String,
        method: String,
        operation: String,
    },

    #[error("destructor `{operation}` of `{prefix}`: {reason}")]
    InvalidDestructor {
        prefix: String,
        operation: String,
        reason: String,
    },

    #[error("field `{field}` of `{prefix}` has unsupported type `{ty}`")]
    UnsupportedFieldType {
        prefix: String,
        field: String,
        ty: String,
    },

    #[error("`{prefix}` does not satisfy capability `{capability}`: {reason}")]
    CapabilityNotSatisfied {
        prefix: String,
        capability: String,
        reason: String,
    },

    #[error("capability `{capability}` names unknown implementor `{prefix}`")]
    UnknownImplementor { capability: String, prefix: String },

    #[error("capability `{capability}`, operation `{operation}`: {reason}")]
    InvalidCapability {
        capability: String,
        operation: String,
        reason: String,
    },

    #[error("option `{option}` has invalid value `{value}`")]
    InvalidOption { option: String, value: String },
}

impl SpecError {
    /// Префикс спецификации, к которой относится ошибка.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::EmptyPrefix { .. }
            | Self::InvalidCapability { .. }
            | Self::InvalidOption { .. } => None,
            Self::DuplicatePrefix { prefix, .. }
            | Self::DuplicateWrapper { prefix, .. }
            | Self::DuplicateCType { prefix, .. }
            | Self::InvalidSignature { prefix, .. }
            | Self::OperationPrefixMismatch { prefix, .. }
            | Self::HandleTypeMismatch { prefix, .. }
            | Self::InvalidIdentifier { prefix, .. }
            | Self::DuplicateMethod { prefix, .. }
            | Self::InvalidDestructor { prefix, .. }
            | Self::UnsupportedFieldType { prefix, .. }
            | Self::CapabilityNotSatisfied { prefix, .. }
            | Self::UnknownImplementor { prefix, .. } => Some(prefix),
        }
    }

    /// Короткое имя вида ошибки (для CLI и логов).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyPrefix { .. } => "EmptyPrefix",
            Self::DuplicatePrefix { .. } => "DuplicatePrefix",
            Self::DuplicateWrapper { .. } => "DuplicateWrapper",
            Self::DuplicateCType { .. } => "DuplicateCType",
            Self::InvalidSignature { .. } => "InvalidSignature",
            Self::OperationPrefixMismatch { .. } => "OperationPrefixMismatch",
            Self::HandleTypeMismatch { .. } => "HandleTypeMismatch",
            Self::InvalidIdentifier { .. } => "InvalidIdentifier",
            Self::DuplicateMethod { .. } => "DuplicateMethod",
            Self::InvalidDestructor { .. } => "InvalidDestructor",
            Self::UnsupportedFieldType { .. } => "UnsupportedFieldType",
            Self::CapabilityNotSatisfied { .. } => "CapabilityNotSatisfied",
            Self::UnknownImplementor { .. } => "UnknownImplementor",
            Self::InvalidCapability { .. } => "InvalidCapability",
            Self::InvalidOption { .. } => "InvalidOption",
        }
    }
}
