//! # handlebind
//!
//! Генератор Rust-обёрток для C API вида «непрозрачный хэндл + функции с
//! общим префиксом» (`counter_new`, `counter_add`, `counter_free`).
//!
//! ## Основные модули
//!
//! - [`spec`] - Описания внешних типов и capability
//! - [`signature`] - Разбор C-подобных сигнатур
//! - [`generator`] - Проверка спецификаций и сборка обёрток
//! - [`capability`] - Структурная проверка явно заявленных трейтов
//! - [`rust_backend`] - Вывод исходного кода на Rust
//! - [`manifest`] - Файл описания (TOML/JSON)
//!
//! ## Пример
//!
//! ```rust
//! use handlebind::spec::{ForeignHandleSpec, HandleRepr, OperationSpec};
//! use handlebind::{emit_rust, generate, GeneratorOptions};
//!
//! let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
//!     .with_operation(OperationSpec::parse("counter_new", "(int initial) -> Counter*").unwrap())
//!     .with_operation(OperationSpec::parse("counter_add", "(Counter* self, int n) -> int").unwrap())
//!     .with_operation(OperationSpec::parse("counter_free", "(Counter* self)").unwrap());
//!
//! let report = generate(&[spec]);
//! assert!(report.is_success());
//!
//! let code = emit_rust(&report, &GeneratorOptions::default());
//! assert!(code.contains("impl Drop for Counter"));
//! ```

// === Модель ===
pub mod binding;
pub mod config;
pub mod error;
pub mod naming;
pub mod signature;
pub mod spec;
pub mod types;

// === Генерация ===
pub mod capability;
pub mod generator;
pub mod rust_backend;

// === Ввод ===
pub mod manifest;

// === Re-exports для удобства ===
pub use binding::{GeneratedBinding, GenerationReport, SpecOutcome};
pub use config::GeneratorOptions;
pub use error::{BindError, BindResult, SpecError};
pub use generator::{generate, Generator};
pub use manifest::{Manifest, ManifestSpecs};
pub use rust_backend::{emit_rust, RustBackend};
pub use spec::{CapabilitySpec, ForeignHandleSpec};
