//! Описания внешних типов, которые потребляет генератор.
//!
//! Спецификации создаются вызывающей стороной (вручную или из файла
//! описания, см. [`crate::manifest`]), один раз передаются в генератор и
//! после этого не изменяются.

use serde::{Deserialize, Serialize};

use crate::naming;
use crate::signature::{self, SignatureError};
use crate::types::{ForeignType, Param};

/// Представление хэндла.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleRepr {
    /// Непрозрачный указатель: раскладка неизвестна.
    #[default]
    Opaque,
    /// Известная раскладка полей.
    Layout,
}

/// Роль операции в обёртке.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Определяется по имени (см. [`crate::config::GeneratorOptions`]).
    #[default]
    Auto,
    Method,
    Constructor,
    Destructor,
}

/// Поле структуры с известной раскладкой.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: ForeignType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: ForeignType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Создать поле, разобрав тип из строки (`"unsigned int"`).
    pub fn parse(name: impl Into<String>, ty: &str) -> Result<Self, SignatureError> {
        Ok(Self::new(name, signature::parse_type(ty)?))
    }
}

/// Описание одной внешней функции.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    /// Имя C-функции (`counter_add`).
    pub native_name: String,
    /// Имя метода; по умолчанию - `native_name` без `prefix_`.
    pub exposed_name: Option<String>,
    pub kind: OperationKind,
    /// Все параметры C-функции, включая хэндл.
    pub params: Vec<Param>,
    pub returns: ForeignType,
}

impl OperationSpec {
    pub fn new(native_name: impl Into<String>, params: Vec<Param>, returns: ForeignType) -> Self {
        Self {
            native_name: native_name.into(),
            exposed_name: None,
            kind: OperationKind::Auto,
            params,
            returns,
        }
    }

    /// Создать операцию из сигнатуры (`"(Counter* self, int n) -> int"`).
    pub fn parse(native_name: impl Into<String>, signature: &str) -> Result<Self, SignatureError> {
        let sig = signature::parse_signature(signature)?;
        Ok(Self::new(native_name, sig.params, sig.returns))
    }

    /// Задать имя метода явно.
    pub fn exposed_as(mut self, name: impl Into<String>) -> Self {
        self.exposed_name = Some(name.into());
        self
    }

    /// Задать роль явно.
    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Описание одного внешнего объектного типа.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignHandleSpec {
    /// Общий префикс функций (`counter`).
    pub prefix: String,
    /// Имя C-структуры (`Counter`); хэндл - `Counter*`.
    pub c_type: String,
    /// Имя обёртки; по умолчанию `c_type` в UpperCamelCase.
    pub wrapper: Option<String>,
    pub repr: HandleRepr,
    pub fields: Vec<FieldSpec>,
    pub operations: Vec<OperationSpec>,
}

impl ForeignHandleSpec {
    pub fn new(prefix: impl Into<String>, c_type: impl Into<String>, repr: HandleRepr) -> Self {
        Self {
            prefix: prefix.into(),
            c_type: c_type.into(),
            wrapper: None,
            repr,
            fields: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn with_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_operation(mut self, operation: OperationSpec) -> Self {
        self.operations.push(operation);
        self
    }

    /// Итоговое имя типа-обёртки.
    pub fn wrapper_name(&self) -> String {
        match &self.wrapper {
            Some(name) => name.clone(),
            None => naming::upper_camel(&self.c_type),
        }
    }

    /// Тип хэндла (`Counter*`).
    pub fn handle_type(&self) -> ForeignType {
        ForeignType::handle(self.c_type.clone())
    }
}

/// Операция, которую требует capability.
///
/// Сигнатура пишется относительно `Self`: `(Self* list, int value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityOperation {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: ForeignType,
}

impl CapabilityOperation {
    pub fn parse(name: impl Into<String>, signature: &str) -> Result<Self, SignatureError> {
        let sig = signature::parse_signature(signature)?;
        Ok(Self {
            name: name.into(),
            params: sig.params,
            returns: sig.returns,
        })
    }
}

/// Явно заявленная общая абстракция над несколькими внешними типами.
///
/// Генератор ничего не выводит сам: трейт появляется, только если вызывающий
/// перечислил реализующие префиксы, и каждый из них проверяется структурно.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySpec {
    pub name: String,
    pub operations: Vec<CapabilityOperation>,
    /// Префиксы реализующих спецификаций.
    pub implementors: Vec<String>,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
            implementors: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: CapabilityOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn implemented_by(mut self, prefix: impl Into<String>) -> Self {
        self.implementors.push(prefix.into());
        self
    }
}
