//! Файл описания внешнего API (handlebind.toml).
//!
//! Описание хранится в TOML или JSON (по расширению `.json`) и переводится
//! в спецификации генератора. Сигнатуры разбираются здесь же; ошибка
//! разбора записывается в результат своего типа как `InvalidSignature`,
//! остальные типы генерируются как обычно.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::binding::GenerationReport;
use crate::config::GeneratorOptions;
use crate::error::{BindError, BindResult, SpecError};
use crate::generator::Generator;
use crate::spec::{
    CapabilityOperation, CapabilitySpec, FieldSpec, ForeignHandleSpec, HandleRepr, OperationKind,
    OperationSpec,
};

/// Имя файла описания по умолчанию.
pub const MANIFEST_FILE: &str = "handlebind.toml";

/// Файл описания целиком.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Настройки генератора
    #[serde(default)]
    pub options: GeneratorOptions,

    /// Внешние типы
    #[serde(default, rename = "handle")]
    pub handles: Vec<HandleDescription>,

    /// Явно заявленные общие абстракции
    #[serde(default, rename = "capability")]
    pub capabilities: Vec<CapabilityDescription>,
}

/// Описание одного внешнего типа (`[[handle]]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleDescription {
    pub prefix: String,
    pub c_type: String,

    /// Имя обёртки, если не подходит производное от `c_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,

    #[serde(default)]
    pub repr: HandleRepr,

    #[serde(default, rename = "field")]
    pub fields: Vec<FieldDescription>,

    #[serde(default, rename = "operation")]
    pub operations: Vec<OperationDescription>,
}

/// Операция (`[[handle.operation]]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescription {
    /// Имя C-функции
    pub native: String,

    /// Сигнатура: `(Counter* self, int n) -> int`
    pub signature: String,

    /// Имя метода вместо производного от `native`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: OperationKind,
}

/// Поле структуры (`[[handle.field]]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Capability (`[[capability]]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescription {
    pub name: String,

    /// Префиксы реализующих типов
    #[serde(default)]
    pub implementors: Vec<String>,

    #[serde(default, rename = "operation")]
    pub operations: Vec<CapabilityOperationDescription>,
}

/// Спецификации, разобранные из описания, вместе с ошибками разбора.
#[derive(Debug, Clone, Default)]
pub struct ManifestSpecs {
    /// По одной спецификации на `[[handle]]`; неразобранные операции и поля пропущены.
    pub specs: Vec<ForeignHandleSpec>,
    /// Ошибки разбора, параллельно `specs`.
    pub handle_errors: Vec<Vec<SpecError>>,
    /// Только capability без ошибок разбора.
    pub capabilities: Vec<CapabilitySpec>,
    pub capability_errors: Vec<SpecError>,
}

impl ManifestSpecs {
    pub fn has_errors(&self) -> bool {
        !self.capability_errors.is_empty() || self.handle_errors.iter().any(|e| !e.is_empty())
    }
}

/// Операция capability; сигнатура записывается через `Self`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityOperationDescription {
    pub name: String,
    pub signature: String,
}

impl Manifest {
    /// Загрузить описание из файла; `.json` читается как JSON, остальное как TOML.
    pub fn load(path: impl AsRef<Path>) -> BindResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> BindResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> BindResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Найти описание в текущей директории или родительских.
    pub fn find() -> BindResult<PathBuf> {
        let start = std::env::current_dir()?;
        Self::find_from(&start)
    }

    pub fn find_from(start: &Path) -> BindResult<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let manifest_path = current.join(MANIFEST_FILE);
            if manifest_path.exists() {
                return Ok(manifest_path);
            }

            if !current.pop() {
                break;
            }
        }

        Err(BindError::ManifestNotFound(start.display().to_string()))
    }

    /// Разобрать сигнатуры и получить спецификации генератора.
    pub fn to_specs(&self) -> ManifestSpecs {
        let mut parsed = ManifestSpecs::default();

        for handle in &self.handles {
            let (spec, errors) = handle.to_spec();
            parsed.specs.push(spec);
            parsed.handle_errors.push(errors);
        }

        for capability in &self.capabilities {
            match capability.to_spec() {
                Ok(spec) => parsed.capabilities.push(spec),
                Err(errors) => parsed.capability_errors.extend(errors),
            }
        }

        parsed
    }

    /// Сгенерировать обёртки; ошибки разбора попадают в отчёт.
    pub fn generate(&self, generator: &Generator) -> GenerationReport {
        let ManifestSpecs {
            specs,
            handle_errors,
            capabilities,
            capability_errors,
        } = self.to_specs();

        let mut report = generator.generate(&specs, &capabilities);
        for (index, errors) in handle_errors.into_iter().enumerate() {
            report.reject(index, errors);
        }
        report.capability_errors.extend(capability_errors);
        report
    }
}

impl HandleDescription {
    /// Разобрать поля и операции; неразобранные пропускаются с ошибкой.
    pub fn to_spec(&self) -> (ForeignHandleSpec, Vec<SpecError>) {
        let mut spec = ForeignHandleSpec::new(&self.prefix, &self.c_type, self.repr);
        spec.wrapper = self.wrapper.clone();
        let mut errors = Vec::new();

        for field in &self.fields {
            match FieldSpec::parse(&field.name, &field.ty) {
                Ok(parsed) => spec.fields.push(parsed),
                Err(source) => errors.push(SpecError::InvalidSignature {
                    prefix: self.prefix.clone(),
                    operation: format!("field `{}`", field.name),
                    message: source.to_string(),
                }),
            }
        }

        for operation in &self.operations {
            match OperationSpec::parse(&operation.native, &operation.signature) {
                Ok(parsed) => {
                    let mut parsed = parsed.with_kind(operation.kind);
                    parsed.exposed_name = operation.name.clone();
                    spec.operations.push(parsed);
                }
                Err(source) => errors.push(SpecError::InvalidSignature {
                    prefix: self.prefix.clone(),
                    operation: operation.native.clone(),
                    message: source.to_string(),
                }),
            }
        }

        (spec, errors)
    }
}

impl CapabilityDescription {
    pub fn to_spec(&self) -> Result<CapabilitySpec, Vec<SpecError>> {
        let mut spec = CapabilitySpec::new(&self.name);
        spec.implementors = self.implementors.clone();
        let mut errors = Vec::new();

        for operation in &self.operations {
            match CapabilityOperation::parse(&operation.name, &operation.signature) {
                Ok(parsed) => spec.operations.push(parsed),
                Err(source) => errors.push(SpecError::InvalidCapability {
                    capability: self.name.clone(),
                    operation: operation.name.clone(),
                    reason: source.to_string(),
                }),
            }
        }

        if errors.is_empty() {
            Ok(spec)
        } else {
            Err(errors)
        }
    }
}
