//! Модель сгенерированных обёрток.
//!
//! Чистые значения без ссылок на внешние ресурсы; бэкенды (см.
//! [`crate::rust_backend`]) превращают их в исходный код.

use serde::Serialize;

use crate::error::SpecError;
use crate::spec::HandleRepr;
use crate::types::ForeignType;

/// Как метод получает хэндл.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    /// Хэндла нет (конструктор).
    None,
    /// `const T*` -> `&self`.
    Shared,
    /// `T*` -> `&mut self`.
    Exclusive,
}

/// Тип результата метода обёртки.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposedReturn {
    Unit,
    Value(ForeignType),
    /// Внешняя функция возвращает хэндл того же типа: результат снова оборачивается.
    Wrapper,
}

/// Параметр метода (хэндл уже исключён).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodParam {
    pub name: String,
    pub ty: ForeignType,
}

/// Пересылающий метод.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Method {
    pub name: String,
    pub native_name: String,
    pub receiver: Receiver,
    pub params: Vec<MethodParam>,
    pub returns: ExposedReturn,
    /// Сырой тип возврата C-функции (для `extern` объявления).
    pub native_returns: ForeignType,
    /// Сырой тип хэндла, если он передаётся первым аргументом.
    pub native_receiver: Option<ForeignType>,
}

/// Деструктор, вызываемый из `Drop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destructor {
    pub native_name: String,
    pub native_receiver: ForeignType,
}

/// Аксессор поля структуры с известной раскладкой.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldAccessor {
    pub name: String,
    pub ty: ForeignType,
    /// Смещение в байтах (LP64, естественное выравнивание).
    pub offset: usize,
}

/// Обёртка над одним внешним типом.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedBinding {
    pub prefix: String,
    pub wrapper: String,
    pub c_type: String,
    pub repr: HandleRepr,
    pub constructors: Vec<Method>,
    pub methods: Vec<Method>,
    pub destructor: Option<Destructor>,
    pub fields: Vec<FieldAccessor>,
    /// Поля, объявленные для непрозрачного хэндла и потому пропущенные.
    pub omitted_fields: Vec<String>,
    /// Capability, которые реализует обёртка.
    pub capabilities: Vec<String>,
}

impl GeneratedBinding {
    /// Найти метод или конструктор по имени.
    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.constructors
            .iter()
            .chain(self.methods.iter())
            .find(|m| m.name == name)
    }

    /// Размер структуры по раскладке полей (для `Layout`).
    pub fn layout_size(&self) -> usize {
        let (end, align) = self.fields.iter().fold((0, 1), |(end, align), field| {
            let (size, field_align) = field.ty.layout().unwrap_or((0, 1));
            ((field.offset + size).max(end), align.max(field_align))
        });
        align_up(end, align)
    }
}

/// Метод трейта capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityMethod {
    pub name: String,
    pub receiver: Receiver,
    pub params: Vec<MethodParam>,
    pub returns: ExposedReturn,
}

/// Общий трейт для явно связанных обёрток.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCapability {
    pub name: String,
    pub methods: Vec<CapabilityMethod>,
    /// Имена обёрток, для которых генерируется `impl`.
    pub implementors: Vec<String>,
}

/// Результат для одной спецификации.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecOutcome {
    pub prefix: String,
    pub result: Result<GeneratedBinding, Vec<SpecError>>,
}

impl SpecOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn binding(&self) -> Option<&GeneratedBinding> {
        self.result.as_ref().ok()
    }

    pub fn errors(&self) -> &[SpecError] {
        match &self.result {
            Ok(_) => &[],
            Err(errors) => errors,
        }
    }
}

/// Результат всего прохода генерации.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// По одному результату на спецификацию, в порядке входа.
    pub outcomes: Vec<SpecOutcome>,
    pub capabilities: Vec<GeneratedCapability>,
    /// Ошибки capability, не относящиеся к конкретной спецификации.
    pub capability_errors: Vec<SpecError>,
    /// Ошибки настроек генератора.
    pub option_errors: Vec<SpecError>,
}

impl GenerationReport {
    /// Успешно сгенерированные обёртки.
    pub fn bindings(&self) -> impl Iterator<Item = &GeneratedBinding> {
        self.outcomes.iter().filter_map(SpecOutcome::binding)
    }

    /// Найти результат по префиксу (первый, если префикс повторяется).
    pub fn outcome(&self, prefix: &str) -> Option<&SpecOutcome> {
        self.outcomes.iter().find(|o| o.prefix == prefix)
    }

    /// Количество спецификаций, для которых генерация не удалась.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
            && self.capability_errors.is_empty()
            && self.option_errors.is_empty()
    }

    /// Все ошибки отчёта: по спецификациям, затем capability и настройки.
    pub fn errors(&self) -> impl Iterator<Item = &SpecError> {
        self.outcomes
            .iter()
            .flat_map(SpecOutcome::errors)
            .chain(&self.capability_errors)
            .chain(&self.option_errors)
    }

    /// Добавить ошибки к результату `index`, найденные вне генератора.
    ///
    /// Успешный результат становится неудачным; обёртка пропадает и из
    /// реализаций capability.
    pub fn reject(&mut self, index: usize, errors: Vec<SpecError>) {
        if errors.is_empty() {
            return;
        }
        let Some(outcome) = self.outcomes.get_mut(index) else {
            return;
        };

        let (rejected, result) = match std::mem::replace(&mut outcome.result, Err(Vec::new())) {
            Ok(binding) => (Some(binding.wrapper), errors),
            Err(existing) => {
                let mut merged = errors;
                merged.extend(existing);
                (None, merged)
            }
        };
        outcome.result = Err(result);

        if let Some(wrapper) = rejected {
            for capability in &mut self.capabilities {
                capability.implementors.retain(|w| *w != wrapper);
            }
            self.capabilities.retain(|c| !c.implementors.is_empty());
        }
    }
}

/// Округлить `offset` вверх до кратного `align`.
pub(crate) fn align_up(offset: usize, align: usize) -> usize {
    if align <= 1 {
        offset
    } else {
        offset.div_ceil(align) * align
    }
}
