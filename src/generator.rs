//! Модуль `generator`
//!
//! Генератор обёрток: чистый однопроходный перевод набора
//! [`ForeignHandleSpec`] в набор [`GeneratedBinding`].
//!
//! - Проверка префиксов и имён для всего набора сразу
//! - Сборка методов, конструкторов, деструктора и аксессоров полей
//! - Структурная проверка заявленных capability
//!
//! Ошибки собираются по каждой спецификации отдельно: неудача одной не
//! мешает остальным. Генератор не выполняет ввод-вывод и не трогает
//! внешний код.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::binding::{
    align_up, Destructor, ExposedReturn, FieldAccessor, GeneratedBinding, GenerationReport,
    Method, MethodParam, Receiver, SpecOutcome,
};
use crate::capability;
use crate::config::GeneratorOptions;
use crate::error::SpecError;
use crate::naming;
use crate::spec::{CapabilitySpec, ForeignHandleSpec, HandleRepr, OperationKind, OperationSpec};
use crate::types::{ForeignType, Param};

/// Имена вспомогательных методов, которые генерируются для каждой обёртки.
pub const HELPER_METHODS: &[&str] = &["from_raw", "as_ptr", "into_raw"];

/// Имя параметра-хэндла в `extern` объявлениях.
pub const HANDLE_PARAM: &str = "this";

/// Сгенерировать обёртки с настройками по умолчанию и без capability.
///
/// # Пример
///
/// ```rust
/// use handlebind::spec::{ForeignHandleSpec, HandleRepr, OperationSpec};
///
/// let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
///     .with_operation(OperationSpec::parse("counter_new", "(int initial) -> Counter*").unwrap());
/// let report = handlebind::generate(&[spec]);
/// assert!(report.is_success());
/// ```
pub fn generate(specs: &[ForeignHandleSpec]) -> GenerationReport {
    Generator::default().generate(specs, &[])
}

/// Генератор обёрток.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    options: GeneratorOptions,
}

impl Generator {
    /// Создать генератор с заданными настройками.
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Сгенерировать обёртки для всех спецификаций.
    ///
    /// Возвращает по одному результату на каждую спецификацию в порядке
    /// входа; повторный вызов на тех же данных даёт тот же отчёт.
    pub fn generate(
        &self,
        specs: &[ForeignHandleSpec],
        capabilities: &[CapabilitySpec],
    ) -> GenerationReport {
        debug!(
            "Generating bindings for {} spec(s), {} capability(ies)",
            specs.len(),
            capabilities.len()
        );

        let mut errors: Vec<Vec<SpecError>> = specs.iter().map(|_| Vec::new()).collect();
        check_prefixes(specs, &mut errors);
        check_type_names(specs, &mut errors);

        let mut drafts: Vec<GeneratedBinding> = specs
            .iter()
            .zip(errors.iter_mut())
            .map(|(spec, errs)| self.build_binding(spec, errs))
            .collect();

        let (resolved, capability_errors) =
            capability::resolve(capabilities, specs, &mut drafts, &mut errors);

        let outcomes: Vec<SpecOutcome> = specs
            .iter()
            .zip(drafts)
            .zip(errors)
            .map(|((spec, draft), errs)| {
                let result = if errs.is_empty() {
                    debug!(
                        "`{}`: {} method(s), {} constructor(s), {} field accessor(s)",
                        spec.prefix,
                        draft.methods.len(),
                        draft.constructors.len(),
                        draft.fields.len()
                    );
                    Ok(draft)
                } else {
                    warn!("`{}`: {} error(s), no binding emitted", spec.prefix, errs.len());
                    Err(errs)
                };
                SpecOutcome {
                    prefix: spec.prefix.clone(),
                    result,
                }
            })
            .collect();

        let capabilities = resolved
            .into_iter()
            .filter_map(|entry| {
                let mut generated = entry.capability;
                generated.implementors = entry
                    .implementors
                    .iter()
                    .filter_map(|&index| outcomes[index].binding())
                    .map(|binding| binding.wrapper.clone())
                    .collect();
                if generated.implementors.is_empty() {
                    debug!("Capability `{}` has no generated implementors", generated.name);
                    None
                } else {
                    Some(generated)
                }
            })
            .collect();

        let report = GenerationReport {
            outcomes,
            capabilities,
            capability_errors,
            option_errors: check_options(&self.options),
        };
        info!(
            "Generated {} of {} binding(s)",
            report.outcomes.len() - report.failed_count(),
            report.outcomes.len()
        );
        report
    }

    /// Собрать обёртку для одной спецификации, складывая ошибки в `errors`.
    ///
    /// Черновик собирается всегда; будет ли он выпущен, решает `generate`.
    fn build_binding(
        &self,
        spec: &ForeignHandleSpec,
        errors: &mut Vec<SpecError>,
    ) -> GeneratedBinding {
        let wrapper = spec.wrapper_name();
        let mut binding = GeneratedBinding {
            prefix: spec.prefix.clone(),
            wrapper: wrapper.clone(),
            c_type: spec.c_type.clone(),
            repr: spec.repr,
            constructors: Vec::new(),
            methods: Vec::new(),
            destructor: None,
            fields: Vec::new(),
            omitted_fields: Vec::new(),
            capabilities: Vec::new(),
        };

        if spec.prefix.is_empty() {
            return binding;
        }

        let invalid = |what: &str, name: &str| SpecError::InvalidIdentifier {
            prefix: spec.prefix.clone(),
            what: what.to_string(),
            name: name.to_string(),
        };
        if !naming::is_identifier(&spec.prefix) {
            errors.push(invalid("prefix", &spec.prefix));
        }
        if !naming::is_rust_usable(&spec.c_type) {
            errors.push(invalid("C type", &spec.c_type));
        }
        if !naming::is_rust_usable(&wrapper) || wrapper == self.options.ffi_module {
            errors.push(invalid("wrapper", &wrapper));
        }

        let mut taken: HashSet<String> = HELPER_METHODS.iter().map(|s| s.to_string()).collect();
        let mut natives: HashSet<&str> = HashSet::new();

        for operation in &spec.operations {
            if !natives.insert(operation.native_name.as_str()) {
                errors.push(SpecError::DuplicateMethod {
                    prefix: spec.prefix.clone(),
                    method: operation
                        .exposed_name
                        .clone()
                        .unwrap_or_else(|| operation.native_name.clone()),
                    operation: operation.native_name.clone(),
                });
                continue;
            }
            self.build_operation(spec, operation, &mut binding, &mut taken, errors);
        }

        build_fields(spec, &mut binding, &mut taken, errors);

        if binding.destructor.is_none() {
            warn!(
                "`{}` declares no destructor; `{}` handles are never released",
                spec.prefix, wrapper
            );
        }

        binding
    }

    fn build_operation(
        &self,
        spec: &ForeignHandleSpec,
        operation: &OperationSpec,
        binding: &mut GeneratedBinding,
        taken: &mut HashSet<String>,
        errors: &mut Vec<SpecError>,
    ) {
        let native = &operation.native_name;
        let family = format!("{}_", spec.prefix);
        let Some(stripped) = native.strip_prefix(&family) else {
            errors.push(SpecError::OperationPrefixMismatch {
                prefix: spec.prefix.clone(),
                operation: native.clone(),
            });
            return;
        };

        if !naming::is_rust_usable(native) {
            errors.push(SpecError::InvalidIdentifier {
                prefix: spec.prefix.clone(),
                what: "function".to_string(),
                name: native.clone(),
            });
            return;
        }

        let exposed = operation
            .exposed_name
            .clone()
            .unwrap_or_else(|| stripped.to_string());
        if !naming::is_rust_usable(&exposed) {
            errors.push(SpecError::InvalidIdentifier {
                prefix: spec.prefix.clone(),
                what: "method".to_string(),
                name: exposed,
            });
            return;
        }

        let types = operation
            .params
            .iter()
            .map(|p| &p.ty)
            .chain(std::iter::once(&operation.returns));
        if !check_named_types(spec, types, errors) {
            return;
        }

        let kind = match operation.kind {
            OperationKind::Auto if self.options.is_constructor_name(&exposed) => {
                OperationKind::Constructor
            }
            OperationKind::Auto if self.options.is_destructor_name(&exposed) => {
                OperationKind::Destructor
            }
            OperationKind::Auto => OperationKind::Method,
            explicit => explicit,
        };

        if kind == OperationKind::Destructor {
            build_destructor(spec, operation, binding, errors);
            return;
        }

        if !taken.insert(exposed.clone()) {
            errors.push(SpecError::DuplicateMethod {
                prefix: spec.prefix.clone(),
                method: exposed,
                operation: native.clone(),
            });
            return;
        }

        if kind == OperationKind::Constructor {
            if let Some(method) = build_constructor(spec, operation, exposed, errors) {
                binding.constructors.push(method);
            }
        } else if let Some(method) = build_method(spec, operation, exposed, errors) {
            binding.methods.push(method);
        }
    }
}

/// Модуль с сырыми объявлениями должен быть записываем как путь Rust.
fn check_options(options: &GeneratorOptions) -> Vec<SpecError> {
    let mut errors = Vec::new();
    if !naming::is_rust_usable(&options.ffi_module) {
        errors.push(SpecError::InvalidOption {
            option: "ffi_module".to_string(),
            value: options.ffi_module.clone(),
        });
    }
    if options.link_name.as_deref().is_some_and(str::is_empty) {
        errors.push(SpecError::InvalidOption {
            option: "link_name".to_string(),
            value: String::new(),
        });
    }
    errors
}

/// Имена структур в типах должны быть записываемы в Rust.
///
/// `Self` сюда тоже попадает: он зарезервирован за сигнатурами capability.
fn check_named_types<'a>(
    spec: &ForeignHandleSpec,
    types: impl IntoIterator<Item = &'a ForeignType>,
    errors: &mut Vec<SpecError>,
) -> bool {
    let mut named = Vec::new();
    for ty in types {
        ty.collect_named(&mut named);
    }

    let mut ok = true;
    for name in named {
        if !naming::is_rust_usable(name) {
            errors.push(SpecError::InvalidIdentifier {
                prefix: spec.prefix.clone(),
                what: "type".to_string(),
                name: name.to_string(),
            });
            ok = false;
        }
    }
    ok
}

/// Каждый префикс должен быть непустым и уникальным в рамках прохода.
fn check_prefixes(specs: &[ForeignHandleSpec], errors: &mut [Vec<SpecError>]) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for spec in specs {
        *counts.entry(spec.prefix.as_str()).or_default() += 1;
    }

    for (spec, errs) in specs.iter().zip(errors.iter_mut()) {
        if spec.prefix.is_empty() {
            errs.push(SpecError::EmptyPrefix {
                c_type: spec.c_type.clone(),
            });
            continue;
        }
        let count = counts.get(spec.prefix.as_str()).copied().unwrap_or(0);
        if count > 1 {
            errs.push(SpecError::DuplicatePrefix {
                prefix: spec.prefix.clone(),
                count,
            });
        }
    }
}

/// Имена обёрток и C-структур тоже не должны совпадать между спецификациями.
fn check_type_names(specs: &[ForeignHandleSpec], errors: &mut [Vec<SpecError>]) {
    let wrappers: Vec<String> = specs.iter().map(ForeignHandleSpec::wrapper_name).collect();
    let mut wrapper_counts: HashMap<&str, usize> = HashMap::new();
    let mut c_type_counts: HashMap<&str, usize> = HashMap::new();
    for (spec, wrapper) in specs.iter().zip(&wrappers) {
        *wrapper_counts.entry(wrapper.as_str()).or_default() += 1;
        *c_type_counts.entry(spec.c_type.as_str()).or_default() += 1;
    }

    for ((spec, wrapper), errs) in specs.iter().zip(&wrappers).zip(errors.iter_mut()) {
        if wrapper_counts.get(wrapper.as_str()).copied().unwrap_or(0) > 1 {
            errs.push(SpecError::DuplicateWrapper {
                prefix: spec.prefix.clone(),
                wrapper: wrapper.clone(),
            });
        }
        if c_type_counts.get(spec.c_type.as_str()).copied().unwrap_or(0) > 1 {
            errs.push(SpecError::DuplicateCType {
                prefix: spec.prefix.clone(),
                c_type: spec.c_type.clone(),
            });
        }
    }
}

/// Первый параметр должен быть `c_type*` (или `const c_type*`).
fn receiver_of(
    spec: &ForeignHandleSpec,
    operation: &OperationSpec,
    errors: &mut Vec<SpecError>,
) -> Option<(Receiver, ForeignType)> {
    match operation.params.first() {
        Some(first) if first.ty.is_handle_of(&spec.c_type) => {
            let receiver = if first.ty.is_const_pointer() {
                Receiver::Shared
            } else {
                Receiver::Exclusive
            };
            Some((receiver, first.ty.clone()))
        }
        first => {
            errors.push(SpecError::HandleTypeMismatch {
                prefix: spec.prefix.clone(),
                operation: operation.native_name.clone(),
                expected: format!(
                    "{} or {}",
                    spec.handle_type(),
                    ForeignType::const_handle(spec.c_type.as_str())
                ),
                found: first
                    .map(|p| p.ty.to_string())
                    .unwrap_or_else(|| "no parameters".to_string()),
            });
            None
        }
    }
}

/// Параметры метода: имена из сигнатуры или `argN`, без повторов.
fn exposed_params(
    spec: &ForeignHandleSpec,
    params: &[Param],
    errors: &mut Vec<SpecError>,
) -> Option<Vec<MethodParam>> {
    let mut seen: HashSet<String> = HashSet::from([HANDLE_PARAM.to_string()]);
    let mut ok = true;
    let mut exposed = Vec::with_capacity(params.len());

    for (index, param) in params.iter().enumerate() {
        let name = param
            .name
            .clone()
            .unwrap_or_else(|| format!("arg{}", index));
        if !naming::is_rust_usable(&name) || !seen.insert(name.clone()) {
            errors.push(SpecError::InvalidIdentifier {
                prefix: spec.prefix.clone(),
                what: "parameter".to_string(),
                name,
            });
            ok = false;
            continue;
        }
        exposed.push(MethodParam {
            name,
            ty: param.ty.clone(),
        });
    }

    ok.then_some(exposed)
}

/// `T*` того же типа превращается обратно в обёртку; `const T*` остаётся указателем.
fn exposed_return(spec: &ForeignHandleSpec, returns: &ForeignType) -> ExposedReturn {
    if returns.is_void() {
        ExposedReturn::Unit
    } else if *returns == spec.handle_type() {
        ExposedReturn::Wrapper
    } else {
        ExposedReturn::Value(returns.clone())
    }
}

fn build_constructor(
    spec: &ForeignHandleSpec,
    operation: &OperationSpec,
    name: String,
    errors: &mut Vec<SpecError>,
) -> Option<Method> {
    if operation.returns != spec.handle_type() {
        errors.push(SpecError::HandleTypeMismatch {
            prefix: spec.prefix.clone(),
            operation: operation.native_name.clone(),
            expected: spec.handle_type().to_string(),
            found: operation.returns.to_string(),
        });
        return None;
    }

    let params = exposed_params(spec, &operation.params, errors)?;
    Some(Method {
        name,
        native_name: operation.native_name.clone(),
        receiver: Receiver::None,
        params,
        returns: ExposedReturn::Wrapper,
        native_returns: operation.returns.clone(),
        native_receiver: None,
    })
}

fn build_method(
    spec: &ForeignHandleSpec,
    operation: &OperationSpec,
    name: String,
    errors: &mut Vec<SpecError>,
) -> Option<Method> {
    let (receiver, handle) = receiver_of(spec, operation, errors)?;
    let params = exposed_params(spec, &operation.params[1..], errors)?;
    Some(Method {
        name,
        native_name: operation.native_name.clone(),
        receiver,
        params,
        returns: exposed_return(spec, &operation.returns),
        native_returns: operation.returns.clone(),
        native_receiver: Some(handle),
    })
}

fn build_destructor(
    spec: &ForeignHandleSpec,
    operation: &OperationSpec,
    binding: &mut GeneratedBinding,
    errors: &mut Vec<SpecError>,
) {
    let Some((_, handle)) = receiver_of(spec, operation, errors) else {
        return;
    };

    let invalid = |reason: String| SpecError::InvalidDestructor {
        prefix: spec.prefix.clone(),
        operation: operation.native_name.clone(),
        reason,
    };

    if operation.params.len() > 1 {
        errors.push(invalid("takes arguments besides the handle".to_string()));
        return;
    }
    if !operation.returns.is_void() {
        errors.push(invalid(format!(
            "must return void, found `{}`",
            operation.returns
        )));
        return;
    }
    if let Some(existing) = &binding.destructor {
        errors.push(invalid(format!(
            "`{}` already releases the handle",
            existing.native_name
        )));
        return;
    }

    binding.destructor = Some(Destructor {
        native_name: operation.native_name.clone(),
        native_receiver: handle,
    });
}

/// Аксессоры полей; для непрозрачного хэндла раскладка не выводится.
fn build_fields(
    spec: &ForeignHandleSpec,
    binding: &mut GeneratedBinding,
    taken: &mut HashSet<String>,
    errors: &mut Vec<SpecError>,
) {
    if spec.fields.is_empty() {
        return;
    }

    if spec.repr == HandleRepr::Opaque {
        binding.omitted_fields = spec.fields.iter().map(|f| f.name.clone()).collect();
        warn!(
            "`{}` is opaque: {} field accessor(s) omitted, declare accessor functions instead",
            spec.prefix,
            spec.fields.len()
        );
        return;
    }

    let mut offset = 0;
    let mut names: HashSet<&str> = HashSet::new();
    for field in &spec.fields {
        if !naming::is_rust_usable(&field.name) || !names.insert(field.name.as_str()) {
            errors.push(SpecError::InvalidIdentifier {
                prefix: spec.prefix.clone(),
                what: "field".to_string(),
                name: field.name.clone(),
            });
            continue;
        }

        if !check_named_types(spec, [&field.ty], errors) {
            continue;
        }

        let Some((size, align)) = field.ty.layout() else {
            errors.push(SpecError::UnsupportedFieldType {
                prefix: spec.prefix.clone(),
                field: field.name.clone(),
                ty: field.ty.to_string(),
            });
            continue;
        };

        offset = align_up(offset, align);
        if taken.insert(field.name.clone()) {
            binding.fields.push(FieldAccessor {
                name: field.name.clone(),
                ty: field.ty.clone(),
                offset,
            });
        } else {
            errors.push(SpecError::DuplicateMethod {
                prefix: spec.prefix.clone(),
                method: field.name.clone(),
                operation: format!("field `{}`", field.name),
            });
        }
        offset += size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{CapabilityOperation, FieldSpec};
    use crate::types::Primitive;

    fn op(native: &str, signature: &str) -> OperationSpec {
        OperationSpec::parse(native, signature).unwrap()
    }

    fn counter_spec() -> ForeignHandleSpec {
        ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_new", "(int initial) -> Counter*"))
            .with_operation(op("counter_add", "(Counter* self, int amount) -> int"))
            .with_operation(op("counter_copy", "(const Counter* self) -> Counter*"))
    }

    fn list_spec(prefix: &str, c_type: &str) -> ForeignHandleSpec {
        ForeignHandleSpec::new(prefix, c_type, HandleRepr::Opaque)
            .with_operation(op(&format!("{}_new", prefix), &format!("(void) -> {}*", c_type)))
            .with_operation(op(
                &format!("{}_append", prefix),
                &format!("({}* list, int value)", c_type),
            ))
            .with_operation(op(
                &format!("{}_size", prefix),
                &format!("(const {}* list) -> size_t", c_type),
            ))
            .with_operation(op(&format!("{}_free", prefix), &format!("({}* list)", c_type)))
    }

    fn appendable() -> CapabilitySpec {
        CapabilitySpec::new("Appendable")
            .with_operation(CapabilityOperation::parse("append", "(Self* list, int value)").unwrap())
            .with_operation(CapabilityOperation::parse("size", "(const Self* list) -> size_t").unwrap())
    }

    #[test]
    fn test_counter_round_trip() {
        let report = generate(&[counter_spec()]);
        assert!(report.is_success());

        let binding = report.outcome("counter").unwrap().binding().unwrap();
        assert_eq!(binding.wrapper, "Counter");

        let new = &binding.constructors[0];
        assert_eq!(new.name, "new");
        assert_eq!(new.receiver, Receiver::None);
        assert_eq!(new.params.len(), 1);
        assert_eq!(new.params[0].ty, ForeignType::Primitive(Primitive::Int));
        assert_eq!(new.returns, ExposedReturn::Wrapper);

        let add = binding.find_method("add").unwrap();
        assert_eq!(add.receiver, Receiver::Exclusive);
        assert_eq!(add.params.len(), 1);
        assert_eq!(add.params[0].name, "amount");
        assert_eq!(add.returns, ExposedReturn::Value(ForeignType::Primitive(Primitive::Int)));

        let copy = binding.find_method("copy").unwrap();
        assert_eq!(copy.receiver, Receiver::Shared);
        assert!(copy.params.is_empty());
        assert_eq!(copy.returns, ExposedReturn::Wrapper);
    }

    #[test]
    fn test_every_operation_appears_once() {
        let report = generate(&[list_spec("slist", "SList")]);
        let binding = report.bindings().next().unwrap();
        let names: Vec<&str> = binding
            .constructors
            .iter()
            .chain(&binding.methods)
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["new", "append", "size"]);
        assert_eq!(binding.destructor.as_ref().unwrap().native_name, "slist_free");
    }

    #[test]
    fn test_generate_is_deterministic() {
        let specs = vec![counter_spec(), list_spec("slist", "SList"), list_spec("dlist", "DList")];
        let generator = Generator::default();
        let first = generator.generate(&specs, &[appendable().implemented_by("slist")]);
        let second = generator.generate(&specs, &[appendable().implemented_by("slist")]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_prefix_fails_both() {
        let a = counter_spec();
        let b = counter_spec().with_wrapper("OtherCounter");
        let report = generate(&[a, b, list_spec("slist", "SList")]);

        assert_eq!(report.failed_count(), 2);
        for outcome in &report.outcomes[..2] {
            assert!(outcome
                .errors()
                .iter()
                .any(|e| matches!(e, SpecError::DuplicatePrefix { count: 2, .. })));
        }
        assert!(report.outcomes[2].is_ok());
    }

    #[test]
    fn test_prefix_mismatch_only_fails_its_spec() {
        let slist = ForeignHandleSpec::new("slist", "SList", HandleRepr::Opaque)
            .with_operation(op("dlist_append", "(SList* list, int value)"));
        let report = generate(&[slist, list_spec("dlist", "DList")]);

        let errors = report.outcome("slist").unwrap().errors();
        assert_eq!(
            errors,
            &[SpecError::OperationPrefixMismatch {
                prefix: "slist".to_string(),
                operation: "dlist_append".to_string(),
            }]
        );
        assert!(report.outcome("dlist").unwrap().is_ok());
    }

    #[test]
    fn test_prefix_must_be_followed_by_underscore() {
        let spec = ForeignHandleSpec::new("list", "List", HandleRepr::Opaque)
            .with_operation(op("listappend", "(List* l, int v)"));
        let report = generate(&[spec]);
        assert!(matches!(
            report.outcomes[0].errors()[0],
            SpecError::OperationPrefixMismatch { .. }
        ));
    }

    #[test]
    fn test_handle_type_mismatch() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_add", "(SList* self, int amount) -> int"))
            .with_operation(op("counter_reset", "()"));
        let report = generate(&[spec]);
        let errors = report.outcomes[0].errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            SpecError::HandleTypeMismatch {
                prefix: "counter".to_string(),
                operation: "counter_add".to_string(),
                expected: "Counter* or const Counter*".to_string(),
                found: "SList*".to_string(),
            }
        );
        assert!(matches!(&errors[1], SpecError::HandleTypeMismatch { found, .. } if found == "no parameters"));
    }

    #[test]
    fn test_errors_are_collected_not_short_circuited() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("other_add", "(Counter* c)"))
            .with_operation(op("counter_sub", "(int n)"))
            .with_operation(op("counter_free", "(Counter* c) -> int"));
        let report = generate(&[spec]);
        let kinds: Vec<&str> = report.outcomes[0].errors().iter().map(SpecError::kind).collect();
        assert_eq!(
            kinds,
            vec!["OperationPrefixMismatch", "HandleTypeMismatch", "InvalidDestructor"]
        );
    }

    #[test]
    fn test_constructor_must_return_handle() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_new", "(int initial) -> int"));
        let report = generate(&[spec]);
        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::HandleTypeMismatch { found, .. } if found == "int"
        ));
    }

    #[test]
    fn test_explicit_constructor_and_exposed_name() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(
                op("counter_create_with", "(int initial, int step) -> Counter*")
                    .with_kind(OperationKind::Constructor)
                    .exposed_as("with_step"),
            )
            .with_operation(op("counter_type", "(const Counter* c) -> int"));
        let report = generate(&[spec]);
        let binding = report.bindings().next().unwrap();
        assert_eq!(binding.constructors[0].name, "with_step");
        assert_eq!(binding.constructors[0].params.len(), 2);
        assert!(binding.find_method("type").is_some());
    }

    #[test]
    fn test_duplicate_method_names() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_get", "(const Counter* c) -> int"))
            .with_operation(op("counter_value", "(const Counter* c) -> int").exposed_as("get"))
            .with_operation(op("counter_as_ptr", "(Counter* c) -> void*"));
        let report = generate(&[spec]);
        let errors = report.outcomes[0].errors();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, SpecError::DuplicateMethod { .. })));
    }

    #[test]
    fn test_unnamed_params_get_positional_names() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_set", "(Counter*, int, long)"));
        let report = generate(&[spec]);
        let set = report.bindings().next().unwrap().find_method("set").unwrap().clone();
        let names: Vec<String> = set.params.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["arg0", "arg1"]);
    }

    #[test]
    fn test_param_named_like_handle_param_rejected() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_set", "(Counter* c, int this)"));
        let report = generate(&[spec]);
        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::InvalidIdentifier { what, name, .. } if what == "parameter" && name == "this"
        ));
    }

    #[test]
    fn test_second_destructor_rejected() {
        let spec = ForeignHandleSpec::new("counter", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_free", "(Counter* c)"))
            .with_operation(op("counter_destroy", "(Counter* c)"));
        let report = generate(&[spec]);
        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::InvalidDestructor { operation, .. } if operation == "counter_destroy"
        ));
    }

    #[test]
    fn test_opaque_fields_are_omitted() {
        let spec = counter_spec().with_field(FieldSpec::parse("count", "int").unwrap());
        let report = generate(&[spec]);
        let binding = report.bindings().next().unwrap();
        assert!(binding.fields.is_empty());
        assert_eq!(binding.omitted_fields, vec!["count"]);
    }

    #[test]
    fn test_layout_field_offsets() {
        let spec = ForeignHandleSpec::new("point", "Point", HandleRepr::Layout)
            .with_field(FieldSpec::parse("tag", "char").unwrap())
            .with_field(FieldSpec::parse("x", "double").unwrap())
            .with_field(FieldSpec::parse("y", "int").unwrap())
            .with_field(FieldSpec::parse("next", "Point*").unwrap());
        let report = generate(&[spec]);
        let binding = report.bindings().next().unwrap();
        let offsets: Vec<(&str, usize)> = binding
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect();
        assert_eq!(offsets, vec![("tag", 0), ("x", 8), ("y", 16), ("next", 24)]);
        assert_eq!(binding.layout_size(), 32);
    }

    #[test]
    fn test_field_clashing_with_method() {
        let spec = ForeignHandleSpec::new("point", "Point", HandleRepr::Layout)
            .with_field(FieldSpec::parse("x", "int").unwrap())
            .with_operation(op("point_x", "(const Point* p) -> int"));
        let report = generate(&[spec]);
        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::DuplicateMethod { method, .. } if method == "x"
        ));
    }

    #[test]
    fn test_empty_prefix() {
        let spec = ForeignHandleSpec::new("", "Counter", HandleRepr::Opaque)
            .with_operation(op("counter_new", "() -> Counter*"));
        let report = generate(&[spec]);
        assert_eq!(
            report.outcomes[0].errors(),
            &[SpecError::EmptyPrefix {
                c_type: "Counter".to_string()
            }]
        );
    }

    #[test]
    fn test_duplicate_wrapper_and_c_type() {
        let a = list_spec("slist", "List");
        let b = list_spec("dlist", "List");
        let report = generate(&[a, b]);
        for outcome in &report.outcomes {
            let kinds: Vec<&str> = outcome.errors().iter().map(SpecError::kind).collect();
            assert_eq!(kinds, vec!["DuplicateWrapper", "DuplicateCType"]);
        }
    }

    #[test]
    fn test_appendable_shared_trait() {
        let specs = vec![list_spec("slist", "SList"), list_spec("dlist", "DList")];
        let capability = appendable().implemented_by("slist").implemented_by("dlist");
        let report = Generator::default().generate(&specs, &[capability]);

        assert!(report.is_success());
        assert_eq!(report.capabilities.len(), 1);
        assert_eq!(report.capabilities[0].implementors, vec!["SList", "DList"]);
        for binding in report.bindings() {
            assert_eq!(binding.capabilities, vec!["Appendable"]);
        }
    }

    #[test]
    fn test_no_trait_without_assertion() {
        let specs = vec![list_spec("slist", "SList"), list_spec("dlist", "DList")];
        let report = generate(&specs);
        assert!(report.capabilities.is_empty());

        let slist = report.outcome("slist").unwrap().binding().unwrap();
        let dlist = report.outcome("dlist").unwrap().binding().unwrap();
        let shape = |b: &GeneratedBinding| {
            b.methods
                .iter()
                .map(|m| (m.name.clone(), m.receiver, m.params.len()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(slist), shape(dlist));
        assert!(slist.capabilities.is_empty());
    }

    #[test]
    fn test_self_placeholder_rejected_outside_capabilities() {
        let spec = counter_spec().with_operation(op("counter_merge", "(Counter* c, Self* other)"));
        let report = generate(&[spec]);

        assert_eq!(
            report.outcomes[0].errors(),
            &[SpecError::InvalidIdentifier {
                prefix: "counter".to_string(),
                what: "type".to_string(),
                name: "Self".to_string(),
            }]
        );
    }

    #[test]
    fn test_reserved_struct_names_rejected() {
        let returns = counter_spec().with_operation(op("counter_owner", "(const Counter* c) -> crate*"));
        let field = ForeignHandleSpec::new("node", "Node", HandleRepr::Layout)
            .with_field(FieldSpec::parse("parent", "Self*").unwrap());
        let report = generate(&[returns, field]);

        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::InvalidIdentifier { what, name, .. } if what == "type" && name == "crate"
        ));
        assert!(matches!(
            &report.outcomes[1].errors()[0],
            SpecError::InvalidIdentifier { what, name, .. } if what == "type" && name == "Self"
        ));
    }

    #[test]
    fn test_invalid_ffi_module_option() {
        let options = GeneratorOptions {
            ffi_module: "raw-sys".to_string(),
            ..GeneratorOptions::default()
        };
        let report = Generator::new(options).generate(&[counter_spec()], &[]);

        assert!(report.outcomes[0].is_ok());
        assert_eq!(
            report.option_errors,
            vec![SpecError::InvalidOption {
                option: "ffi_module".to_string(),
                value: "raw-sys".to_string(),
            }]
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_wrapper_clashing_with_ffi_module() {
        let spec = ForeignHandleSpec::new("ffi", "ffi_t", HandleRepr::Opaque).with_wrapper("ffi");
        let report = generate(&[spec]);
        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::InvalidIdentifier { what, name, .. } if what == "wrapper" && name == "ffi"
        ));
    }
}
