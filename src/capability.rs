//! Capability: явно заявленные общие абстракции.
//!
//! Два несвязанных внешних типа (`slist_*` и `dlist_*`) могут иметь
//! одинаковые по форме операции. Общий трейт генерируется только если
//! вызывающий перечислил реализующие префиксы; каждый из них проверяется
//! структурно по уже собранным методам обёртки.

use std::collections::HashSet;

use crate::binding::{
    CapabilityMethod, ExposedReturn, GeneratedBinding, GeneratedCapability, MethodParam, Receiver,
};
use crate::error::SpecError;
use crate::generator::HANDLE_PARAM;
use crate::naming;
use crate::spec::{CapabilityOperation, CapabilitySpec, ForeignHandleSpec};
use crate::types::{ForeignType, SELF_TYPE};

/// Capability с индексами реализаций, прошедших проверку.
#[derive(Debug)]
pub(crate) struct ResolvedCapability {
    pub capability: GeneratedCapability,
    pub implementors: Vec<usize>,
}

/// Проверить все capability.
///
/// Несоответствия записываются в ошибки соответствующей спецификации,
/// ошибки самих описаний capability возвращаются отдельно.
pub(crate) fn resolve(
    capabilities: &[CapabilitySpec],
    specs: &[ForeignHandleSpec],
    drafts: &mut [GeneratedBinding],
    errors: &mut [Vec<SpecError>],
) -> (Vec<ResolvedCapability>, Vec<SpecError>) {
    let mut resolved = Vec::new();
    let mut capability_errors = Vec::new();
    let mut names: HashSet<&str> = HashSet::new();

    for capability in capabilities {
        if !names.insert(capability.name.as_str()) {
            capability_errors.push(SpecError::InvalidCapability {
                capability: capability.name.clone(),
                operation: String::new(),
                reason: "declared more than once".to_string(),
            });
            continue;
        }

        if specs.iter().any(|s| s.wrapper_name() == capability.name) {
            capability_errors.push(SpecError::InvalidCapability {
                capability: capability.name.clone(),
                operation: String::new(),
                reason: "trait name clashes with a wrapper type".to_string(),
            });
            continue;
        }

        let methods = match resolve_methods(capability) {
            Ok(methods) => methods,
            Err(errs) => {
                capability_errors.extend(errs);
                continue;
            }
        };

        let mut implementors = Vec::new();
        for prefix in &capability.implementors {
            let Some(index) = specs.iter().position(|s| &s.prefix == prefix) else {
                capability_errors.push(SpecError::UnknownImplementor {
                    capability: capability.name.clone(),
                    prefix: prefix.clone(),
                });
                continue;
            };
            if implementors.contains(&index) {
                continue;
            }

            let reasons = mismatches(&methods, &drafts[index]);
            if reasons.is_empty() {
                drafts[index].capabilities.push(capability.name.clone());
                implementors.push(index);
            } else {
                errors[index].extend(reasons.into_iter().map(|reason| {
                    SpecError::CapabilityNotSatisfied {
                        prefix: prefix.clone(),
                        capability: capability.name.clone(),
                        reason,
                    }
                }));
            }
        }

        resolved.push(ResolvedCapability {
            capability: GeneratedCapability {
                name: capability.name.clone(),
                methods,
                implementors: Vec::new(),
            },
            implementors,
        });
    }

    (resolved, capability_errors)
}

/// Перевести сигнатуры capability в методы трейта.
fn resolve_methods(capability: &CapabilitySpec) -> Result<Vec<CapabilityMethod>, Vec<SpecError>> {
    let mut errors = Vec::new();
    let invalid = |operation: &str, reason: String| SpecError::InvalidCapability {
        capability: capability.name.clone(),
        operation: operation.to_string(),
        reason,
    };

    if !naming::is_rust_usable(&capability.name) {
        errors.push(invalid("", "invalid trait name".to_string()));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut methods = Vec::with_capacity(capability.operations.len());
    for operation in &capability.operations {
        if !naming::is_rust_usable(&operation.name) || !seen.insert(operation.name.as_str()) {
            errors.push(invalid(&operation.name, "invalid or repeated method name".to_string()));
            continue;
        }
        match resolve_method(operation) {
            Ok(method) => methods.push(method),
            Err(reason) => errors.push(invalid(&operation.name, reason)),
        }
    }

    if errors.is_empty() {
        Ok(methods)
    } else {
        Err(errors)
    }
}

fn resolve_method(operation: &CapabilityOperation) -> Result<CapabilityMethod, String> {
    let receiver = match operation.params.first() {
        Some(first) if first.ty.is_handle_of(SELF_TYPE) => {
            if first.ty.is_const_pointer() {
                Receiver::Shared
            } else {
                Receiver::Exclusive
            }
        }
        _ => return Err(format!("first parameter must be `{}*`", SELF_TYPE)),
    };

    let mut params = Vec::new();
    let mut seen: HashSet<String> = HashSet::from([HANDLE_PARAM.to_string()]);
    for (index, param) in operation.params[1..].iter().enumerate() {
        if param.ty.mentions(SELF_TYPE) {
            return Err(format!(
                "`{}` may only appear as the receiver or the return type",
                SELF_TYPE
            ));
        }
        check_named(&param.ty)?;

        let name = param.name.clone().unwrap_or_else(|| format!("arg{}", index));
        if !naming::is_rust_usable(&name) || !seen.insert(name.clone()) {
            return Err(format!("invalid or repeated parameter name `{}`", name));
        }
        params.push(MethodParam {
            name,
            ty: param.ty.clone(),
        });
    }

    let self_handle = ForeignType::handle(SELF_TYPE);
    let returns = if operation.returns.is_void() {
        ExposedReturn::Unit
    } else if operation.returns == self_handle {
        ExposedReturn::Wrapper
    } else if operation.returns.mentions(SELF_TYPE) {
        return Err(format!("return type `{}` is not supported", operation.returns));
    } else {
        check_named(&operation.returns)?;
        ExposedReturn::Value(operation.returns.clone())
    };

    Ok(CapabilityMethod {
        name: operation.name.clone(),
        receiver,
        params,
        returns,
    })
}

/// Имена структур в сигнатуре должны быть записываемы в Rust.
fn check_named(ty: &ForeignType) -> Result<(), String> {
    let mut named = Vec::new();
    ty.collect_named(&mut named);
    match named.into_iter().find(|name| !naming::is_rust_usable(name)) {
        Some(name) => Err(format!("invalid type name `{}`", name)),
        None => Ok(()),
    }
}

/// Структурное сравнение: имя, получатель, типы параметров, результат.
fn mismatches(required: &[CapabilityMethod], binding: &GeneratedBinding) -> Vec<String> {
    let mut reasons = Vec::new();

    for method in required {
        let Some(found) = binding.methods.iter().find(|m| m.name == method.name) else {
            reasons.push(format!("missing method `{}`", method.name));
            continue;
        };

        if found.receiver != method.receiver {
            reasons.push(format!(
                "method `{}` takes `{}`, expected `{}`",
                method.name,
                receiver_label(found.receiver),
                receiver_label(method.receiver)
            ));
        }

        let found_types: Vec<&ForeignType> = found.params.iter().map(|p| &p.ty).collect();
        let required_types: Vec<&ForeignType> = method.params.iter().map(|p| &p.ty).collect();
        if found_types != required_types {
            reasons.push(format!(
                "method `{}` takes ({}), expected ({})",
                method.name,
                type_list(&found_types),
                type_list(&required_types)
            ));
        }

        if found.returns != method.returns {
            reasons.push(format!(
                "method `{}` returns {}, expected {}",
                method.name,
                return_label(&found.returns),
                return_label(&method.returns)
            ));
        }
    }

    reasons
}

fn receiver_label(receiver: Receiver) -> &'static str {
    match receiver {
        Receiver::None => "no receiver",
        Receiver::Shared => "&self",
        Receiver::Exclusive => "&mut self",
    }
}

fn return_label(returns: &ExposedReturn) -> String {
    match returns {
        ExposedReturn::Unit => "`void`".to_string(),
        ExposedReturn::Value(ty) => format!("`{}`", ty),
        ExposedReturn::Wrapper => "the wrapper type".to_string(),
    }
}

fn type_list(types: &[&ForeignType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::spec::{HandleRepr, OperationSpec};

    fn list(prefix: &str, c_type: &str, append_sig: &str) -> ForeignHandleSpec {
        ForeignHandleSpec::new(prefix, c_type, HandleRepr::Opaque)
            .with_operation(OperationSpec::parse(format!("{}_append", prefix), append_sig).unwrap())
            .with_operation(
                OperationSpec::parse(format!("{}_size", prefix), &format!("(const {}* l) -> size_t", c_type))
                    .unwrap(),
            )
    }

    fn appendable() -> CapabilitySpec {
        CapabilitySpec::new("Appendable")
            .with_operation(CapabilityOperation::parse("append", "(Self* list, int value)").unwrap())
            .with_operation(CapabilityOperation::parse("size", "(const Self* list) -> size_t").unwrap())
    }

    #[test]
    fn test_structural_mismatch_fails_implementor() {
        let specs = vec![
            list("slist", "SList", "(SList* l, int v)"),
            list("dlist", "DList", "(DList* l, long v)"),
        ];
        let capability = appendable().implemented_by("slist").implemented_by("dlist");
        let report = Generator::default().generate(&specs, &[capability]);

        assert!(report.outcome("slist").unwrap().is_ok());
        let errors = report.outcome("dlist").unwrap().errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SpecError::CapabilityNotSatisfied { reason, .. }
                if reason == "method `append` takes (long), expected (int)"
        ));
        assert_eq!(report.capabilities[0].implementors, vec!["SList"]);
    }

    #[test]
    fn test_receiver_mismatch() {
        let specs = vec![ForeignHandleSpec::new("slist", "SList", HandleRepr::Opaque)
            .with_operation(OperationSpec::parse("slist_append", "(SList* l, int v)").unwrap())
            .with_operation(OperationSpec::parse("slist_size", "(SList* l) -> size_t").unwrap())];
        let report = Generator::default().generate(&specs, &[appendable().implemented_by("slist")]);

        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::CapabilityNotSatisfied { reason, .. }
                if reason == "method `size` takes `&mut self`, expected `&self`"
        ));
        assert!(report.capabilities.is_empty());
    }

    #[test]
    fn test_missing_method() {
        let specs = vec![ForeignHandleSpec::new("slist", "SList", HandleRepr::Opaque)
            .with_operation(OperationSpec::parse("slist_append", "(SList* l, int v)").unwrap())];
        let report = Generator::default().generate(&specs, &[appendable().implemented_by("slist")]);
        assert!(matches!(
            &report.outcomes[0].errors()[0],
            SpecError::CapabilityNotSatisfied { reason, .. } if reason == "missing method `size`"
        ));
    }

    #[test]
    fn test_unknown_implementor() {
        let specs = vec![list("slist", "SList", "(SList* l, int v)")];
        let capability = appendable().implemented_by("slist").implemented_by("vector");
        let report = Generator::default().generate(&specs, &[capability]);

        assert!(report.outcomes[0].is_ok());
        assert_eq!(
            report.capability_errors,
            vec![SpecError::UnknownImplementor {
                capability: "Appendable".to_string(),
                prefix: "vector".to_string(),
            }]
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_invalid_capability_signature() {
        let capability = CapabilitySpec::new("Mergeable")
            .with_operation(CapabilityOperation::parse("merge", "(Self* a, Self* b)").unwrap())
            .with_operation(CapabilityOperation::parse("len", "(int n) -> int").unwrap())
            .implemented_by("slist");
        let specs = vec![list("slist", "SList", "(SList* l, int v)")];
        let report = Generator::default().generate(&specs, &[capability]);

        assert_eq!(report.capability_errors.len(), 2);
        assert!(report.capabilities.is_empty());
        assert!(report.outcomes[0].is_ok());
        assert!(report.outcomes[0].binding().unwrap().capabilities.is_empty());
    }

    #[test]
    fn test_wrapper_return_matches() {
        let method = resolve_method(&CapabilityOperation::parse("copy", "(const Self* s) -> Self*").unwrap())
            .unwrap();
        assert_eq!(method.receiver, Receiver::Shared);
        assert_eq!(method.returns, ExposedReturn::Wrapper);
    }

    #[test]
    fn test_unusable_parameter_names_rejected() {
        let specs = vec![list("slist", "SList", "(SList* l, int v)")];
        for signature in ["(Self* l, int self)", "(Self* l, int this)", "(Self* l, int a, int a)"] {
            let capability = CapabilitySpec::new("Appendable")
                .with_operation(CapabilityOperation::parse("append", signature).unwrap())
                .implemented_by("slist");
            let report = Generator::default().generate(&specs, &[capability]);

            assert!(
                matches!(
                    &report.capability_errors[..],
                    [SpecError::InvalidCapability { operation, .. }] if operation == "append"
                ),
                "{}: {:?}",
                signature,
                report.capability_errors
            );
            assert!(report.capabilities.is_empty());
            assert!(!report.is_success());
        }
    }

    #[test]
    fn test_unusable_type_name_in_capability() {
        let err = resolve_method(&CapabilityOperation::parse("parent", "(const Self* s) -> crate*").unwrap())
            .unwrap_err();
        assert_eq!(err, "invalid type name `crate`");
    }

    #[test]
    fn test_capability_named_like_wrapper() {
        let specs = vec![list("slist", "SList", "(SList* l, int v)")];
        let capability = CapabilitySpec::new("SList")
            .with_operation(CapabilityOperation::parse("append", "(Self* l, int v)").unwrap())
            .implemented_by("slist");
        let report = Generator::default().generate(&specs, &[capability]);

        assert!(matches!(
            &report.capability_errors[..],
            [SpecError::InvalidCapability { capability, .. }] if capability == "SList"
        ));
        assert!(report.capabilities.is_empty());
    }
}
