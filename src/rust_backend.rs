//! Модуль `rust_backend`
//!
//! Вывод сгенерированных обёрток в виде исходного кода на Rust.
//!
//! Структура файла:
//! - модуль `ffi` с `#[repr(C)]` структурами и блоком `extern "C"`
//! - проверки раскладки через `offset_of!` (для структур с полями)
//! - по одной обёртке на спецификацию: `NonNull` хэндл, конструкторы,
//!   пересылающие методы, аксессоры полей и `Drop`, если есть деструктор
//! - трейты capability и их реализации
//!
//! Обёртки не реализуют `Send`/`Sync`: `NonNull` запрещает это по умолчанию,
//! а блокировки не добавляются.

use std::collections::{BTreeSet, HashSet};

use crate::binding::{
    CapabilityMethod, Destructor, ExposedReturn, GeneratedBinding, GeneratedCapability,
    GenerationReport, Method, MethodParam, Receiver,
};
use crate::config::GeneratorOptions;
use crate::generator::HANDLE_PARAM;
use crate::naming::rust_ident;
use crate::spec::HandleRepr;

/// Буфер исходного кода с отступами.
#[derive(Debug, Default)]
struct CodeWriter {
    buf: String,
    indent: usize,
}

impl CodeWriter {
    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.buf.push_str("    ");
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Строка, открывающая блок (`... {`).
    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }

    fn close(&mut self) {
        self.close_with("}");
    }

    fn close_with(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Бэкенд, печатающий Rust-код.
pub struct RustBackend<'a> {
    options: &'a GeneratorOptions,
    /// `ffi::` - префикс путей к сырым объявлениям снаружи модуля.
    ns: String,
}

impl<'a> RustBackend<'a> {
    pub fn new(options: &'a GeneratorOptions) -> Self {
        Self {
            options,
            ns: format!("{}::", rust_ident(&options.ffi_module)),
        }
    }

    /// Напечатать все успешные обёртки отчёта в один файл.
    pub fn emit(&self, report: &GenerationReport) -> String {
        let bindings: Vec<&GeneratedBinding> = report.bindings().collect();
        let mut out = CodeWriter::default();

        out.line(format!(
            "// @generated by handlebind {}. Do not edit.",
            env!("CARGO_PKG_VERSION")
        ));
        out.blank();

        self.emit_ffi(&mut out, &bindings);

        if self.options.layout_asserts {
            for binding in bindings.iter().filter(|b| !b.fields.is_empty()) {
                out.blank();
                self.emit_layout_asserts(&mut out, binding);
            }
        }

        for binding in &bindings {
            out.blank();
            self.emit_wrapper(&mut out, binding);
        }

        for capability in &report.capabilities {
            out.blank();
            self.emit_capability(&mut out, capability, &bindings);
        }

        out.finish()
    }

    fn emit_ffi(&self, out: &mut CodeWriter, bindings: &[&GeneratedBinding]) {
        out.line("#[allow(non_camel_case_types, non_snake_case, dead_code)]");
        out.open(format!("pub mod {} {{", rust_ident(&self.options.ffi_module)));

        let declared: HashSet<&str> = bindings.iter().map(|b| b.c_type.as_str()).collect();
        for binding in bindings {
            match binding.repr {
                HandleRepr::Opaque => emit_opaque_struct(out, &binding.c_type),
                HandleRepr::Layout => {
                    out.line(format!("/// `{}` with a known field layout.", binding.c_type));
                    out.line("#[repr(C)]");
                    out.open(format!("pub struct {} {{", rust_ident(&binding.c_type)));
                    for field in &binding.fields {
                        out.line(format!("pub {}: {},", rust_ident(&field.name), field.ty.to_rust("")));
                    }
                    out.close();
                }
            }
            out.blank();
        }

        // Структуры, которые встречаются в сигнатурах, но сами не описаны
        let mut foreign: BTreeSet<&str> = BTreeSet::new();
        for binding in bindings {
            let mut named = Vec::new();
            for method in binding.constructors.iter().chain(&binding.methods) {
                method.native_returns.collect_named(&mut named);
                for param in &method.params {
                    param.ty.collect_named(&mut named);
                }
            }
            for field in &binding.fields {
                field.ty.collect_named(&mut named);
            }
            foreign.extend(named.into_iter().filter(|n| !declared.contains(n)));
        }
        for name in foreign {
            emit_opaque_struct(out, name);
            out.blank();
        }

        if let Some(link_name) = &self.options.link_name {
            out.line(format!("#[link(name = {:?})]", link_name));
        }
        out.open("extern \"C\" {");
        for binding in bindings {
            for method in binding.constructors.iter().chain(&binding.methods) {
                emit_extern_fn(out, method);
            }
            if let Some(destructor) = &binding.destructor {
                emit_extern_destructor(out, destructor);
            }
        }
        out.close();

        out.close();
    }

    fn emit_layout_asserts(&self, out: &mut CodeWriter, binding: &GeneratedBinding) {
        let ty = format!("{}{}", self.ns, rust_ident(&binding.c_type));
        out.line("#[cfg(target_pointer_width = \"64\")]");
        out.open("const _: () = {");
        for field in &binding.fields {
            out.line(format!(
                "assert!(core::mem::offset_of!({}, {}) == {});",
                ty,
                rust_ident(&field.name),
                field.offset
            ));
        }
        out.line(format!(
            "assert!(core::mem::size_of::<{}>() == {});",
            ty,
            binding.layout_size()
        ));
        out.close_with("};");
    }

    fn emit_wrapper(&self, out: &mut CodeWriter, binding: &GeneratedBinding) {
        let raw = format!("{}{}", self.ns, rust_ident(&binding.c_type));
        let wrapper = rust_ident(&binding.wrapper);

        out.line(format!(
            "/// Owned `{}*` handle; methods forward to the `{}_*` functions.",
            binding.c_type, binding.prefix
        ));
        if self.options.derive_debug {
            out.line("#[derive(Debug)]");
        }
        out.open(format!("pub struct {} {{", wrapper));
        out.line(format!("raw: core::ptr::NonNull<{}>,", raw));
        out.close();
        out.blank();

        out.open(format!("impl {} {{", wrapper));
        for method in &binding.constructors {
            self.emit_method(out, method);
            out.blank();
        }
        self.emit_raw_helpers(out, binding, &raw);
        for method in &binding.methods {
            out.blank();
            self.emit_method(out, method);
        }
        for field in &binding.fields {
            out.blank();
            out.line(format!("/// Reads field `{}` (offset {}).", field.name, field.offset));
            out.open(format!(
                "pub fn {}(&self) -> {} {{",
                rust_ident(&field.name),
                field.ty.to_rust(&self.ns)
            ));
            out.line(format!("unsafe {{ (*self.raw.as_ptr()).{} }}", rust_ident(&field.name)));
            out.close();
        }
        out.close();

        if let Some(destructor) = &binding.destructor {
            out.blank();
            out.open(format!("impl Drop for {} {{", wrapper));
            out.open("fn drop(&mut self) {");
            out.line(format!(
                "unsafe {{ {}{}(self.raw.as_ptr()) }}",
                self.ns,
                rust_ident(&destructor.native_name)
            ));
            out.close();
            out.close();
        }
    }

    fn emit_raw_helpers(&self, out: &mut CodeWriter, binding: &GeneratedBinding, raw: &str) {
        out.line("/// Takes ownership of a raw handle.");
        out.line("///");
        out.line("/// # Safety");
        out.line("///");
        out.line(format!(
            "/// `raw` must be a live `{}` handle that no other wrapper owns.",
            binding.c_type
        ));
        out.open(format!("pub unsafe fn from_raw(raw: *mut {}) -> Option<Self> {{", raw));
        out.line("core::ptr::NonNull::new(raw).map(|raw| Self { raw })");
        out.close();
        out.blank();

        out.open(format!("pub fn as_ptr(&self) -> *mut {} {{", raw));
        out.line("self.raw.as_ptr()");
        out.close();
        out.blank();

        out.line("/// Releases ownership without running the destructor.");
        out.open(format!("pub fn into_raw(self) -> *mut {} {{", raw));
        out.line("let this = core::mem::ManuallyDrop::new(self);");
        out.line("this.raw.as_ptr()");
        out.close();
    }

    fn emit_method(&self, out: &mut CodeWriter, method: &Method) {
        let mut args: Vec<String> = Vec::new();
        if method.receiver != Receiver::None {
            args.push("self.raw.as_ptr()".to_string());
        }
        args.extend(method.params.iter().map(|p| rust_ident(&p.name)));
        let call = format!(
            "{}{}({})",
            self.ns,
            rust_ident(&method.native_name),
            args.join(", ")
        );

        out.line(format!("/// Calls `{}`.", method.native_name));
        out.open(format!(
            "pub fn {} {{",
            self.signature(&method.name, method.receiver, &method.params, &method.returns)
        ));
        match &method.returns {
            ExposedReturn::Wrapper => {
                out.line(format!("let raw = unsafe {{ {} }};", call));
                out.line("core::ptr::NonNull::new(raw).map(|raw| Self { raw })");
            }
            ExposedReturn::Unit | ExposedReturn::Value(_) => {
                out.line(format!("unsafe {{ {} }}", call));
            }
        }
        out.close();
    }

    /// `name(&mut self, a: T) -> R` без `fn` и тела.
    fn signature(
        &self,
        name: &str,
        receiver: Receiver,
        params: &[MethodParam],
        returns: &ExposedReturn,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();
        match receiver {
            Receiver::None => {}
            Receiver::Shared => parts.push("&self".to_string()),
            Receiver::Exclusive => parts.push("&mut self".to_string()),
        }
        parts.extend(
            params
                .iter()
                .map(|p| format!("{}: {}", rust_ident(&p.name), p.ty.to_rust(&self.ns))),
        );

        let ret = match returns {
            ExposedReturn::Unit => String::new(),
            ExposedReturn::Value(ty) => format!(" -> {}", ty.to_rust(&self.ns)),
            ExposedReturn::Wrapper => " -> Option<Self>".to_string(),
        };
        format!("{}({}){}", rust_ident(name), parts.join(", "), ret)
    }

    fn emit_capability(
        &self,
        out: &mut CodeWriter,
        capability: &GeneratedCapability,
        bindings: &[&GeneratedBinding],
    ) {
        let name = rust_ident(&capability.name);
        out.open(format!("pub trait {} {{", name));
        for method in &capability.methods {
            out.line(format!("{};", self.trait_signature(method)));
        }
        out.close();

        for wrapper in &capability.implementors {
            if !bindings.iter().any(|b| &b.wrapper == wrapper) {
                continue;
            }
            out.blank();
            let wrapper = rust_ident(wrapper);
            out.open(format!("impl {} for {} {{", name, wrapper));
            for (index, method) in capability.methods.iter().enumerate() {
                if index > 0 {
                    out.blank();
                }
                let mut args = vec!["self".to_string()];
                args.extend(method.params.iter().map(|p| rust_ident(&p.name)));
                out.open(format!("{} {{", self.trait_signature(method)));
                out.line(format!("{}::{}({})", wrapper, rust_ident(&method.name), args.join(", ")));
                out.close();
            }
            out.close();
        }
    }

    fn trait_signature(&self, method: &CapabilityMethod) -> String {
        let sig = self.signature(&method.name, method.receiver, &method.params, &method.returns);
        if method.returns == ExposedReturn::Wrapper {
            format!("fn {} where Self: Sized", sig)
        } else {
            format!("fn {}", sig)
        }
    }
}

fn emit_opaque_struct(out: &mut CodeWriter, name: &str) {
    out.line(format!("/// Opaque `{}`.", name));
    out.line("#[repr(C)]");
    out.open(format!("pub struct {} {{", rust_ident(name)));
    out.line("_opaque: [u8; 0],");
    out.line("_marker: core::marker::PhantomData<(*mut u8, core::marker::PhantomPinned)>,");
    out.close();
}

fn emit_extern_fn(out: &mut CodeWriter, method: &Method) {
    let mut params: Vec<String> = Vec::new();
    if let Some(receiver) = &method.native_receiver {
        params.push(format!("{}: {}", HANDLE_PARAM, receiver.to_rust("")));
    }
    params.extend(
        method
            .params
            .iter()
            .map(|p| format!("{}: {}", rust_ident(&p.name), p.ty.to_rust(""))),
    );
    let ret = if method.native_returns.is_void() {
        String::new()
    } else {
        format!(" -> {}", method.native_returns.to_rust(""))
    };
    out.line(format!(
        "pub fn {}({}){};",
        rust_ident(&method.native_name),
        params.join(", "),
        ret
    ));
}

fn emit_extern_destructor(out: &mut CodeWriter, destructor: &Destructor) {
    out.line(format!(
        "pub fn {}({}: {});",
        rust_ident(&destructor.native_name),
        HANDLE_PARAM,
        destructor.native_receiver.to_rust("")
    ));
}

/// Сгенерировать Rust-код для отчёта.
pub fn emit_rust(report: &GenerationReport, options: &GeneratorOptions) -> String {
    RustBackend::new(options).emit(report)
}
