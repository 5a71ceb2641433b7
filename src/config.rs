//! Настройки генератора.
//!
//! Читаются из таблицы `[options]` файла описания; CLI может переопределить
//! часть из них.

use serde::{Deserialize, Serialize};

/// Настройки генерации и вывода.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Имя библиотеки для `#[link(name = ...)]`.
    pub link_name: Option<String>,

    /// Имя модуля с сырыми объявлениями.
    pub ffi_module: String,

    /// Генерировать проверки `offset_of!` для структур с раскладкой.
    pub layout_asserts: bool,

    /// Имена методов, которые считаются конструкторами (`counter_new`).
    pub constructor_names: Vec<String>,

    /// Имена методов, которые считаются деструкторами (`counter_free`).
    pub destructor_names: Vec<String>,

    /// Добавлять `#[derive(Debug)]` к обёрткам.
    pub derive_debug: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            link_name: None,
            ffi_module: "ffi".to_string(),
            layout_asserts: true,
            constructor_names: vec!["new".to_string()],
            destructor_names: vec!["free".to_string(), "destroy".to_string()],
            derive_debug: true,
        }
    }
}

impl GeneratorOptions {
    pub fn is_constructor_name(&self, name: &str) -> bool {
        self.constructor_names.iter().any(|n| n == name)
    }

    pub fn is_destructor_name(&self, name: &str) -> bool {
        self.destructor_names.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GeneratorOptions::default();
        assert_eq!(options.ffi_module, "ffi");
        assert!(options.is_constructor_name("new"));
        assert!(options.is_destructor_name("destroy"));
        assert!(!options.is_destructor_name("release"));
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let options: GeneratorOptions = toml::from_str("link_name = \"counter\"").unwrap();
        assert_eq!(options.link_name.as_deref(), Some("counter"));
        assert!(options.layout_asserts);
        assert_eq!(options.destructor_names, vec!["free", "destroy"]);
    }
}
