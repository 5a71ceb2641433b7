//! Модуль `types`
//!
//! Система типов внешнего C API:
//! - примитивные скаляры и их раскладка (LP64);
//! - указатели на именованные структуры (хэндлы);
//! - запись типов на C и на Rust.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming::rust_ident;

/// Примитивный тип C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    Size,
    SSize,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl Primitive {
    /// Найти тип фиксированной ширины или `size_t`-подобный по имени.
    pub fn from_keyword(word: &str) -> Option<Self> {
        let prim = match word {
            "bool" | "_Bool" => Self::Bool,
            "float" => Self::Float,
            "double" => Self::Double,
            "size_t" => Self::Size,
            "ssize_t" | "ptrdiff_t" => Self::SSize,
            "int8_t" => Self::I8,
            "int16_t" => Self::I16,
            "int32_t" => Self::I32,
            "int64_t" => Self::I64,
            "uint8_t" => Self::U8,
            "uint16_t" => Self::U16,
            "uint32_t" => Self::U32,
            "uint64_t" => Self::U64,
            _ => return None,
        };
        Some(prim)
    }

    /// Запись на C.
    pub fn c_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::SChar => "signed char",
            Self::UChar => "unsigned char",
            Self::Short => "short",
            Self::UShort => "unsigned short",
            Self::Int => "int",
            Self::UInt => "unsigned int",
            Self::Long => "long",
            Self::ULong => "unsigned long",
            Self::LongLong => "long long",
            Self::ULongLong => "unsigned long long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Size => "size_t",
            Self::SSize => "ssize_t",
            Self::I8 => "int8_t",
            Self::I16 => "int16_t",
            Self::I32 => "int32_t",
            Self::I64 => "int64_t",
            Self::U8 => "uint8_t",
            Self::U16 => "uint16_t",
            Self::U32 => "uint32_t",
            Self::U64 => "uint64_t",
        }
    }

    /// Запись на Rust (типы `core::ffi` там, где ширина зависит от платформы).
    pub fn rust_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "core::ffi::c_char",
            Self::SChar => "core::ffi::c_schar",
            Self::UChar => "core::ffi::c_uchar",
            Self::Short => "core::ffi::c_short",
            Self::UShort => "core::ffi::c_ushort",
            Self::Int => "core::ffi::c_int",
            Self::UInt => "core::ffi::c_uint",
            Self::Long => "core::ffi::c_long",
            Self::ULong => "core::ffi::c_ulong",
            Self::LongLong => "core::ffi::c_longlong",
            Self::ULongLong => "core::ffi::c_ulonglong",
            Self::Float => "f32",
            Self::Double => "f64",
            Self::Size => "usize",
            Self::SSize => "isize",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
        }
    }

    /// Размер и выравнивание в байтах (LP64).
    pub fn layout(self) -> (usize, usize) {
        let size = match self {
            Self::Bool | Self::Char | Self::SChar | Self::UChar | Self::I8 | Self::U8 => 1,
            Self::Short | Self::UShort | Self::I16 | Self::U16 => 2,
            Self::Int | Self::UInt | Self::Float | Self::I32 | Self::U32 => 4,
            Self::Long
            | Self::ULong
            | Self::LongLong
            | Self::ULongLong
            | Self::Double
            | Self::Size
            | Self::SSize
            | Self::I64
            | Self::U64 => 8,
        };
        (size, size)
    }
}

/// Тип во внешнем API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignType {
    /// `void` (только как тип возврата или под указателем).
    Void,
    /// Скаляр.
    Primitive(Primitive),
    /// Именованная структура; по значению не передаётся, только под указателем.
    Named(String),
    /// Указатель. `is_const` относится к указываемому значению (`const T*`).
    Pointer {
        pointee: Box<ForeignType>,
        is_const: bool,
    },
}

/// Имя-заглушка для хэндла реализующего типа в сигнатурах capability.
pub const SELF_TYPE: &str = "Self";

impl ForeignType {
    /// `T*` для именованной структуры.
    pub fn handle(name: impl Into<String>) -> Self {
        Self::Pointer {
            pointee: Box::new(Self::Named(name.into())),
            is_const: false,
        }
    }

    /// `const T*` для именованной структуры.
    pub fn const_handle(name: impl Into<String>) -> Self {
        Self::Pointer {
            pointee: Box::new(Self::Named(name.into())),
            is_const: true,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Является ли тип указателем на структуру `name` (константность не важна).
    pub fn is_handle_of(&self, name: &str) -> bool {
        match self {
            Self::Pointer { pointee, .. } => matches!(pointee.as_ref(), Self::Named(n) if n == name),
            _ => false,
        }
    }

    /// Константный ли указатель (`const T*`).
    pub fn is_const_pointer(&self) -> bool {
        matches!(self, Self::Pointer { is_const: true, .. })
    }

    /// Встречается ли где-то внутри структура `name`.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Self::Named(n) => n == name,
            Self::Pointer { pointee, .. } => pointee.mentions(name),
            _ => false,
        }
    }

    /// Собрать имена всех структур, на которые ссылается тип.
    pub fn collect_named<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Named(n) => out.push(n),
            Self::Pointer { pointee, .. } => pointee.collect_named(out),
            _ => {}
        }
    }

    /// Размер и выравнивание поля такого типа, если оно имеет раскладку.
    pub fn layout(&self) -> Option<(usize, usize)> {
        match self {
            Self::Primitive(p) => Some(p.layout()),
            Self::Pointer { .. } => Some((8, 8)),
            Self::Void | Self::Named(_) => None,
        }
    }

    /// Запись на Rust. Именованные структуры получают префикс `ns` (например `ffi::`).
    pub fn to_rust(&self, ns: &str) -> String {
        match self {
            Self::Void => "()".to_string(),
            Self::Primitive(p) => p.rust_name().to_string(),
            Self::Named(n) => format!("{}{}", ns, rust_ident(n)),
            Self::Pointer { pointee, is_const } => {
                let target = match pointee.as_ref() {
                    Self::Void => "core::ffi::c_void".to_string(),
                    other => other.to_rust(ns),
                };
                if *is_const {
                    format!("*const {}", target)
                } else {
                    format!("*mut {}", target)
                }
            }
        }
    }
}

impl fmt::Display for ForeignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Primitive(p) => write!(f, "{}", p.c_name()),
            Self::Named(n) => write!(f, "{}", n),
            Self::Pointer { pointee, is_const } => match (is_const, pointee.as_ref()) {
                (true, Self::Pointer { .. }) => write!(f, "{} const*", pointee),
                (true, _) => write!(f, "const {}*", pointee),
                (false, _) => write!(f, "{}*", pointee),
            },
        }
    }
}

/// Параметр внешней функции.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ty: ForeignType,
}

impl Param {
    pub fn new(ty: ForeignType) -> Self {
        Self { name: None, ty }
    }

    pub fn named(name: impl Into<String>, ty: ForeignType) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_c_spelling() {
        assert_eq!(ForeignType::handle("Counter").to_string(), "Counter*");
        assert_eq!(ForeignType::const_handle("Counter").to_string(), "const Counter*");
        let argv = ForeignType::Pointer {
            pointee: Box::new(ForeignType::Pointer {
                pointee: Box::new(ForeignType::Primitive(Primitive::Char)),
                is_const: true,
            }),
            is_const: false,
        };
        assert_eq!(argv.to_string(), "const char**");
    }

    #[test]
    fn test_rust_spelling() {
        assert_eq!(
            ForeignType::handle("Counter").to_rust("ffi::"),
            "*mut ffi::Counter"
        );
        assert_eq!(
            ForeignType::Pointer {
                pointee: Box::new(ForeignType::Void),
                is_const: true
            }
            .to_rust(""),
            "*const core::ffi::c_void"
        );
        assert_eq!(
            ForeignType::Primitive(Primitive::Int).to_rust("ffi::"),
            "core::ffi::c_int"
        );
    }

    #[test]
    fn test_handle_matching_ignores_constness() {
        assert!(ForeignType::handle("SList").is_handle_of("SList"));
        assert!(ForeignType::const_handle("SList").is_handle_of("SList"));
        assert!(!ForeignType::handle("DList").is_handle_of("SList"));
        assert!(!ForeignType::Primitive(Primitive::Int).is_handle_of("SList"));
        assert!(ForeignType::const_handle("Self").mentions("Self"));
    }

    #[test]
    fn test_layout() {
        assert_eq!(Primitive::Int.layout(), (4, 4));
        assert_eq!(ForeignType::handle("X").layout(), Some((8, 8)));
        assert_eq!(ForeignType::Named("X".into()).layout(), None);
    }
}
