//! Имена: проверка идентификаторов и их запись в Rust.

/// Ключевые слова Rust, которые можно записать как raw-идентификатор (`r#type`).
const RAW_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Ключевые слова, для которых raw-форма запрещена.
const RESERVED: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Проверить, что строка - идентификатор C (и потенциально Rust).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Проверить, что имя можно использовать в сгенерированном Rust-коде.
pub fn is_rust_usable(name: &str) -> bool {
    is_identifier(name) && !RESERVED.contains(&name)
}

/// Записать имя как идентификатор Rust, экранируя ключевые слова.
pub fn rust_ident(name: &str) -> String {
    if RAW_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// `singly_linked_list` / `SList` -> `SinglyLinkedList` / `SList`.
pub fn upper_camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("counter"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("with-dash"));
        assert!(!is_rust_usable("self"));
        assert!(is_rust_usable("type"));
    }

    #[test]
    fn test_rust_ident_escapes_keywords() {
        assert_eq!(rust_ident("type"), "r#type");
        assert_eq!(rust_ident("add"), "add");
    }

    #[test]
    fn test_upper_camel() {
        assert_eq!(upper_camel("counter"), "Counter");
        assert_eq!(upper_camel("singly_linked_list"), "SinglyLinkedList");
        assert_eq!(upper_camel("SList"), "SList");
        assert_eq!(upper_camel("__weird__name"), "WeirdName");
    }
}
