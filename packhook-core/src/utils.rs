//! String helpers for hook and callback names.

/// Convert a string to PascalCase (e.g., "optimize_inline" -> "OptimizeInline")
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            }
        })
        .collect()
}

/// Convert a string to camelCase (e.g., "after_emit" -> "afterEmit")
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_lowercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("optimize"), "Optimize");
        assert_eq!(to_pascal_case("OPTIMIZE_INLINE"), "OptimizeInline");
        assert_eq!(to_pascal_case("pre_process"), "PreProcess");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("after_emit"), "afterEmit");
        assert_eq!(to_camel_case("this_compilation"), "thisCompilation");
        assert_eq!(to_camel_case("make"), "make");
        assert_eq!(to_camel_case(""), "");
    }
}
