//! Loading options from files and strings.

use std::path::Path;

use crate::{CompilerOptions, Error, Result, SourceContext, validate::validate_options};

/// Parse a packhook.toml file, resolving paths against its directory.
pub fn parse_file(path: impl AsRef<Path>) -> Result<CompilerOptions> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Box::new(Error::Io {
            path: path.to_path_buf(),
            source: e,
        })
    })?;
    let options = parse_str_with_filename(&content, &path.display().to_string())?;
    let base = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    Ok(options.normalize(&base))
}

/// Parse options from a string (uses "packhook.toml" as default filename).
///
/// Paths are left relative; call [`CompilerOptions::normalize`] to resolve them.
pub fn parse_str(content: &str) -> Result<CompilerOptions> {
    parse_str_with_filename(content, "packhook.toml")
}

/// Parse options from a string with a custom filename for error reporting.
pub fn parse_str_with_filename(content: &str, filename: &str) -> Result<CompilerOptions> {
    let ctx = SourceContext::new(content, filename);
    let options: CompilerOptions = toml::from_str(content).map_err(|e| ctx.parse_error(e))?;
    validate_options(&options, &ctx)?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::Mode;

    #[test]
    fn test_parse_full_config() {
        let options = parse_str(
            r#"
            name = "shop"
            mode = "development"

            [entry]
            main = "./src/index.js"
            admin = ["./src/admin.js"]

            [output]
            path = "build"
            filename = "[name].bundle.js"

            [resolve]
            extensions = [".mjs", ".js"]
            alias = { "@" = "./src" }

            [watch]
            aggregate_timeout = 50
        "#,
        )
        .unwrap();
        assert_eq!(options.name.as_deref(), Some("shop"));
        assert_eq!(options.mode, Mode::Development);
        assert_eq!(options.entry.len(), 2);
        assert_eq!(options.output.path, PathBuf::from("build"));
        assert_eq!(options.resolve.alias["@"], "./src");
        assert_eq!(options.watch.aggregate_timeout, 50);
        assert_eq!(options.watch.ignored.len(), 2);
    }

    #[test]
    fn test_entries_keep_declaration_order() {
        let options = parse_str(
            r#"
            [entry]
            zeta = "./src/zeta.js"
            main = "./src/index.js"
            alpha = "./src/alpha.js"
        "#,
        )
        .unwrap();
        assert_eq!(
            options.entry.keys().collect::<Vec<_>>(),
            vec!["zeta", "main", "alpha"]
        );
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let options = parse_str("").unwrap();
        assert!(options.entry.is_empty());
        assert_eq!(options.output.filename, "[name].js");
    }

    #[test]
    fn test_parse_error_has_span() {
        let err = parse_str("mode = 3").unwrap_err();
        match *err {
            Error::Parse { span, .. } => assert!(span.is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse_str("entries = {}").is_err());
    }

    #[test]
    fn test_parse_file_normalizes_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packhook.toml");
        std::fs::write(&path, "[entry]\nmain = \"./src/main.js\"\n").unwrap();
        let options = parse_file(&path).unwrap();
        assert_eq!(options.context, dir.path());
        assert_eq!(options.output.path, dir.path().join("dist"));
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/definitely/not/here/packhook.toml").unwrap_err();
        assert!(matches!(*err, Error::Io { .. }));
    }
}
