use std::path::{Component, Path, PathBuf};

use packhook_config::ResolveOptions;
use packhook_core::InputFileSystem;

/// Resolve `request` from `context` to an existing file.
///
/// Aliases are applied first. Relative and absolute requests are looked up
/// as is, then with each extension, then as a directory index. Bare
/// requests are looked up under `{context}/node_modules`.
pub(crate) fn resolve(
    fs: &dyn InputFileSystem,
    context: &Path,
    request: &str,
    options: &ResolveOptions,
) -> Option<PathBuf> {
    let request = apply_alias(request, options);
    let path = Path::new(&request);
    let base = if path.is_absolute() {
        normalize(path)
    } else if request.starts_with('.') {
        normalize(&context.join(path))
    } else {
        normalize(&context.join("node_modules").join(path))
    };

    let mut candidates = vec![base.clone()];
    for extension in &options.extensions {
        candidates.push(with_suffix(&base, extension));
    }
    for extension in &options.extensions {
        candidates.push(with_suffix(&base.join("index"), extension));
    }
    candidates.into_iter().find(|candidate| fs.is_file(candidate))
}

fn apply_alias(request: &str, options: &ResolveOptions) -> String {
    for (alias, target) in &options.alias {
        if request == alias {
            return target.clone();
        }
        if let Some(rest) = request.strip_prefix(alias.as_str()) {
            if rest.starts_with('/') {
                return format!("{target}{rest}");
            }
        }
    }
    request.to_string()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use packhook_core::MemoryFileSystem;

    use super::*;

    fn fs() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        fs.insert("/app/src/index.js", "import './util'");
        fs.insert("/app/src/util.js", "export {}");
        fs.insert("/app/src/lib/index.json", "{}");
        fs.insert("/app/node_modules/left-pad/index.js", "module.exports = 1");
        fs
    }

    #[test]
    fn test_resolves_extensions_and_indexes() {
        let fs = fs();
        let options = ResolveOptions::default();
        let context = Path::new("/app/src");
        assert_eq!(
            resolve(&fs, context, "./util", &options),
            Some(PathBuf::from("/app/src/util.js"))
        );
        assert_eq!(
            resolve(&fs, context, "./lib", &options),
            Some(PathBuf::from("/app/src/lib/index.json"))
        );
        assert_eq!(
            resolve(&fs, Path::new("/app"), "left-pad", &options),
            Some(PathBuf::from("/app/node_modules/left-pad/index.js"))
        );
        assert_eq!(resolve(&fs, context, "./missing", &options), None);
    }

    #[test]
    fn test_alias_prefix() {
        let fs = fs();
        let mut options = ResolveOptions::default();
        options
            .alias
            .insert("@".to_string(), "/app/src".to_string());
        assert_eq!(
            resolve(&fs, Path::new("/elsewhere"), "@/util", &options),
            Some(PathBuf::from("/app/src/util.js"))
        );
        assert_eq!(
            resolve(&fs, Path::new("/app/src"), "@scope/pkg", &options),
            None
        );
    }
}
