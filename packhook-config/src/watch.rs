use std::{path::Path, time::Duration};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// Options for watch mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchOptions {
    /// Delay in milliseconds before rebuilding after the first change.
    /// Changes arriving in this window are batched into one rebuild.
    pub aggregate_timeout: u64,
    /// Glob patterns of paths to ignore. A pattern matching a directory
    /// ignores everything below it.
    pub ignored: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            aggregate_timeout: 5,
            ignored: vec!["**/.git".to_string(), "**/node_modules".to_string()],
        }
    }
}

impl WatchOptions {
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout)
    }

    /// Compile the `ignored` patterns.
    ///
    /// # Errors
    ///
    /// Fails on the first pattern that is not a valid glob.
    pub fn ignored_paths(&self) -> Result<IgnoredPaths, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignored {
            builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
        }
        Ok(IgnoredPaths {
            set: builder.build()?,
        })
    }
}

/// Compiled `watch.ignored` patterns.
#[derive(Debug, Clone)]
pub struct IgnoredPaths {
    set: GlobSet,
}

impl IgnoredPaths {
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.ancestors().any(|ancestor| self.set.is_match(ancestor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WatchOptions::default();
        assert_eq!(options.aggregate_timeout(), Duration::from_millis(5));
        let ignored = options.ignored_paths().unwrap();
        assert!(ignored.is_ignored(Path::new("/app/node_modules/react/index.js")));
        assert!(ignored.is_ignored(Path::new("/app/.git/HEAD")));
        assert!(!ignored.is_ignored(Path::new("/app/src/index.js")));
        assert!(!ignored.is_ignored(Path::new("/app/src/node_modules.js")));
    }

    #[test]
    fn test_directory_pattern_covers_descendants() {
        let options = WatchOptions {
            ignored: vec!["/app/generated".to_string()],
            ..Default::default()
        };
        let ignored = options.ignored_paths().unwrap();
        assert!(ignored.is_ignored(Path::new("/app/generated/api.js")));
        assert!(!ignored.is_ignored(Path::new("/app/src/api.js")));
    }

    #[test]
    fn test_star_stays_within_a_directory() {
        let options = WatchOptions {
            ignored: vec!["/app/src/*.tmp".to_string()],
            ..Default::default()
        };
        let ignored = options.ignored_paths().unwrap();
        assert!(ignored.is_ignored(Path::new("/app/src/a.tmp")));
        assert!(!ignored.is_ignored(Path::new("/app/src/nested/a.tmp")));
    }

    #[test]
    fn test_invalid_pattern() {
        let options = WatchOptions {
            ignored: vec!["src/[".to_string()],
            ..Default::default()
        };
        assert!(options.ignored_paths().is_err());
    }
}
