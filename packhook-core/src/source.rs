//! Asset sources and metadata.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable asset content.
///
/// Cloning a `Source` shares the underlying buffer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Source {
    content: Arc<[u8]>,
}

impl Source {
    /// Create a source from raw bytes.
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: Arc::from(content.into()),
        }
    }

    /// The raw bytes of this source.
    pub fn buffer(&self) -> &[u8] {
        &self.content
    }

    /// The content as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<Vec<u8>> for Source {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").field("size", &self.size()).finish()
    }
}

/// Metadata attached to an emitted asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetInfo {
    /// The asset only contains immutable content (e.g. a content hash in its name).
    pub immutable: bool,
    /// The asset has been minimized.
    pub minimized: bool,
    /// The asset is only used during development and not part of the bundle.
    pub development: bool,
    /// The asset is an update for hot module replacement.
    pub hot_module_replacement: bool,
    /// Content hashes embedded in the filename.
    pub content_hash: Vec<String>,
    /// The file this asset was copied or derived from.
    pub source_filename: Option<String>,
    /// Related assets, keyed by relation (e.g. `sourceMap`).
    pub related: IndexMap<String, Vec<String>>,
    /// Plugin-specific metadata.
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl AssetInfo {
    /// Merge `other` on top of `self`, the way an asset update does.
    pub fn merge(mut self, other: AssetInfo) -> Self {
        self.immutable |= other.immutable;
        self.minimized |= other.minimized;
        self.development |= other.development;
        self.hot_module_replacement |= other.hot_module_replacement;
        for hash in other.content_hash {
            if !self.content_hash.contains(&hash) {
                self.content_hash.push(hash);
            }
        }
        if other.source_filename.is_some() {
            self.source_filename = other.source_filename;
        }
        self.related.extend(other.related);
        self.extras.extend(other.extras);
        self
    }
}

/// A named output file in a compilation.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub source: Source,
    pub info: AssetInfo,
}

impl Asset {
    pub fn new(name: impl Into<String>, source: impl Into<Source>, info: AssetInfo) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            info,
        }
    }
}

/// Errors returned by asset mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("Conflict: Multiple assets emit different content to the same filename {name}")]
    Conflict { name: String },

    #[error("Called Compilation.updateAsset for not existing filename {name}")]
    NotFound { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_shares_buffer() {
        let a = Source::from("console.log(1)");
        let b = a.clone();
        assert_eq!(a.buffer().as_ptr(), b.buffer().as_ptr());
        assert_eq!(b.size(), 14);
        assert_eq!(b.text(), "console.log(1)");
    }

    #[test]
    fn test_asset_info_defaults() {
        let info = AssetInfo::default();
        assert!(!info.minimized);
        assert!(!info.development);
        assert!(!info.hot_module_replacement);
        assert!(info.related.is_empty());
    }

    #[test]
    fn test_asset_info_merge() {
        let base = AssetInfo {
            content_hash: vec!["abc".into()],
            ..Default::default()
        };
        let merged = base.merge(AssetInfo {
            minimized: true,
            content_hash: vec!["abc".into(), "def".into()],
            ..Default::default()
        });
        assert!(merged.minimized);
        assert_eq!(merged.content_hash, vec!["abc", "def"]);
    }

    #[test]
    fn test_asset_info_serializes_camel_case() {
        let info = AssetInfo {
            hot_module_replacement: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["hotModuleReplacement"], serde_json::Value::Bool(true));
    }
}
