use serde::{Deserialize, Serialize};

/// The modules loaded by one entry, in order.
///
/// In TOML an entry may be a single request, a list of requests or a table:
///
/// ```toml
/// [entry]
/// main = "./src/index.js"
/// polyfilled = ["./src/polyfills.js", "./src/app.js"]
/// worker = { import = ["./src/worker.js"], filename = "worker.js" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntry")]
pub struct EntryDescription {
    pub import: Vec<String>,
    /// Overrides `output.filename` for this entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl EntryDescription {
    pub fn new(import: impl Into<String>) -> Self {
        Self {
            import: vec![import.into()],
            filename: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Single(String),
    Many(Vec<String>),
    Table {
        import: Vec<String>,
        #[serde(default)]
        filename: Option<String>,
    },
}

impl From<RawEntry> for EntryDescription {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Single(import) => Self::new(import),
            RawEntry::Many(import) => Self {
                import,
                filename: None,
            },
            RawEntry::Table { import, filename } => Self { import, filename },
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    #[test]
    fn test_entry_shapes() {
        let entries: IndexMap<String, EntryDescription> = toml::from_str(
            r#"
            main = "./src/index.js"
            both = ["./a.js", "./b.js"]
            worker = { import = ["./w.js"], filename = "worker.js" }
        "#,
        )
        .unwrap();
        assert_eq!(entries["main"].import, vec!["./src/index.js"]);
        assert_eq!(entries["both"].import.len(), 2);
        assert_eq!(entries["worker"].filename.as_deref(), Some("worker.js"));
        assert_eq!(
            entries.keys().collect::<Vec<_>>(),
            vec!["main", "both", "worker"]
        );
    }
}
