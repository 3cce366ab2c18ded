use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{EntryDescription, WatchOptions};

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
    None,
}

/// Options for one compiler.
///
/// Immutable for the duration of a run. Paths are relative to the config
/// file until [`CompilerOptions::normalize`] makes them absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    pub name: Option<String>,
    pub context: PathBuf,
    pub mode: Mode,
    /// Trace every hook dispatch.
    pub profile: bool,
    pub entry: IndexMap<String, EntryDescription>,
    /// Modules built and emitted without becoming entrypoints.
    pub includes: IndexMap<String, EntryDescription>,
    pub output: OutputOptions,
    pub resolve: ResolveOptions,
    pub watch: WatchOptions,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            name: None,
            context: PathBuf::from("."),
            mode: Mode::default(),
            profile: false,
            entry: IndexMap::new(),
            includes: IndexMap::new(),
            output: OutputOptions::default(),
            resolve: ResolveOptions::default(),
            watch: WatchOptions::default(),
        }
    }
}

impl CompilerOptions {
    /// Resolve relative paths against `base` and fill in derived defaults.
    pub fn normalize(mut self, base: &Path) -> Self {
        if self.context.is_relative() {
            self.context = clean_join(base, &self.context);
        }
        if self.output.path.is_relative() {
            self.output.path = clean_join(&self.context, &self.output.path);
        }
        if self.entry.is_empty() {
            self.entry
                .insert("main".to_string(), EntryDescription::new("./src/index.js"));
        }
        if self.output.unique_name.is_empty() {
            self.output.unique_name = self
                .name
                .clone()
                .unwrap_or_else(|| "packhook".to_string());
        }
        self
    }

    /// A copy of these options with `overrides` applied to the output section.
    pub fn with_output_overrides(&self, overrides: &OutputOverrides) -> Self {
        let mut options = self.clone();
        overrides.apply(&mut options.output);
        options
    }

    /// Move the entry named `name` into `includes`.
    ///
    /// Returns whether an entry was moved.
    pub fn hoist_entry(&mut self, name: &str) -> bool {
        match self.entry.shift_remove(name) {
            Some(entry) => {
                self.includes.insert(name.to_string(), entry);
                true
            }
            None => false,
        }
    }
}

fn clean_join(base: &Path, path: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                joined.pop();
            }
            other => joined.push(other),
        }
    }
    joined
}

/// Where and how emitted assets are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputOptions {
    pub path: PathBuf,
    /// Asset filename template. `[name]` and `[id]` are replaced per chunk.
    pub filename: String,
    pub public_path: String,
    /// Unique name of this build, used to namespace runtime globals.
    pub unique_name: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dist"),
            filename: "[name].js".to_string(),
            public_path: "auto".to_string(),
            unique_name: String::new(),
        }
    }
}

impl OutputOptions {
    /// Render a filename template for a chunk.
    pub fn render_filename(template: &str, name: &str, id: &str) -> String {
        template.replace("[name]", name).replace("[id]", id)
    }

    /// Whether `template` yields a distinct filename per chunk.
    pub fn is_templated(template: &str) -> bool {
        template.contains("[name]") || template.contains("[id]")
    }
}

/// Output options a child compiler overrides on top of its parent's.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOverrides {
    pub path: Option<PathBuf>,
    pub filename: Option<String>,
    pub public_path: Option<String>,
    pub unique_name: Option<String>,
}

impl OutputOverrides {
    pub fn apply(&self, output: &mut OutputOptions) {
        if let Some(path) = &self.path {
            output.path = path.clone();
        }
        if let Some(filename) = &self.filename {
            output.filename = filename.clone();
        }
        if let Some(public_path) = &self.public_path {
            output.public_path = public_path.clone();
        }
        if let Some(unique_name) = &self.unique_name {
            output.unique_name = unique_name.clone();
        }
    }
}

/// How requests are resolved to files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveOptions {
    /// Extensions tried, in order, for requests without one.
    pub extensions: Vec<String>,
    /// Request prefixes replaced before resolving.
    pub alias: IndexMap<String, String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".json".to_string()],
            alias: IndexMap::new(),
        }
    }
}
