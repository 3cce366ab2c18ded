//! Build results in a serializable shape.

use std::{sync::Arc, time::SystemTime};

use indexmap::IndexMap;
use packhook_core::Diagnostic;
use serde::Serialize;

use crate::{LogEntry, compilation::Compilation};

/// What [`Stats::to_json`] includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsOptions {
    pub hash: bool,
    pub timings: bool,
    pub assets: bool,
    pub chunks: bool,
    pub modules: bool,
    pub entrypoints: bool,
    pub children: bool,
    pub logging: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            hash: true,
            timings: true,
            assets: true,
            chunks: true,
            modules: true,
            entrypoints: true,
            children: true,
            logging: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsAsset {
    pub name: String,
    pub size: usize,
    pub chunk_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsChunk {
    pub id: Option<String>,
    pub names: Vec<String>,
    pub files: Vec<String>,
    pub entry: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsModule {
    pub identifier: String,
    pub name: String,
    pub module_type: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsEntrypoint {
    pub name: String,
    pub chunks: Vec<String>,
    pub assets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCompilation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Build time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<StatsAsset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<StatsChunk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<StatsModule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoints: Option<IndexMap<String, StatsEntrypoint>>,
    pub errors: Vec<Diagnostic>,
    pub errors_count: usize,
    pub warnings: Vec<Diagnostic>,
    pub warnings_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<StatsCompilation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<IndexMap<String, Vec<LogEntry>>>,
}

/// The outcome of a build, handed to `done` and returned by runs.
#[derive(Debug, Clone)]
pub struct Stats {
    compilation: Arc<Compilation>,
}

impl Stats {
    pub fn new(compilation: Arc<Compilation>) -> Self {
        Self { compilation }
    }

    pub fn compilation(&self) -> &Arc<Compilation> {
        &self.compilation
    }

    pub fn start_time(&self) -> SystemTime {
        self.compilation.start_time()
    }

    pub fn end_time(&self) -> Option<SystemTime> {
        self.compilation.end_time()
    }

    /// Whether this compilation or any child compilation has errors.
    pub fn has_errors(&self) -> bool {
        !self.compilation.get_errors().is_empty()
            || self
                .compilation
                .children()
                .into_iter()
                .any(|child| Stats::new(child).has_errors())
    }

    /// Whether this compilation or any child compilation has warnings.
    pub fn has_warnings(&self) -> bool {
        !self.compilation.get_warnings().is_empty()
            || self
                .compilation
                .children()
                .into_iter()
                .any(|child| Stats::new(child).has_warnings())
    }

    pub fn to_json(&self, options: &StatsOptions) -> StatsCompilation {
        let compilation = &self.compilation;
        let chunks = compilation.chunks();
        let entrypoints = compilation.entrypoints();
        let errors = compilation.get_errors();
        let warnings = compilation.get_warnings();

        let time = options.timings.then(|| {
            compilation
                .end_time()
                .and_then(|end| end.duration_since(compilation.start_time()).ok())
                .map(|elapsed| elapsed.as_millis() as u64)
                .unwrap_or_default()
        });

        let assets = options.assets.then(|| {
            let mut assets: Vec<StatsAsset> = compilation
                .get_assets()
                .into_iter()
                .map(|asset| StatsAsset {
                    chunk_names: chunks
                        .iter()
                        .filter(|chunk| chunk.files().contains(&asset.name))
                        .filter_map(|chunk| chunk.name().map(str::to_string))
                        .collect(),
                    size: asset.source.size(),
                    name: asset.name,
                })
                .collect();
            assets.sort_by(|a, b| a.name.cmp(&b.name));
            assets
        });

        let entry_chunk_ids: Vec<&str> = entrypoints
            .iter()
            .flat_map(|e| e.chunks().iter().map(String::as_str))
            .collect();
        let stats_chunks = options.chunks.then(|| {
            chunks
                .iter()
                .map(|chunk| StatsChunk {
                    id: chunk.id().map(str::to_string),
                    names: chunk.name().map(str::to_string).into_iter().collect(),
                    files: chunk.files().to_vec(),
                    entry: chunk.id().is_some_and(|id| entry_chunk_ids.contains(&id)),
                })
                .collect()
        });

        let modules = options.modules.then(|| {
            compilation
                .modules()
                .into_iter()
                .map(|module| StatsModule {
                    identifier: module.identifier().to_string(),
                    name: module.readable_identifier().to_string(),
                    module_type: module.module_type().to_string(),
                    size: module.size(),
                })
                .collect()
        });

        let stats_entrypoints = options.entrypoints.then(|| {
            entrypoints
                .iter()
                .map(|entrypoint| {
                    (
                        entrypoint.name().to_string(),
                        StatsEntrypoint {
                            name: entrypoint.name().to_string(),
                            chunks: entrypoint.chunks().to_vec(),
                            assets: entrypoint.files().to_vec(),
                        },
                    )
                })
                .collect()
        });

        let children = options.children.then(|| {
            compilation
                .children()
                .into_iter()
                .map(|child| Stats::new(child).to_json(options))
                .collect()
        });

        StatsCompilation {
            name: compilation.name().map(str::to_string),
            hash: if options.hash { compilation.hash() } else { None },
            time,
            assets,
            chunks: stats_chunks,
            modules,
            entrypoints: stats_entrypoints,
            errors_count: errors.len(),
            errors,
            warnings_count: warnings.len(),
            warnings,
            children,
            logging: options.logging.then(|| compilation.logging()),
        }
    }
}
