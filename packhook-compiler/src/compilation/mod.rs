//! A single build: its assets, modules, chunks and diagnostics.

mod assets;
mod hooks;
mod module;

use std::{
    collections::HashMap,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

pub use assets::Assets;
pub use hooks::CompilationHooks;
use indexmap::IndexMap;
pub use module::{Chunk, Entrypoint, Module};
use packhook_config::CompilerOptions;
use packhook_core::{Asset, AssetError, AssetInfo, Diagnostic, Source};
use packhook_hooks::HookResult;
use parking_lot::Mutex;

use crate::{
    ChildCompilerOptions, CompilationParams, Compiler, CompilerError, LogEntry, Logger,
    NativeCompilation,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// One build of a [`Compiler`].
///
/// Created when the build core reports `thisCompilation`. It wraps the
/// core's compilation handle and is replaced by the next build.
pub struct Compilation {
    pub hooks: CompilationHooks,
    id: u64,
    name: Option<String>,
    compiler_path: String,
    options: Arc<CompilerOptions>,
    compiler: Weak<Compiler>,
    params: CompilationParams,
    native: Arc<dyn NativeCompilation>,
    start_time: SystemTime,
    end_time: Mutex<Option<SystemTime>>,
    children: Mutex<Vec<Arc<Compilation>>>,
    child_counters: Mutex<HashMap<String, usize>>,
    logging: Mutex<IndexMap<String, Vec<LogEntry>>>,
}

impl std::fmt::Debug for Compilation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compilation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("compiler_path", &self.compiler_path)
            .finish_non_exhaustive()
    }
}

impl Compilation {
    pub(crate) fn new(
        compiler: &Arc<Compiler>,
        params: CompilationParams,
        native: Arc<dyn NativeCompilation>,
    ) -> Self {
        Self {
            hooks: CompilationHooks::new(),
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: compiler.name().map(str::to_string),
            compiler_path: compiler.compiler_path().to_string(),
            options: compiler.options().clone(),
            compiler: Arc::downgrade(compiler),
            params,
            native,
            start_time: SystemTime::now(),
            end_time: Mutex::new(None),
            children: Mutex::new(Vec::new()),
            child_counters: Mutex::new(HashMap::new()),
            logging: Mutex::new(IndexMap::new()),
        }
    }

    /// Unique across every compilation in the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn compiler_path(&self) -> &str {
        &self.compiler_path
    }

    pub fn options(&self) -> &Arc<CompilerOptions> {
        &self.options
    }

    pub fn params(&self) -> &CompilationParams {
        &self.params
    }

    /// The compiler that created this compilation, while it is alive.
    pub fn compiler(&self) -> Option<Arc<Compiler>> {
        self.compiler.upgrade()
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    pub fn end_time(&self) -> Option<SystemTime> {
        *self.end_time.lock()
    }

    pub(crate) fn set_end_time(&self, time: SystemTime) {
        *self.end_time.lock() = Some(time);
    }

    pub fn hash(&self) -> Option<String> {
        self.native.hash()
    }

    pub fn assets(&self) -> Assets {
        Assets::new(self.native.clone())
    }

    pub fn get_asset(&self, name: &str) -> Option<Asset> {
        self.native.get_asset(name)
    }

    pub fn get_assets(&self) -> Vec<Asset> {
        self.assets().to_vec()
    }

    pub fn emit_asset(
        &self,
        name: &str,
        source: impl Into<Source>,
        info: AssetInfo,
    ) -> Result<(), AssetError> {
        self.native.emit_asset(Asset::new(name, source, info))
    }

    pub fn update_asset(
        &self,
        name: &str,
        source: impl Into<Source>,
        info: Option<AssetInfo>,
    ) -> Result<(), AssetError> {
        self.native.update_asset(name, source.into(), info)
    }

    pub fn delete_asset(&self, name: &str) -> bool {
        self.native.delete_asset(name)
    }

    pub fn modules(&self) -> Vec<Module> {
        self.native.modules().into_iter().map(Module::from).collect()
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        self.native.chunks().into_iter().map(Chunk::from).collect()
    }

    pub fn entrypoints(&self) -> Vec<Entrypoint> {
        self.native
            .entrypoints()
            .into_iter()
            .map(Entrypoint::from)
            .collect()
    }

    /// Errors as recorded, before `processErrors`.
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.native
            .diagnostics()
            .into_iter()
            .filter(Diagnostic::is_error)
            .collect()
    }

    /// Warnings as recorded, before `processWarnings`.
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.native
            .diagnostics()
            .into_iter()
            .filter(Diagnostic::is_warning)
            .collect()
    }

    /// Errors after every `processErrors` listener ran.
    pub fn get_errors(&self) -> Vec<Diagnostic> {
        let errors = self.errors();
        match self.hooks.process_errors.call_waterfall(errors.clone()) {
            Ok(errors) => errors,
            Err(err) => {
                tracing::warn!(compilation = self.id, error = %err, "processErrors failed");
                errors
            }
        }
    }

    /// Warnings after every `processWarnings` listener ran.
    pub fn get_warnings(&self) -> Vec<Diagnostic> {
        let warnings = self.warnings();
        match self.hooks.process_warnings.call_waterfall(warnings.clone()) {
            Ok(warnings) => warnings,
            Err(err) => {
                tracing::warn!(compilation = self.id, error = %err, "processWarnings failed");
                warnings
            }
        }
    }

    pub fn push_diagnostic(&self, diagnostic: Diagnostic) {
        self.native.push_diagnostic(diagnostic);
    }

    pub(crate) fn push_error(&self, title: &str, err: &dyn std::fmt::Display) {
        self.push_diagnostic(Diagnostic::error(title, err.to_string()));
    }

    pub fn children(&self) -> Vec<Arc<Compilation>> {
        self.children.lock().clone()
    }

    pub(crate) fn push_child(&self, child: Arc<Compilation>) {
        self.children.lock().push(child);
    }

    /// The index for the next child compiler named `name`.
    pub(crate) fn next_child_index(&self, name: &str) -> usize {
        let mut counters = self.child_counters.lock();
        let counter = counters.entry(name.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;
        index
    }

    /// Create a child compiler of this compilation's compiler.
    ///
    /// # Errors
    ///
    /// Fails when the compiler is gone or the child could not be set up.
    pub fn create_child_compiler(
        self: &Arc<Self>,
        options: ChildCompilerOptions,
    ) -> Result<Arc<Compiler>, CompilerError> {
        let compiler = self.compiler().ok_or(CompilerError::Closed)?;
        compiler.create_child_compiler(self, options)
    }

    /// Whether a `needAdditionalPass` listener asked for another build.
    pub fn need_additional_pass(&self) -> HookResult<bool> {
        Ok(self.hooks.need_additional_pass.call(())? == Some(true))
    }

    /// A logger whose entries are recorded on this compilation.
    pub fn get_logger(self: &Arc<Self>, name: &str) -> Logger {
        let compilation = Arc::downgrade(self);
        Logger::new(name, move |name, entry| {
            if let Some(compilation) = compilation.upgrade() {
                compilation.record_log(name, entry);
            }
        })
    }

    fn record_log(&self, name: &str, entry: LogEntry) {
        match self.hooks.log.call((name.to_string(), entry.clone())) {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.logging
                    .lock()
                    .entry(name.to_string())
                    .or_default()
                    .push(entry);
            }
            Err(err) => tracing::warn!(logger = name, error = %err, "log listener failed"),
        }
    }

    /// Entries recorded per logger name.
    pub fn logging(&self) -> IndexMap<String, Vec<LogEntry>> {
        self.logging.lock().clone()
    }
}
