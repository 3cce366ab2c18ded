//! The compiler: owns the build core and runs builds.

mod child;
mod hooks;

use std::{
    collections::BTreeSet,
    path::PathBuf,
    sync::{Arc, OnceLock, Weak},
    time::SystemTime,
};

pub use child::{CHILD_EXCLUDED_HOOKS, ChildCompilerOptions, ChildRunOutput};
pub use hooks::CompilerHooks;
use packhook_config::{CompilerOptions, WatchOptions};
use packhook_core::{DiskFileSystem, InputFileSystem, OutputFileSystem};
use packhook_hooks::HookResult;
use parking_lot::Mutex;

use crate::{
    Cache, CacheFacade, CompilationParams, CompilerError, CoreContext, Logger, NativeBridge,
    NativeCompilation, NativeCore, NativeCoreFactory, PROTOCOL_VERSION, Plugin, ResolverFactory,
    RunMode, RunScheduler, Stats, Watching, compilation::Compilation, logging::forward_to_tracing,
};

/// State shared between a compiler and its children.
struct Shared {
    cache: Arc<Cache>,
    resolver_factory: Arc<ResolverFactory>,
    input_fs: Option<Arc<dyn InputFileSystem>>,
    output_fs: Option<Arc<dyn OutputFileSystem>>,
    core_factory: Arc<dyn NativeCoreFactory>,
}

#[derive(Default)]
struct CompilerState {
    compilation: Option<Arc<Compilation>>,
    params: Option<CompilationParams>,
    built_once: bool,
    modified: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
    watching: Option<Weak<Watching>>,
}

/// Drives builds on a native build core and exposes the hooks plugins tap.
///
/// A compiler runs one build at a time. Each build creates a fresh
/// [`Compilation`]; the build core reports its progress through the
/// compiler's [`NativeBridge`].
pub struct Compiler {
    pub hooks: CompilerHooks,
    options: Arc<CompilerOptions>,
    compiler_path: String,
    root: Option<Arc<Compiler>>,
    parent_compilation: Option<Weak<Compilation>>,
    shared: Shared,
    core: OnceLock<Arc<dyn NativeCore>>,
    bridge: Arc<NativeBridge>,
    scheduler: RunScheduler,
    state: Mutex<CompilerState>,
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("name", &self.options.name)
            .field("compiler_path", &self.compiler_path)
            .finish_non_exhaustive()
    }
}

/// Builds a root [`Compiler`].
pub struct CompilerBuilder {
    options: CompilerOptions,
    core: Arc<dyn NativeCoreFactory>,
    plugins: Vec<Arc<dyn Plugin>>,
    input_fs: Option<Arc<dyn InputFileSystem>>,
    output_fs: Option<Arc<dyn OutputFileSystem>>,
}

impl CompilerBuilder {
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Read sources from `fs` instead of the disk.
    pub fn input_fs(mut self, fs: Arc<dyn InputFileSystem>) -> Self {
        self.input_fs = Some(fs);
        self
    }

    /// Write assets to `fs` instead of the disk.
    pub fn output_fs(mut self, fs: Arc<dyn OutputFileSystem>) -> Self {
        self.output_fs = Some(fs);
        self
    }

    /// Create the compiler and apply its plugins.
    ///
    /// The build core is started lazily by the first build.
    ///
    /// # Errors
    ///
    /// Fails when a plugin or a setup hook listener fails.
    pub fn build(self) -> Result<Arc<Compiler>, CompilerError> {
        let options = Arc::new(self.options);
        let shared = Shared {
            cache: Arc::new(Cache::new()),
            resolver_factory: Arc::new(ResolverFactory::new(options.resolve.clone())),
            input_fs: Some(self.input_fs.unwrap_or_else(|| Arc::new(DiskFileSystem))),
            output_fs: Some(self.output_fs.unwrap_or_else(|| Arc::new(DiskFileSystem))),
            core_factory: self.core,
        };
        let compiler = Compiler::assemble(options, String::new(), None, None, shared);

        compiler.apply_plugins(&self.plugins)?;
        compiler.hooks.environment.call(())?;
        compiler.hooks.after_environment.call(())?;
        compiler.hooks.after_plugins.call(compiler.clone())?;
        compiler.hooks.after_resolvers.call(compiler.clone())?;
        compiler.hooks.initialize.call(())?;
        Ok(compiler)
    }
}

impl Compiler {
    pub fn builder(options: CompilerOptions, core: Arc<dyn NativeCoreFactory>) -> CompilerBuilder {
        CompilerBuilder {
            options,
            core,
            plugins: Vec::new(),
            input_fs: None,
            output_fs: None,
        }
    }

    fn assemble(
        options: Arc<CompilerOptions>,
        compiler_path: String,
        root: Option<Arc<Compiler>>,
        parent_compilation: Option<Weak<Compilation>>,
        shared: Shared,
    ) -> Arc<Compiler> {
        let profile = options.profile;
        let compiler = Arc::new_cyclic(|weak| Compiler {
            hooks: CompilerHooks::new(),
            options,
            compiler_path,
            root,
            parent_compilation,
            shared,
            core: OnceLock::new(),
            bridge: Arc::new(NativeBridge::new(weak.clone())),
            scheduler: RunScheduler::new(),
            state: Mutex::new(CompilerState::default()),
        });
        if profile {
            compiler.hooks.registry().trace_all();
        }
        compiler
    }

    fn apply_plugins(self: &Arc<Self>, plugins: &[Arc<dyn Plugin>]) -> Result<(), CompilerError> {
        for plugin in plugins {
            tracing::debug!(plugin = plugin.name(), compiler = %self.compiler_path, "applying plugin");
            plugin
                .apply(self)
                .map_err(|report| CompilerError::plugin(plugin.name(), report))?;
        }
        Ok(())
    }

    pub fn options(&self) -> &Arc<CompilerOptions> {
        &self.options
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    /// Identifies this compiler among its parent's children, e.g.
    /// `html|0|css|1|`. Empty for a root compiler.
    pub fn compiler_path(&self) -> &str {
        &self.compiler_path
    }

    pub fn is_child(&self) -> bool {
        self.parent_compilation.is_some()
    }

    /// The top-level compiler of this compiler's family.
    pub fn root(self: &Arc<Self>) -> Arc<Compiler> {
        self.root.clone().unwrap_or_else(|| self.clone())
    }

    /// The compilation that created this child compiler, while it is alive.
    pub fn parent_compilation(&self) -> Option<Arc<Compilation>> {
        self.parent_compilation.as_ref().and_then(Weak::upgrade)
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.shared.cache
    }

    /// A cache facade namespaced by this compiler's path and `name`.
    pub fn get_cache(&self, name: &str) -> CacheFacade {
        CacheFacade::new(
            self.shared.cache.clone(),
            format!("{}{}", self.compiler_path, name),
        )
    }

    pub fn resolver_factory(&self) -> &Arc<ResolverFactory> {
        &self.shared.resolver_factory
    }

    pub fn input_fs(&self) -> Option<&Arc<dyn InputFileSystem>> {
        self.shared.input_fs.as_ref()
    }

    /// `None` for child compilers.
    pub fn output_fs(&self) -> Option<&Arc<dyn OutputFileSystem>> {
        self.shared.output_fs.as_ref()
    }

    pub fn bridge(&self) -> &Arc<NativeBridge> {
        &self.bridge
    }

    pub fn scheduler(&self) -> &RunScheduler {
        &self.scheduler
    }

    pub fn running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn watch_mode(&self) -> bool {
        self.scheduler.is_watch_mode()
    }

    /// The compilation of the build in progress, or of the last build.
    pub fn current_compilation(&self) -> Option<Arc<Compilation>> {
        self.state.lock().compilation.clone()
    }

    pub fn compilation_params(&self) -> Option<CompilationParams> {
        self.state.lock().params.clone()
    }

    pub(crate) fn core(&self) -> Option<Arc<dyn NativeCore>> {
        self.core.get().cloned()
    }

    /// Make fresh module factories and announce them to listeners.
    pub fn new_compilation_params(&self) -> HookResult<CompilationParams> {
        let params = CompilationParams::new();
        self.hooks
            .normal_module_factory
            .call(params.normal_module_factory.clone())?;
        self.hooks
            .context_module_factory
            .call(params.context_module_factory.clone())?;
        Ok(params)
    }

    pub(crate) fn new_compilation(
        self: &Arc<Self>,
        native: Arc<dyn NativeCompilation>,
    ) -> (Arc<Compilation>, CompilationParams) {
        let mut state = self.state.lock();
        let params = state.params.get_or_insert_with(CompilationParams::new).clone();
        let compilation = Arc::new(Compilation::new(self, params.clone(), native));
        state.compilation = Some(compilation.clone());
        (compilation, params)
    }

    pub(crate) fn set_file_changes(
        &self,
        modified: impl IntoIterator<Item = PathBuf>,
        removed: impl IntoIterator<Item = PathBuf>,
    ) {
        let mut state = self.state.lock();
        state.modified.extend(modified);
        state.removed.extend(removed);
    }

    /// Start the build core on first use.
    fn ensure_core(&self) -> Result<Arc<dyn NativeCore>, CompilerError> {
        if let Some(core) = self.core.get() {
            return Ok(core.clone());
        }
        let found = self.shared.core_factory.version();
        if !PROTOCOL_VERSION.is_compatible_with(&found) {
            return Err(CompilerError::IncompatibleCore {
                expected: PROTOCOL_VERSION,
                found,
            });
        }
        let context = CoreContext {
            options: self.options.clone(),
            callbacks: self.bridge.clone(),
            resolver_factory: self.shared.resolver_factory.clone(),
            input_fs: self.shared.input_fs.clone(),
            output_fs: self.shared.output_fs.clone(),
        };
        let core = self
            .shared
            .core_factory
            .create(context)
            .map_err(CompilerError::CoreStart)?;
        let core = self.core.get_or_init(|| core).clone();
        tracing::debug!(version = %found, compiler = %self.compiler_path, "build core started");
        self.bridge.refresh_disabled_hooks();
        Ok(core)
    }

    /// Run one compilation on the build core.
    ///
    /// The first call builds from scratch; later calls rebuild with the
    /// files changed since. A build core failure is recorded on the
    /// compilation rather than returned.
    ///
    /// # Errors
    ///
    /// Fails when a compile hook listener fails, the core cannot be started
    /// or the core did not create a compilation.
    pub async fn compile(self: &Arc<Self>) -> Result<Arc<Compilation>, CompilerError> {
        let params = self.new_compilation_params()?;
        self.hooks.before_compile.call_async(params.clone()).await?;
        self.hooks.compile.call(params.clone())?;

        let (first, modified, removed) = {
            let mut state = self.state.lock();
            state.compilation = None;
            state.params = Some(params);
            let modified: Vec<PathBuf> = std::mem::take(&mut state.modified).into_iter().collect();
            let removed: Vec<PathBuf> = std::mem::take(&mut state.removed).into_iter().collect();
            (!state.built_once, modified, removed)
        };

        let core = self.ensure_core()?;
        self.bridge.pipeline().begin();
        self.bridge.refresh_disabled_hooks();
        let outcome = if first {
            core.build().await
        } else {
            tracing::debug!(modified = modified.len(), removed = removed.len(), "rebuilding");
            core.rebuild(modified, removed).await
        };

        let Some(compilation) = self.current_compilation() else {
            self.bridge.pipeline().fail();
            return Err(match outcome {
                Err(err) => err.into(),
                Ok(()) => CompilerError::MissingCompilation,
            });
        };
        self.state.lock().built_once = true;
        compilation.set_end_time(SystemTime::now());

        match outcome {
            Ok(()) => self.bridge.pipeline().finish(),
            Err(err) => {
                self.bridge.pipeline().fail();
                tracing::debug!(error = %err, "build failed");
                compilation.push_error("BuildError", &err);
            }
        }

        if let Err(err) = self.hooks.after_compile.call_async(compilation.clone()).await {
            compilation.push_error("HookError", &err);
            return Err(err.into());
        }
        Ok(compilation)
    }

    /// Compile until no additional pass is requested, firing `done` after
    /// each compilation.
    pub(crate) async fn build_cycle(self: &Arc<Self>) -> Result<Stats, CompilerError> {
        loop {
            let compilation = self.compile().await?;
            let stats = Stats::new(compilation.clone());

            let additional_pass = match compilation.need_additional_pass() {
                Ok(additional_pass) => additional_pass,
                Err(err) => {
                    compilation.push_error("HookError", &err);
                    return Err(err.into());
                }
            };
            if let Err(err) = self.hooks.done.call_async(stats.clone()).await {
                compilation.push_error("HookError", &err);
                return Err(err.into());
            }
            if !additional_pass {
                return Ok(stats);
            }
            tracing::debug!(compiler = %self.compiler_path, "running additional pass");
            self.hooks.additional_pass.call_async(()).await?;
        }
    }

    /// Run a single build.
    ///
    /// A build that fails inside the build core still resolves to [`Stats`]
    /// with errors; only failures of the compiler machinery are returned as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`CompilerError::ConcurrentCompilation`] when a build or watch
    /// session is already active, or the first hook listener failure.
    pub async fn run(self: &Arc<Self>) -> Result<Stats, CompilerError> {
        self.scheduler.begin(RunMode::Run)?;
        let result = self.run_build().await;
        self.finish_run(result)
    }

    async fn run_build(self: &Arc<Self>) -> Result<Stats, CompilerError> {
        self.scheduler.leave_idle(self.cache()).await?;
        self.hooks.before_run.call_async(self.clone()).await?;
        self.hooks.run.call_async(self.clone()).await?;
        self.build_cycle().await
    }

    fn finish_run(&self, result: Result<Stats, CompilerError>) -> Result<Stats, CompilerError> {
        self.go_idle();
        self.scheduler.finish();
        self.report_result(result)
    }

    pub(crate) fn go_idle(&self) {
        if let Err(err) = self.scheduler.enter_idle(self.cache()) {
            tracing::warn!(error = %err, "cache failed to go idle");
        }
    }

    /// Fire `afterDone` for a finished build or `failed` for a broken one.
    pub(crate) fn report_result(
        &self,
        result: Result<Stats, CompilerError>,
    ) -> Result<Stats, CompilerError> {
        match &result {
            Ok(stats) => {
                if let Err(err) = self.hooks.after_done.call(stats.clone()) {
                    tracing::warn!(error = %err, "afterDone listener failed");
                }
            }
            Err(err) => {
                if let Err(hook_err) = self.hooks.failed.call(err.to_string()) {
                    tracing::warn!(error = %hook_err, "failed listener failed");
                }
            }
        }
        result
    }

    /// Start a watch session.
    ///
    /// # Errors
    ///
    /// Returns [`CompilerError::ConcurrentCompilation`] when a build or watch
    /// session is already active, or [`CompilerError::IgnoredPattern`] when
    /// an ignored path pattern does not compile.
    pub fn watch(self: &Arc<Self>, options: WatchOptions) -> Result<Arc<Watching>, CompilerError> {
        let ignored = options
            .ignored_paths()
            .map_err(CompilerError::IgnoredPattern)?;
        self.scheduler.begin(RunMode::Watch)?;
        let watching = Arc::new(Watching::new(self.clone(), options, ignored));
        self.state.lock().watching = Some(Arc::downgrade(&watching));
        Ok(watching)
    }

    /// Stop watching, run the shutdown listeners and reject further builds.
    pub async fn close(&self) -> Result<(), CompilerError> {
        let watching = self.state.lock().watching.take().and_then(|w| w.upgrade());
        if let Some(watching) = watching {
            watching.close()?;
        }
        if self.scheduler.is_closed() {
            return Ok(());
        }
        self.scheduler.close();
        self.hooks.shutdown.call_async(()).await?;
        if !self.is_child() {
            self.shared.cache.shutdown().await?;
        }
        Ok(())
    }

    /// A logger for infrastructure messages.
    ///
    /// Entries go to `infrastructureLog` listeners first; unclaimed ones are
    /// written through `tracing`.
    pub fn get_infrastructure_logger(&self, name: &str) -> Logger {
        let hook = self.hooks.infrastructure_log.clone();
        Logger::new(name, move |name, entry| {
            match hook.call((name.to_string(), entry.kind, entry.args.clone())) {
                Ok(Some(_)) => {}
                Ok(None) => forward_to_tracing(name, &entry),
                Err(err) => {
                    tracing::warn!(logger = name, error = %err, "infrastructureLog listener failed")
                }
            }
        })
    }
}
