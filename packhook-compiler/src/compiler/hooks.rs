use std::{path::PathBuf, sync::Arc, time::SystemTime};

use packhook_hooks::{Hook, HookRegistry};

use crate::{
    AssetEmittedInfo, CompilationParams, Compiler, ContextModuleFactory, LogType,
    NormalModuleFactory, Stats, compilation::Compilation,
};

/// Hooks of a compiler, shared by every compilation it runs.
pub struct CompilerHooks {
    registry: HookRegistry,
    pub environment: Hook<()>,
    pub after_environment: Hook<()>,
    pub after_plugins: Hook<Arc<Compiler>>,
    pub after_resolvers: Hook<Arc<Compiler>>,
    pub initialize: Hook<()>,
    pub before_run: Hook<Arc<Compiler>>,
    pub run: Hook<Arc<Compiler>>,
    pub watch_run: Hook<Arc<Compiler>>,
    pub normal_module_factory: Hook<Arc<NormalModuleFactory>>,
    pub context_module_factory: Hook<Arc<ContextModuleFactory>>,
    pub before_compile: Hook<CompilationParams>,
    pub compile: Hook<CompilationParams>,
    pub this_compilation: Hook<(Arc<Compilation>, CompilationParams)>,
    pub compilation: Hook<(Arc<Compilation>, CompilationParams)>,
    pub make: Hook<Arc<Compilation>>,
    pub finish_make: Hook<Arc<Compilation>>,
    pub after_compile: Hook<Arc<Compilation>>,
    /// Return `Some(false)` to skip writing assets.
    pub should_emit: Hook<Arc<Compilation>, Option<bool>>,
    pub emit: Hook<Arc<Compilation>>,
    /// `(filename, info)` for every written asset.
    pub asset_emitted: Hook<(String, AssetEmittedInfo)>,
    pub after_emit: Hook<Arc<Compilation>>,
    pub additional_pass: Hook<()>,
    pub done: Hook<Stats>,
    pub after_done: Hook<Stats>,
    /// The error message of a failed run.
    pub failed: Hook<String>,
    /// A watched file changed: `(file, time)`.
    pub invalid: Hook<(Option<PathBuf>, SystemTime)>,
    pub watch_close: Hook<()>,
    pub shutdown: Hook<()>,
    /// Return `Some(true)` to keep the entry away from the default output.
    pub infrastructure_log: Hook<(String, LogType, Vec<String>), Option<bool>>,
}

impl CompilerHooks {
    pub(crate) fn new() -> Self {
        let registry = HookRegistry::new();
        Self {
            environment: registry.add(Hook::sync("environment")),
            after_environment: registry.add(Hook::sync("afterEnvironment")),
            after_plugins: registry.add(Hook::sync("afterPlugins")),
            after_resolvers: registry.add(Hook::sync("afterResolvers")),
            initialize: registry.add(Hook::sync("initialize")),
            before_run: registry.add(Hook::async_series("beforeRun")),
            run: registry.add(Hook::async_series("run")),
            watch_run: registry.add(Hook::async_series("watchRun")),
            normal_module_factory: registry.add(Hook::sync("normalModuleFactory")),
            context_module_factory: registry.add(Hook::sync("contextModuleFactory")),
            before_compile: registry.add(Hook::async_series("beforeCompile")),
            compile: registry.add(Hook::sync("compile")),
            this_compilation: registry.add(Hook::sync("thisCompilation")),
            compilation: registry.add(Hook::sync("compilation")),
            make: registry.add(Hook::async_parallel("make")),
            finish_make: registry.add(Hook::async_series("finishMake")),
            after_compile: registry.add(Hook::async_series("afterCompile")),
            should_emit: registry.add(Hook::sync_bail("shouldEmit")),
            emit: registry.add(Hook::async_series("emit")),
            asset_emitted: registry.add(Hook::async_series("assetEmitted")),
            after_emit: registry.add(Hook::async_series("afterEmit")),
            additional_pass: registry.add(Hook::async_series("additionalPass")),
            done: registry.add(Hook::async_series("done")),
            after_done: registry.add(Hook::sync("afterDone")),
            failed: registry.add(Hook::sync("failed")),
            invalid: registry.add(Hook::sync("invalid")),
            watch_close: registry.add(Hook::sync("watchClose")),
            shutdown: registry.add(Hook::async_series("shutdown")),
            infrastructure_log: registry.add(Hook::sync_bail("infrastructureLog")),
            registry,
        }
    }

    /// Every compiler hook by name.
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }
}
