use std::sync::Arc;

use packhook_core::Diagnostic;
use packhook_hooks::{Hook, HookRegistry};

use crate::{Assets, Chunk, Compiler, LogEntry, Module};

/// Hooks of a single compilation.
///
/// A fresh set is made for every compilation, so listeners are usually
/// added from a `thisCompilation` or `compilation` listener.
pub struct CompilationHooks {
    registry: HookRegistry,
    pub build_module: Hook<Module>,
    pub still_valid_module: Hook<Module>,
    pub succeed_module: Hook<Module>,
    pub finish_modules: Hook<Vec<Module>>,
    pub seal: Hook<()>,
    /// Return `Some(true)` to run the optimization again.
    pub optimize_modules: Hook<Vec<Module>, Option<bool>>,
    pub after_optimize_modules: Hook<Vec<Module>>,
    pub optimize_tree: Hook<(Vec<Chunk>, Vec<Module>)>,
    /// Return `Some(true)` to run the optimization again.
    pub optimize_chunk_modules: Hook<(Vec<Chunk>, Vec<Module>), Option<bool>>,
    /// A chunk produced the file with the given name.
    pub chunk_asset: Hook<(Chunk, String)>,
    /// Staged by [`ProcessAssetsStage`](crate::ProcessAssetsStage).
    pub process_assets: Hook<Assets>,
    pub after_process_assets: Hook<Assets>,
    pub after_seal: Hook<()>,
    /// Return `Some(true)` to build again before `done`.
    pub need_additional_pass: Hook<(), Option<bool>>,
    /// A child compiler was created: `(child, name, index)`.
    pub child_compiler: Hook<(Arc<Compiler>, String, usize)>,
    /// Return `Some(true)` to keep the entry out of the compilation's log.
    pub log: Hook<(String, LogEntry), Option<bool>>,
    pub process_warnings: Hook<Vec<Diagnostic>, Option<Vec<Diagnostic>>>,
    pub process_errors: Hook<Vec<Diagnostic>, Option<Vec<Diagnostic>>>,
}

impl CompilationHooks {
    pub(crate) fn new() -> Self {
        let registry = HookRegistry::new();
        Self {
            build_module: registry.add(Hook::sync("buildModule")),
            still_valid_module: registry.add(Hook::sync("stillValidModule")),
            succeed_module: registry.add(Hook::sync("succeedModule")),
            finish_modules: registry.add(Hook::async_series("finishModules")),
            seal: registry.add(Hook::sync("seal")),
            optimize_modules: registry.add(Hook::sync_bail("optimizeModules")),
            after_optimize_modules: registry.add(Hook::sync("afterOptimizeModules")),
            optimize_tree: registry.add(Hook::async_series("optimizeTree")),
            optimize_chunk_modules: registry.add(Hook::async_series_bail("optimizeChunkModules")),
            chunk_asset: registry.add(Hook::sync("chunkAsset")),
            process_assets: registry.add(Hook::async_series("processAssets")),
            after_process_assets: registry.add(Hook::sync("afterProcessAssets")),
            after_seal: registry.add(Hook::async_series("afterSeal")),
            need_additional_pass: registry.add(Hook::sync_bail("needAdditionalPass")),
            child_compiler: registry.add(Hook::sync("childCompiler")),
            log: registry.add(Hook::sync_bail("log")),
            process_warnings: registry.add(Hook::sync_waterfall("processWarnings")),
            process_errors: registry.add(Hook::sync_waterfall("processErrors")),
            registry,
        }
    }

    /// Every compilation hook by name.
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }
}
