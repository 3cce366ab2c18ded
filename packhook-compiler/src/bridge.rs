//! Turns build core callbacks into hook emissions.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use packhook_core::{
    CreateData, NativeChunk, NativeModule, RawAfterResolveData, RawContextResolveData,
    RawResolveData,
};
use packhook_hooks::HookResult;
use parking_lot::Mutex;

use crate::{
    AssetEmittedInfo, BridgeError, BridgeHook, CompilationPipeline, Compiler, ContextResolveData,
    DisabledHookTracker, NativeCallbacks, NativeCompilation, ProcessAssetsStage, ResolveData,
    compilation::{Chunk, Compilation, Module},
};

/// The compiler side of the build core's callbacks.
///
/// Every callback checks its place in the [`CompilationPipeline`], runs the
/// matching hook and then lets the [`DisabledHookTracker`] push an updated
/// disabled set, since listeners may have tapped or untapped hooks.
pub struct NativeBridge {
    compiler: Weak<Compiler>,
    pipeline: CompilationPipeline,
    tracker: DisabledHookTracker,
}

impl NativeBridge {
    pub(crate) fn new(compiler: Weak<Compiler>) -> Self {
        Self {
            compiler,
            pipeline: CompilationPipeline::new(),
            tracker: DisabledHookTracker::new(),
        }
    }

    pub fn pipeline(&self) -> &CompilationPipeline {
        &self.pipeline
    }

    pub fn tracker(&self) -> &DisabledHookTracker {
        &self.tracker
    }

    fn compiler(&self) -> Result<Arc<Compiler>, BridgeError> {
        self.compiler.upgrade().ok_or(BridgeError::CompilerDropped)
    }

    /// Recompute the disabled set and push it to the core if it changed.
    pub fn refresh_disabled_hooks(&self) {
        if let Some(compiler) = self.compiler.upgrade() {
            self.tracker.recompute(&compiler);
        }
    }

    /// Check ordering and look up the live compilation for `hook`.
    fn enter(&self, hook: BridgeHook) -> Result<(Arc<Compiler>, Arc<Compilation>), BridgeError> {
        let compiler = self.compiler()?;
        let compilation = compiler
            .current_compilation()
            .ok_or_else(|| BridgeError::NoCompilation {
                hook: hook.to_string(),
            })?;
        self.pipeline.advance(hook)?;
        tracing::trace!(%hook, compilation = compilation.id(), "callback");
        Ok((compiler, compilation))
    }

    fn leave<T>(&self, result: HookResult<T>) -> Result<T, BridgeError> {
        match result {
            Ok(value) => {
                self.refresh_disabled_hooks();
                Ok(value)
            }
            Err(err) => {
                self.pipeline.fail();
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl NativeCallbacks for NativeBridge {
    fn this_compilation(&self, native: Arc<dyn NativeCompilation>) -> Result<(), BridgeError> {
        let compiler = self.compiler()?;
        self.pipeline.advance(BridgeHook::ThisCompilation)?;
        let (compilation, params) = compiler.new_compilation(native);
        tracing::debug!(compilation = compilation.id(), compiler = compiler.compiler_path(), "new compilation");
        let result = compiler.hooks.this_compilation.call((compilation, params));
        self.leave(result)
    }

    fn compilation(&self) -> Result<(), BridgeError> {
        let (compiler, compilation) = self.enter(BridgeHook::Compilation)?;
        let params = compilation.params().clone();
        let result = compiler.hooks.compilation.call((compilation, params));
        self.leave(result)
    }

    async fn make(&self) -> Result<(), BridgeError> {
        let (compiler, compilation) = self.enter(BridgeHook::Make)?;
        let result = compiler.hooks.make.call_async(compilation).await;
        self.leave(result)
    }

    async fn before_resolve(
        &self,
        data: RawResolveData,
    ) -> Result<(Option<bool>, RawResolveData), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::BeforeResolve)?;
        let data = Arc::new(Mutex::new(ResolveData::from(data)));
        let result = compilation
            .params()
            .normal_module_factory
            .hooks
            .before_resolve
            .call_async(data.clone())
            .await;
        let proceed = self.leave(result)?;
        let data = data.lock().clone();
        Ok((proceed, data.into_raw()))
    }

    async fn after_resolve(
        &self,
        data: RawAfterResolveData,
    ) -> Result<(Option<bool>, Option<CreateData>), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::AfterResolve)?;
        let data = Arc::new(Mutex::new(ResolveData::from(data)));
        let result = compilation
            .params()
            .normal_module_factory
            .hooks
            .after_resolve
            .call_async(data.clone())
            .await;
        let proceed = self.leave(result)?;
        let create_data = data.lock().create_data.clone();
        Ok((proceed, create_data))
    }

    async fn context_module_before_resolve(
        &self,
        data: RawContextResolveData,
    ) -> Result<Option<RawContextResolveData>, BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::ContextModuleBeforeResolve)?;
        let result = compilation
            .params()
            .context_module_factory
            .hooks
            .before_resolve
            .call_waterfall_async(Some(ContextResolveData::from(data)))
            .await;
        self.refresh_disabled_hooks();
        Ok(result.map(RawContextResolveData::from))
    }

    fn build_module(&self, module: NativeModule) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::BuildModule)?;
        let result = compilation.hooks.build_module.call(Module::from(module));
        self.leave(result)
    }

    fn still_valid_module(&self, module: NativeModule) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::StillValidModule)?;
        let result = compilation
            .hooks
            .still_valid_module
            .call(Module::from(module));
        self.leave(result)
    }

    fn succeed_module(&self, module: NativeModule) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::SucceedModule)?;
        let result = compilation.hooks.succeed_module.call(Module::from(module));
        self.leave(result)
    }

    async fn finish_make(&self) -> Result<(), BridgeError> {
        let (compiler, compilation) = self.enter(BridgeHook::FinishMake)?;
        let result = compiler.hooks.finish_make.call_async(compilation).await;
        self.leave(result)
    }

    async fn finish_modules(&self) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::FinishModules)?;
        let result = compilation
            .hooks
            .finish_modules
            .call_async(compilation.modules())
            .await;
        self.leave(result)
    }

    fn seal(&self) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::Seal)?;
        let result = compilation.hooks.seal.call(());
        self.leave(result)
    }

    fn optimize_modules(&self) -> Result<Option<bool>, BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::OptimizeModules)?;
        let result = compilation
            .hooks
            .optimize_modules
            .call(compilation.modules());
        self.leave(result)
    }

    fn after_optimize_modules(&self) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::AfterOptimizeModules)?;
        let result = compilation
            .hooks
            .after_optimize_modules
            .call(compilation.modules());
        self.leave(result)
    }

    async fn optimize_tree(&self) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::OptimizeTree)?;
        let result = compilation
            .hooks
            .optimize_tree
            .call_async((compilation.chunks(), compilation.modules()))
            .await;
        self.leave(result)
    }

    async fn optimize_chunk_modules(&self) -> Result<Option<bool>, BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::OptimizeChunkModules)?;
        let result = compilation
            .hooks
            .optimize_chunk_modules
            .call_async((compilation.chunks(), compilation.modules()))
            .await;
        self.leave(result)
    }

    fn chunk_asset(&self, chunk: NativeChunk, filename: String) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::ChunkAsset)?;
        let result = compilation
            .hooks
            .chunk_asset
            .call((Chunk::from(chunk), filename));
        self.leave(result)
    }

    async fn process_assets(&self, stage: ProcessAssetsStage) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::ProcessAssets(stage))?;
        let result = compilation
            .hooks
            .process_assets
            .call_async_stage_range(stage.range(), compilation.assets())
            .await;
        self.leave(result)
    }

    fn after_process_assets(&self) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::AfterProcessAssets)?;
        let result = compilation
            .hooks
            .after_process_assets
            .call(compilation.assets());
        self.leave(result)
    }

    async fn after_seal(&self) -> Result<(), BridgeError> {
        let (_, compilation) = self.enter(BridgeHook::AfterSeal)?;
        let result = compilation.hooks.after_seal.call_async(()).await;
        self.leave(result)
    }

    fn should_emit(&self) -> Result<Option<bool>, BridgeError> {
        let (compiler, compilation) = self.enter(BridgeHook::ShouldEmit)?;
        let result = compiler.hooks.should_emit.call(compilation);
        self.leave(result)
    }

    async fn emit(&self) -> Result<(), BridgeError> {
        let (compiler, compilation) = self.enter(BridgeHook::Emit)?;
        let result = compiler.hooks.emit.call_async(compilation).await;
        self.leave(result)
    }

    async fn asset_emitted(&self, info: AssetEmittedInfo) -> Result<(), BridgeError> {
        let (compiler, _) = self.enter(BridgeHook::AssetEmitted)?;
        let result = compiler
            .hooks
            .asset_emitted
            .call_async((info.filename.clone(), info))
            .await;
        self.leave(result)
    }

    async fn after_emit(&self) -> Result<(), BridgeError> {
        let (compiler, compilation) = self.enter(BridgeHook::AfterEmit)?;
        let result = compiler.hooks.after_emit.call_async(compilation).await;
        self.leave(result)
    }
}
