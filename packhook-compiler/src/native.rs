//! The contract between the compiler and a native build core.
//!
//! A build core owns module resolution, parsing, chunking and asset
//! generation. It reports progress through [`NativeCallbacks`] and skips the
//! callbacks named in its disabled set.

use std::{fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use packhook_config::CompilerOptions;
use packhook_core::{
    Asset, AssetError, AssetInfo, CreateData, Diagnostic, InputFileSystem, NativeChunk,
    NativeEntrypoint, NativeModule, OutputFileSystem, RawAfterResolveData, RawContextResolveData,
    RawResolveData, Source, Version,
};

use crate::{
    BridgeError, CompilationParams, Compiler, CoreError, ProcessAssetsStage, ResolverFactory,
    compilation::Compilation,
};

/// The callback protocol version this compiler speaks.
///
/// A core is compatible when its major and minor versions match.
pub const PROTOCOL_VERSION: Version = Version::new(0, 5, 0);

/// A callback a build core makes into the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeHook {
    ThisCompilation,
    Compilation,
    Make,
    FinishMake,
    BeforeResolve,
    AfterResolve,
    ContextModuleBeforeResolve,
    BuildModule,
    StillValidModule,
    SucceedModule,
    FinishModules,
    Seal,
    OptimizeModules,
    AfterOptimizeModules,
    OptimizeTree,
    OptimizeChunkModules,
    ChunkAsset,
    ProcessAssets(ProcessAssetsStage),
    AfterProcessAssets,
    AfterSeal,
    ShouldEmit,
    Emit,
    AssetEmitted,
    AfterEmit,
}

impl BridgeHook {
    /// Every callback, in the order a build makes them.
    pub fn all() -> Vec<BridgeHook> {
        use BridgeHook::*;
        let mut hooks = vec![
            ThisCompilation,
            Compilation,
            Make,
            BeforeResolve,
            AfterResolve,
            ContextModuleBeforeResolve,
            BuildModule,
            StillValidModule,
            SucceedModule,
            FinishMake,
            FinishModules,
            Seal,
            OptimizeModules,
            AfterOptimizeModules,
            OptimizeTree,
            OptimizeChunkModules,
            ChunkAsset,
        ];
        hooks.extend(ProcessAssetsStage::ALL.into_iter().map(ProcessAssets));
        hooks.extend([
            AfterProcessAssets,
            AfterSeal,
            ShouldEmit,
            Emit,
            AssetEmitted,
            AfterEmit,
        ]);
        hooks
    }

    /// Whether any listener would observe this callback.
    ///
    /// Compilation-scoped callbacks are unused while there is no compilation,
    /// and module factory callbacks while there are no factories.
    pub fn is_used(
        self,
        compiler: &Compiler,
        compilation: Option<&Compilation>,
        params: Option<&CompilationParams>,
    ) -> bool {
        let hooks = &compiler.hooks;
        let with_compilation = |f: fn(&Compilation) -> bool| compilation.is_some_and(f);
        match self {
            BridgeHook::ThisCompilation => true,
            BridgeHook::Compilation => hooks.compilation.is_used(),
            BridgeHook::Make => hooks.make.is_used(),
            BridgeHook::FinishMake => hooks.finish_make.is_used(),
            BridgeHook::ShouldEmit => hooks.should_emit.is_used(),
            BridgeHook::Emit => hooks.emit.is_used(),
            BridgeHook::AssetEmitted => hooks.asset_emitted.is_used(),
            BridgeHook::AfterEmit => hooks.after_emit.is_used(),
            BridgeHook::BeforeResolve => {
                params.is_some_and(|p| p.normal_module_factory.hooks.before_resolve.is_used())
            }
            BridgeHook::AfterResolve => {
                params.is_some_and(|p| p.normal_module_factory.hooks.after_resolve.is_used())
            }
            BridgeHook::ContextModuleBeforeResolve => {
                params.is_some_and(|p| p.context_module_factory.hooks.before_resolve.is_used())
            }
            BridgeHook::BuildModule => with_compilation(|c| c.hooks.build_module.is_used()),
            BridgeHook::StillValidModule => {
                with_compilation(|c| c.hooks.still_valid_module.is_used())
            }
            BridgeHook::SucceedModule => with_compilation(|c| c.hooks.succeed_module.is_used()),
            BridgeHook::FinishModules => with_compilation(|c| c.hooks.finish_modules.is_used()),
            BridgeHook::Seal => with_compilation(|c| c.hooks.seal.is_used()),
            BridgeHook::OptimizeModules => {
                with_compilation(|c| c.hooks.optimize_modules.is_used())
            }
            BridgeHook::AfterOptimizeModules => {
                with_compilation(|c| c.hooks.after_optimize_modules.is_used())
            }
            BridgeHook::OptimizeTree => with_compilation(|c| c.hooks.optimize_tree.is_used()),
            BridgeHook::OptimizeChunkModules => {
                with_compilation(|c| c.hooks.optimize_chunk_modules.is_used())
            }
            BridgeHook::ChunkAsset => with_compilation(|c| c.hooks.chunk_asset.is_used()),
            BridgeHook::ProcessAssets(stage) => compilation
                .is_some_and(|c| c.hooks.process_assets.is_used_in(stage.range())),
            BridgeHook::AfterProcessAssets => {
                with_compilation(|c| c.hooks.after_process_assets.is_used())
            }
            BridgeHook::AfterSeal => with_compilation(|c| c.hooks.after_seal.is_used()),
        }
    }
}

impl fmt::Display for BridgeHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeHook::ThisCompilation => "thisCompilation",
            BridgeHook::Compilation => "compilation",
            BridgeHook::Make => "make",
            BridgeHook::FinishMake => "finishMake",
            BridgeHook::BeforeResolve => "beforeResolve",
            BridgeHook::AfterResolve => "afterResolve",
            BridgeHook::ContextModuleBeforeResolve => "contextModuleFactoryBeforeResolve",
            BridgeHook::BuildModule => "buildModule",
            BridgeHook::StillValidModule => "stillValidModule",
            BridgeHook::SucceedModule => "succeedModule",
            BridgeHook::FinishModules => "finishModules",
            BridgeHook::Seal => "seal",
            BridgeHook::OptimizeModules => "optimizeModules",
            BridgeHook::AfterOptimizeModules => "afterOptimizeModules",
            BridgeHook::OptimizeTree => "optimizeTree",
            BridgeHook::OptimizeChunkModules => "optimizeChunkModules",
            BridgeHook::ChunkAsset => "chunkAsset",
            BridgeHook::ProcessAssets(stage) => return f.write_str(&stage.callback_name()),
            BridgeHook::AfterProcessAssets => "afterProcessAssets",
            BridgeHook::AfterSeal => "afterSeal",
            BridgeHook::ShouldEmit => "shouldEmit",
            BridgeHook::Emit => "emit",
            BridgeHook::AssetEmitted => "assetEmitted",
            BridgeHook::AfterEmit => "afterEmit",
        };
        f.write_str(name)
    }
}

/// Information passed to `assetEmitted` for every written file.
#[derive(Debug, Clone)]
pub struct AssetEmittedInfo {
    pub filename: String,
    pub output_path: PathBuf,
    pub target_path: PathBuf,
    pub source: Source,
}

/// Everything a build core gets when it is created.
#[derive(Clone)]
pub struct CoreContext {
    pub options: Arc<CompilerOptions>,
    pub callbacks: Arc<dyn NativeCallbacks>,
    pub resolver_factory: Arc<ResolverFactory>,
    pub input_fs: Option<Arc<dyn InputFileSystem>>,
    /// `None` for child compilers, which never write to disk.
    pub output_fs: Option<Arc<dyn OutputFileSystem>>,
}

/// Creates build core instances.
pub trait NativeCoreFactory: Send + Sync {
    /// The callback protocol version the cores speak.
    fn version(&self) -> Version;

    fn create(&self, context: CoreContext) -> Result<Arc<dyn NativeCore>, CoreError>;
}

/// A running build core, one per compiler.
#[async_trait]
pub trait NativeCore: Send + Sync {
    /// Run the first build.
    async fn build(&self) -> Result<(), CoreError>;

    /// Run an incremental build after files changed on disk.
    async fn rebuild(&self, modified: Vec<PathBuf>, removed: Vec<PathBuf>)
    -> Result<(), CoreError>;

    /// Replace the set of callbacks the core may skip.
    fn set_disabled_hooks(&self, hooks: &[BridgeHook]);
}

/// The native side of a compilation.
pub trait NativeCompilation: Send + Sync {
    fn hash(&self) -> Option<String>;

    fn asset_names(&self) -> Vec<String>;

    fn get_asset(&self, name: &str) -> Option<Asset>;

    /// Add a new asset. Emitting the same content twice merges the infos.
    fn emit_asset(&self, asset: Asset) -> Result<(), AssetError>;

    /// Replace an existing asset, keeping its info unless one is given.
    fn update_asset(
        &self,
        name: &str,
        source: Source,
        info: Option<AssetInfo>,
    ) -> Result<(), AssetError>;

    fn delete_asset(&self, name: &str) -> bool;

    fn modules(&self) -> Vec<NativeModule>;

    fn chunks(&self) -> Vec<NativeChunk>;

    fn entrypoints(&self) -> Vec<NativeEntrypoint>;

    fn diagnostics(&self) -> Vec<Diagnostic>;

    fn push_diagnostic(&self, diagnostic: Diagnostic);
}

/// The callbacks a build core makes, in build order.
///
/// Every callback except `this_compilation` may be skipped while it is in the
/// core's disabled set. A callback error aborts the build.
#[async_trait]
pub trait NativeCallbacks: Send + Sync {
    fn this_compilation(&self, native: Arc<dyn NativeCompilation>) -> Result<(), BridgeError>;

    fn compilation(&self) -> Result<(), BridgeError>;

    async fn make(&self) -> Result<(), BridgeError>;

    /// Returns the continue flag (`Some(false)` drops the dependency) and the
    /// possibly rewritten resolve data.
    async fn before_resolve(
        &self,
        data: RawResolveData,
    ) -> Result<(Option<bool>, RawResolveData), BridgeError>;

    async fn after_resolve(
        &self,
        data: RawAfterResolveData,
    ) -> Result<(Option<bool>, Option<CreateData>), BridgeError>;

    /// Returns `None` when the context dependency should be ignored.
    async fn context_module_before_resolve(
        &self,
        data: RawContextResolveData,
    ) -> Result<Option<RawContextResolveData>, BridgeError>;

    fn build_module(&self, module: NativeModule) -> Result<(), BridgeError>;

    fn still_valid_module(&self, module: NativeModule) -> Result<(), BridgeError>;

    fn succeed_module(&self, module: NativeModule) -> Result<(), BridgeError>;

    async fn finish_make(&self) -> Result<(), BridgeError>;

    async fn finish_modules(&self) -> Result<(), BridgeError>;

    fn seal(&self) -> Result<(), BridgeError>;

    /// `Some(true)` asks the core to run the optimization again.
    fn optimize_modules(&self) -> Result<Option<bool>, BridgeError>;

    fn after_optimize_modules(&self) -> Result<(), BridgeError>;

    async fn optimize_tree(&self) -> Result<(), BridgeError>;

    async fn optimize_chunk_modules(&self) -> Result<Option<bool>, BridgeError>;

    fn chunk_asset(&self, chunk: NativeChunk, filename: String) -> Result<(), BridgeError>;

    async fn process_assets(&self, stage: ProcessAssetsStage) -> Result<(), BridgeError>;

    fn after_process_assets(&self) -> Result<(), BridgeError>;

    async fn after_seal(&self) -> Result<(), BridgeError>;

    /// `Some(false)` skips writing assets.
    fn should_emit(&self) -> Result<Option<bool>, BridgeError>;

    async fn emit(&self) -> Result<(), BridgeError>;

    async fn asset_emitted(&self, info: AssetEmittedInfo) -> Result<(), BridgeError>;

    async fn after_emit(&self) -> Result<(), BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_lists_every_stage_once() {
        let all = BridgeHook::all();
        let stages = all
            .iter()
            .filter(|h| matches!(h, BridgeHook::ProcessAssets(_)))
            .count();
        assert_eq!(stages, ProcessAssetsStage::ALL.len());
        assert_eq!(all.first(), Some(&BridgeHook::ThisCompilation));
        assert_eq!(all.last(), Some(&BridgeHook::AfterEmit));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(BridgeHook::FinishMake.to_string(), "finishMake");
        assert_eq!(
            BridgeHook::ProcessAssets(ProcessAssetsStage::OPTIMIZE_SIZE).to_string(),
            "processAssetsStageOptimizeSize"
        );
    }
}
