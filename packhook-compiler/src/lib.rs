//! The compiler/compilation lifecycle of the packhook bundler.
//!
//! A [`Compiler`] drives builds on a native build core. The core calls back
//! into a [`NativeBridge`] at fixed points; the bridge turns each callback into
//! hook emissions on the compiler, the current [`Compilation`] or the module
//! factories, and hands the results back. After every callback the
//! [`DisabledHookTracker`] tells the core which callbacks it may skip because
//! nothing listens to them.
//!
//! # Example
//!
//! ```ignore
//! let compiler = Compiler::builder(options, Arc::new(ReferenceCoreFactory::new()))
//!     .plugin(BannerPlugin::new("/* built with packhook */"))
//!     .build()?;
//!
//! let stats = compiler.run().await?;
//! assert!(!stats.has_errors());
//! ```

mod bridge;
mod cache;
mod compilation;
mod compiler;
mod disabled;
mod error;
mod factory;
mod logging;
mod native;
mod pipeline;
mod plugin;
#[cfg(any(test, feature = "reference"))]
pub mod reference;
mod resolver;
mod scheduler;
mod stage;
mod stats;
mod watching;

pub use bridge::NativeBridge;
pub use cache::{Cache, CacheFacade, CacheHooks, ItemCacheFacade};
pub use compilation::{Assets, Chunk, Compilation, CompilationHooks, Entrypoint, Module};
pub use compiler::{
    CHILD_EXCLUDED_HOOKS, ChildCompilerOptions, ChildRunOutput, Compiler, CompilerBuilder,
    CompilerHooks,
};
pub use disabled::DisabledHookTracker;
pub use error::{BridgeError, CompilerError, CoreError, PipelineError};
pub use factory::{
    CompilationParams, ContextModuleFactory, ContextModuleFactoryHooks, ContextResolveData,
    NormalModuleFactory, NormalModuleFactoryHooks, ResolveData, ResolveDataRef,
};
pub use logging::{LogEntry, LogType, Logger};
pub use native::{
    AssetEmittedInfo, BridgeHook, CoreContext, NativeCallbacks, NativeCompilation, NativeCore,
    NativeCoreFactory, PROTOCOL_VERSION,
};
pub use pipeline::{CompilationPipeline, PipelineState};
pub use plugin::Plugin;
pub use resolver::{ResolveOptionsWithDependencyType, ResolverFactory, ResolverFactoryHooks};
pub use scheduler::{RunMode, RunScheduler, RunState};
pub use stage::ProcessAssetsStage;
pub use stats::{
    Stats, StatsAsset, StatsChunk, StatsCompilation, StatsEntrypoint, StatsModule, StatsOptions,
};
pub use watching::{FileChanges, Watching};
