//! A small in-process build core.
//!
//! Every entry becomes one chunk and one asset holding the concatenated
//! sources of its imports. Requests prefixed with `context:` become context
//! modules. The core makes every callback a real core makes, in the same
//! order, and honors the disabled set pushed by the compiler.

mod compilation;
mod resolve;

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
pub use compilation::ReferenceCompilation;
use packhook_config::OutputOptions;
use packhook_core::{
    Asset, AssetInfo, CreateData, Diagnostic, NativeChunk, NativeEntrypoint, NativeModule,
    RawAfterResolveData, RawContextResolveData, RawResolveData, Version,
};
use parking_lot::Mutex;

use crate::{
    AssetEmittedInfo, BridgeHook, CoreContext, CoreError, NativeCompilation, NativeCore,
    NativeCoreFactory, PROTOCOL_VERSION, ProcessAssetsStage,
};

/// Creates [`ReferenceCore`]s and keeps a handle on each.
pub struct ReferenceCoreFactory {
    version: Version,
    cores: Mutex<Vec<Arc<ReferenceCore>>>,
}

impl Default for ReferenceCoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceCoreFactory {
    pub fn new() -> Self {
        Self::with_version(PROTOCOL_VERSION)
    }

    /// A factory claiming to speak `version`.
    pub fn with_version(version: Version) -> Self {
        Self {
            version,
            cores: Mutex::new(Vec::new()),
        }
    }

    /// Every core created so far, in creation order.
    pub fn cores(&self) -> Vec<Arc<ReferenceCore>> {
        self.cores.lock().clone()
    }

    /// The first core created, which belongs to the root compiler.
    pub fn core(&self) -> Option<Arc<ReferenceCore>> {
        self.cores.lock().first().cloned()
    }
}

impl NativeCoreFactory for ReferenceCoreFactory {
    fn version(&self) -> Version {
        self.version
    }

    fn create(&self, context: CoreContext) -> Result<Arc<dyn NativeCore>, CoreError> {
        let core = Arc::new(ReferenceCore::new(context));
        self.cores.lock().push(core.clone());
        Ok(core)
    }
}

struct PlannedChunk {
    name: String,
    filename: Option<String>,
    source: String,
    is_entry: bool,
}

pub struct ReferenceCore {
    context: CoreContext,
    disabled: Mutex<HashSet<BridgeHook>>,
    disabled_updates: AtomicUsize,
    /// Sources of built modules by identifier, reused while still valid.
    sources: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl ReferenceCore {
    fn new(context: CoreContext) -> Self {
        Self {
            context,
            disabled: Mutex::new(HashSet::new()),
            disabled_updates: AtomicUsize::new(0),
            sources: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The current disabled set, in build order.
    pub fn disabled_hooks(&self) -> Vec<BridgeHook> {
        let disabled = self.disabled.lock();
        BridgeHook::all()
            .into_iter()
            .filter(|hook| disabled.contains(hook))
            .collect()
    }

    /// How many times the compiler pushed a disabled set.
    pub fn disabled_updates(&self) -> usize {
        self.disabled_updates.load(Ordering::SeqCst)
    }

    /// Names of the callbacks made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Whether to make `hook`, recording it when so.
    fn enabled(&self, hook: BridgeHook) -> bool {
        let enabled = !self.disabled.lock().contains(&hook);
        if enabled {
            self.calls.lock().push(hook.to_string());
        }
        enabled
    }

    async fn compile(&self, modified: &[PathBuf]) -> Result<(), CoreError> {
        let callbacks = &self.context.callbacks;
        let options = &self.context.options;
        let compilation = Arc::new(ReferenceCompilation::default());

        self.enabled(BridgeHook::ThisCompilation);
        callbacks.this_compilation(compilation.clone())?;
        if self.enabled(BridgeHook::Compilation) {
            callbacks.compilation()?;
        }
        if self.enabled(BridgeHook::Make) {
            callbacks.make().await?;
        }

        let entries = options
            .entry
            .iter()
            .map(|(name, entry)| (name, entry, true))
            .chain(options.includes.iter().map(|(name, entry)| (name, entry, false)));
        let mut planned = Vec::new();
        for (name, entry, is_entry) in entries {
            let mut source = String::new();
            for request in &entry.import {
                let built = match request.strip_prefix("context:") {
                    Some(directory) => self.build_context(&compilation, directory).await?,
                    None => self.build_dependency(&compilation, request, modified).await?,
                };
                if let Some(module_source) = built {
                    source.push_str(&module_source);
                    if !source.ends_with('\n') {
                        source.push('\n');
                    }
                }
            }
            planned.push(PlannedChunk {
                name: name.clone(),
                filename: entry.filename.clone(),
                source,
                is_entry,
            });
        }

        if self.enabled(BridgeHook::FinishMake) {
            callbacks.finish_make().await?;
        }
        if self.enabled(BridgeHook::FinishModules) {
            callbacks.finish_modules().await?;
        }
        if self.enabled(BridgeHook::Seal) {
            callbacks.seal()?;
        }
        while self.enabled(BridgeHook::OptimizeModules)
            && callbacks.optimize_modules()? == Some(true)
        {}
        if self.enabled(BridgeHook::AfterOptimizeModules) {
            callbacks.after_optimize_modules()?;
        }
        if self.enabled(BridgeHook::OptimizeTree) {
            callbacks.optimize_tree().await?;
        }
        if self.enabled(BridgeHook::OptimizeChunkModules) {
            callbacks.optimize_chunk_modules().await?;
        }

        for (index, chunk) in planned.into_iter().enumerate() {
            let id = index.to_string();
            let filename = chunk.filename.unwrap_or_else(|| {
                OutputOptions::render_filename(&options.output.filename, &chunk.name, &id)
            });
            compilation.emit_asset(Asset::new(&filename, chunk.source, AssetInfo::default()))?;
            let native_chunk = NativeChunk {
                id: Some(id.clone()),
                name: Some(chunk.name.clone()),
                files: vec![filename.clone()],
                runtime: vec![chunk.name.clone()],
                hash: None,
            };
            compilation.add_chunk(native_chunk.clone());
            if chunk.is_entry {
                compilation.add_entrypoint(NativeEntrypoint {
                    name: chunk.name,
                    chunks: vec![id],
                    files: vec![filename.clone()],
                });
            }
            if self.enabled(BridgeHook::ChunkAsset) {
                callbacks.chunk_asset(native_chunk, filename)?;
            }
        }

        for stage in ProcessAssetsStage::ALL {
            if self.enabled(BridgeHook::ProcessAssets(stage)) {
                callbacks.process_assets(stage).await?;
            }
        }
        if self.enabled(BridgeHook::AfterProcessAssets) {
            callbacks.after_process_assets()?;
        }
        compilation.seal_hash();
        if self.enabled(BridgeHook::AfterSeal) {
            callbacks.after_seal().await?;
        }

        self.emit(&compilation).await
    }

    async fn build_dependency(
        &self,
        compilation: &ReferenceCompilation,
        request: &str,
        modified: &[PathBuf],
    ) -> Result<Option<String>, CoreError> {
        let callbacks = &self.context.callbacks;
        let options = &self.context.options;

        let mut data = RawResolveData {
            request: request.to_string(),
            context: options.context.display().to_string(),
            issuer: None,
        };
        if self.enabled(BridgeHook::BeforeResolve) {
            let (proceed, rewritten) = callbacks.before_resolve(data).await?;
            if proceed == Some(false) {
                return Ok(None);
            }
            data = rewritten;
        }

        let resolve_options = self.context.resolver_factory.options_for("esm")?;
        let Some(fs) = self.context.input_fs.as_deref() else {
            return Err(CoreError::Other("no input filesystem".to_string()));
        };
        let Some(resolved) = resolve::resolve(
            fs,
            Path::new(&data.context),
            &data.request,
            &resolve_options,
        ) else {
            compilation.push_diagnostic(Diagnostic::error(
                "ModuleNotFoundError",
                format!("Can't resolve '{}' in '{}'", data.request, data.context),
            ));
            return Ok(None);
        };

        let mut resource = resolved.display().to_string();
        if self.enabled(BridgeHook::AfterResolve) {
            let after = RawAfterResolveData {
                request: data.request.clone(),
                context: data.context.clone(),
                issuer: data.issuer.clone(),
                file_dependencies: vec![resource.clone()],
                create_data: Some(CreateData {
                    request: resource.clone(),
                    user_request: data.request.clone(),
                    resource: resource.clone(),
                }),
                ..Default::default()
            };
            let (proceed, create_data) = callbacks.after_resolve(after).await?;
            if proceed == Some(false) {
                return Ok(None);
            }
            if let Some(create_data) = create_data {
                resource = create_data.resource;
            }
        }

        let path = PathBuf::from(&resource);
        let readable = match path.strip_prefix(&options.context) {
            Ok(relative) => format!("./{}", relative.display()),
            Err(_) => resource.clone(),
        };
        let module = |size: usize| NativeModule {
            identifier: resource.clone(),
            readable_identifier: readable.clone(),
            resource: Some(resource.clone()),
            module_type: "javascript/auto".to_string(),
            size: size as f64,
        };

        let cached = self.sources.lock().get(&resource).cloned();
        let source = match cached.filter(|_| !modified.contains(&path)) {
            Some(source) => {
                if self.enabled(BridgeHook::StillValidModule) {
                    callbacks.still_valid_module(module(source.len()))?;
                }
                source
            }
            None => {
                let bytes = match fs.read_file(&path) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        compilation.push_diagnostic(
                            Diagnostic::error("ModuleBuildError", err.to_string()).at(&resource),
                        );
                        return Ok(None);
                    }
                };
                let source = String::from_utf8_lossy(&bytes).into_owned();
                if self.enabled(BridgeHook::BuildModule) {
                    callbacks.build_module(module(source.len()))?;
                }
                self.sources
                    .lock()
                    .insert(resource.clone(), source.clone());
                if self.enabled(BridgeHook::SucceedModule) {
                    callbacks.succeed_module(module(source.len()))?;
                }
                source
            }
        };
        compilation.add_module(module(source.len()));
        Ok(Some(source))
    }

    async fn build_context(
        &self,
        compilation: &ReferenceCompilation,
        request: &str,
    ) -> Result<Option<String>, CoreError> {
        let mut data = RawContextResolveData {
            context: self.context.options.context.display().to_string(),
            request: request.to_string(),
            recursive: true,
            reg_exp: None,
        };
        if self.enabled(BridgeHook::ContextModuleBeforeResolve) {
            match self.context.callbacks.context_module_before_resolve(data).await? {
                Some(rewritten) => data = rewritten,
                None => return Ok(None),
            }
        }
        let source = format!(
            "// context module {} (recursive: {})\n",
            data.request, data.recursive
        );
        compilation.add_module(NativeModule {
            identifier: format!("context {}|{}", data.context, data.request),
            readable_identifier: data.request,
            resource: None,
            module_type: "javascript/dynamic".to_string(),
            size: source.len() as f64,
        });
        Ok(Some(source))
    }

    async fn emit(&self, compilation: &ReferenceCompilation) -> Result<(), CoreError> {
        let callbacks = &self.context.callbacks;
        if self.enabled(BridgeHook::ShouldEmit) && callbacks.should_emit()? == Some(false) {
            return Ok(());
        }
        if self.enabled(BridgeHook::Emit) {
            callbacks.emit().await?;
        }
        if let Some(fs) = self.context.output_fs.as_deref() {
            let output_path = &self.context.options.output.path;
            fs.mkdirp(output_path).map_err(|source| CoreError::Write {
                path: output_path.clone(),
                source,
            })?;
            for name in compilation.asset_names() {
                let Some(asset) = compilation.get_asset(&name) else {
                    continue;
                };
                let target_path = output_path.join(&name);
                fs.write_file(&target_path, asset.source.buffer())
                    .map_err(|source| CoreError::Write {
                        path: target_path.clone(),
                        source,
                    })?;
                if self.enabled(BridgeHook::AssetEmitted) {
                    callbacks
                        .asset_emitted(AssetEmittedInfo {
                            filename: name,
                            output_path: output_path.clone(),
                            target_path,
                            source: asset.source,
                        })
                        .await?;
                }
            }
        }
        if self.enabled(BridgeHook::AfterEmit) {
            callbacks.after_emit().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl NativeCore for ReferenceCore {
    async fn build(&self) -> Result<(), CoreError> {
        self.compile(&[]).await
    }

    async fn rebuild(
        &self,
        modified: Vec<PathBuf>,
        removed: Vec<PathBuf>,
    ) -> Result<(), CoreError> {
        {
            let mut sources = self.sources.lock();
            for path in &removed {
                sources.remove(&path.display().to_string());
            }
        }
        self.compile(&modified).await
    }

    fn set_disabled_hooks(&self, hooks: &[BridgeHook]) {
        *self.disabled.lock() = hooks.iter().copied().collect();
        self.disabled_updates.fetch_add(1, Ordering::SeqCst);
    }
}
