use std::hash::{DefaultHasher, Hash, Hasher};

use indexmap::IndexMap;
use packhook_core::{
    Asset, AssetError, AssetInfo, Diagnostic, NativeChunk, NativeEntrypoint, NativeModule, Source,
};
use parking_lot::Mutex;

use crate::NativeCompilation;

#[derive(Default)]
struct Records {
    assets: IndexMap<String, Asset>,
    modules: Vec<NativeModule>,
    chunks: Vec<NativeChunk>,
    entrypoints: Vec<NativeEntrypoint>,
    diagnostics: Vec<Diagnostic>,
    hash: Option<String>,
}

/// The compilation records of the reference core.
#[derive(Default)]
pub struct ReferenceCompilation {
    records: Mutex<Records>,
}

impl ReferenceCompilation {
    pub(crate) fn add_module(&self, module: NativeModule) {
        let mut records = self.records.lock();
        if !records
            .modules
            .iter()
            .any(|m| m.identifier == module.identifier)
        {
            records.modules.push(module);
        }
    }

    pub(crate) fn add_chunk(&self, chunk: NativeChunk) {
        self.records.lock().chunks.push(chunk);
    }

    pub(crate) fn add_entrypoint(&self, entrypoint: NativeEntrypoint) {
        self.records.lock().entrypoints.push(entrypoint);
    }

    /// Hash every asset name and content.
    pub(crate) fn seal_hash(&self) {
        let mut records = self.records.lock();
        let mut hasher = DefaultHasher::new();
        for (name, asset) in &records.assets {
            name.hash(&mut hasher);
            asset.source.buffer().hash(&mut hasher);
        }
        records.hash = Some(format!("{:016x}", hasher.finish()));
    }
}

impl NativeCompilation for ReferenceCompilation {
    fn hash(&self) -> Option<String> {
        self.records.lock().hash.clone()
    }

    fn asset_names(&self) -> Vec<String> {
        self.records.lock().assets.keys().cloned().collect()
    }

    fn get_asset(&self, name: &str) -> Option<Asset> {
        self.records.lock().assets.get(name).cloned()
    }

    fn emit_asset(&self, asset: Asset) -> Result<(), AssetError> {
        let mut records = self.records.lock();
        match records.assets.get_mut(&asset.name) {
            Some(existing) if existing.source.buffer() != asset.source.buffer() => {
                Err(AssetError::Conflict { name: asset.name })
            }
            Some(existing) => {
                existing.info = std::mem::take(&mut existing.info).merge(asset.info);
                Ok(())
            }
            None => {
                records.assets.insert(asset.name.clone(), asset);
                Ok(())
            }
        }
    }

    fn update_asset(
        &self,
        name: &str,
        source: Source,
        info: Option<AssetInfo>,
    ) -> Result<(), AssetError> {
        let mut records = self.records.lock();
        let asset = records
            .assets
            .get_mut(name)
            .ok_or_else(|| AssetError::NotFound {
                name: name.to_string(),
            })?;
        asset.source = source;
        if let Some(info) = info {
            asset.info = info;
        }
        Ok(())
    }

    fn delete_asset(&self, name: &str) -> bool {
        self.records.lock().assets.shift_remove(name).is_some()
    }

    fn modules(&self) -> Vec<NativeModule> {
        self.records.lock().modules.clone()
    }

    fn chunks(&self) -> Vec<NativeChunk> {
        self.records.lock().chunks.clone()
    }

    fn entrypoints(&self) -> Vec<NativeEntrypoint> {
        self.records.lock().entrypoints.clone()
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records.lock().diagnostics.clone()
    }

    fn push_diagnostic(&self, diagnostic: Diagnostic) {
        self.records.lock().diagnostics.push(diagnostic);
    }
}
