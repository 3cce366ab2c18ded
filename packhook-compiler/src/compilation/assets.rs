use std::sync::Arc;

use packhook_core::{Asset, AssetError, AssetInfo, Source};

use crate::NativeCompilation;

/// A live view of a compilation's assets.
///
/// Reads and writes go straight to the build core, so changes made by one
/// listener are visible to the next.
#[derive(Clone)]
pub struct Assets {
    native: Arc<dyn NativeCompilation>,
}

impl std::fmt::Debug for Assets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Assets {
    pub(crate) fn new(native: Arc<dyn NativeCompilation>) -> Self {
        Self { native }
    }

    pub fn names(&self) -> Vec<String> {
        self.native.asset_names()
    }

    pub fn get(&self, name: &str) -> Option<Asset> {
        self.native.get_asset(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.native.get_asset(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<Asset> {
        self.names()
            .iter()
            .filter_map(|name| self.native.get_asset(name))
            .collect()
    }

    /// Replace the source of `name`, emitting it when it does not exist yet.
    pub fn set(&self, name: &str, source: impl Into<Source>) -> Result<(), AssetError> {
        let source = source.into();
        if self.contains(name) {
            self.native.update_asset(name, source, None)
        } else {
            self.native
                .emit_asset(Asset::new(name, source, AssetInfo::default()))
        }
    }

    pub fn emit(&self, asset: Asset) -> Result<(), AssetError> {
        self.native.emit_asset(asset)
    }

    pub fn update(
        &self,
        name: &str,
        source: impl Into<Source>,
        info: Option<AssetInfo>,
    ) -> Result<(), AssetError> {
        self.native.update_asset(name, source.into(), info)
    }

    pub fn remove(&self, name: &str) -> bool {
        self.native.delete_asset(name)
    }
}
