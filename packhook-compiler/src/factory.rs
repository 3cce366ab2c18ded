//! Module factories and the resolve data their hooks see.

use std::sync::Arc;

use packhook_core::{
    ContextInfo, CreateData, RawAfterResolveData, RawContextResolveData, RawResolveData,
};
use packhook_hooks::{Hook, HookRegistry, WaterfallValue};
use parking_lot::Mutex;

/// Resolve data for a normal module request.
///
/// Listeners mutate it in place; the bridge hands the result back to the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveData {
    pub request: String,
    pub context: String,
    pub context_info: ContextInfo,
    pub file_dependencies: Vec<String>,
    pub context_dependencies: Vec<String>,
    pub missing_dependencies: Vec<String>,
    /// Only set after the request was resolved.
    pub create_data: Option<CreateData>,
}

/// Shared, mutable resolve data passed to listeners.
pub type ResolveDataRef = Arc<Mutex<ResolveData>>;

impl From<RawResolveData> for ResolveData {
    fn from(raw: RawResolveData) -> Self {
        Self {
            request: raw.request,
            context: raw.context,
            context_info: ContextInfo {
                issuer: raw.issuer.unwrap_or_default(),
            },
            ..Default::default()
        }
    }
}

impl From<RawAfterResolveData> for ResolveData {
    fn from(raw: RawAfterResolveData) -> Self {
        Self {
            request: raw.request,
            context: raw.context,
            context_info: ContextInfo {
                issuer: raw.issuer.unwrap_or_default(),
            },
            file_dependencies: raw.file_dependencies,
            context_dependencies: raw.context_dependencies,
            missing_dependencies: raw.missing_dependencies,
            create_data: raw.create_data,
        }
    }
}

impl ResolveData {
    pub(crate) fn into_raw(self) -> RawResolveData {
        let issuer = self.context_info.issuer;
        RawResolveData {
            request: self.request,
            context: self.context,
            issuer: (!issuer.is_empty()).then_some(issuer),
        }
    }
}

pub struct NormalModuleFactoryHooks {
    registry: HookRegistry,
    /// Return `Some(false)` to drop the dependency.
    pub before_resolve: Hook<ResolveDataRef, Option<bool>>,
    /// Return `Some(false)` to drop the dependency.
    pub after_resolve: Hook<ResolveDataRef, Option<bool>>,
}

impl NormalModuleFactoryHooks {
    fn new() -> Self {
        let registry = HookRegistry::new();
        Self {
            before_resolve: registry.add(Hook::async_series_bail("beforeResolve")),
            after_resolve: registry.add(Hook::async_series_bail("afterResolve")),
            registry,
        }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }
}

/// Creates modules for plain requests. A new factory is made per compilation.
pub struct NormalModuleFactory {
    pub hooks: NormalModuleFactoryHooks,
}

impl NormalModuleFactory {
    pub(crate) fn new() -> Self {
        Self {
            hooks: NormalModuleFactoryHooks::new(),
        }
    }
}

/// Resolve data for a context module request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextResolveData {
    pub context: String,
    pub request: String,
    pub recursive: bool,
    pub reg_exp: Option<String>,
}

impl WaterfallValue for ContextResolveData {}

impl From<RawContextResolveData> for ContextResolveData {
    fn from(raw: RawContextResolveData) -> Self {
        Self {
            context: raw.context,
            request: raw.request,
            recursive: raw.recursive,
            reg_exp: raw.reg_exp,
        }
    }
}

impl From<ContextResolveData> for RawContextResolveData {
    fn from(data: ContextResolveData) -> Self {
        Self {
            context: data.context,
            request: data.request,
            recursive: data.recursive,
            reg_exp: data.reg_exp,
        }
    }
}

pub struct ContextModuleFactoryHooks {
    registry: HookRegistry,
    /// Return `Some(None)` to ignore the context dependency.
    pub before_resolve:
        Hook<Option<ContextResolveData>, Option<Option<ContextResolveData>>>,
}

impl ContextModuleFactoryHooks {
    fn new() -> Self {
        let registry = HookRegistry::new();
        Self {
            before_resolve: registry.add(Hook::async_series_waterfall("beforeResolve")),
            registry,
        }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }
}

/// Creates modules for context requests.
pub struct ContextModuleFactory {
    pub hooks: ContextModuleFactoryHooks,
}

impl ContextModuleFactory {
    pub(crate) fn new() -> Self {
        Self {
            hooks: ContextModuleFactoryHooks::new(),
        }
    }
}

/// The module factories of one compilation.
#[derive(Clone)]
pub struct CompilationParams {
    pub normal_module_factory: Arc<NormalModuleFactory>,
    pub context_module_factory: Arc<ContextModuleFactory>,
}

impl CompilationParams {
    pub(crate) fn new() -> Self {
        Self {
            normal_module_factory: Arc::new(NormalModuleFactory::new()),
            context_module_factory: Arc::new(ContextModuleFactory::new()),
        }
    }
}

impl std::fmt::Debug for CompilationParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationParams").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_round_trips_through_context_info() {
        let raw = RawResolveData {
            request: "./a".to_string(),
            context: "/src".to_string(),
            issuer: None,
        };
        let data = ResolveData::from(raw.clone());
        assert_eq!(data.context_info.issuer, "");
        assert_eq!(data.into_raw(), raw);

        let raw = RawResolveData {
            issuer: Some("/src/index.js".to_string()),
            ..raw
        };
        assert_eq!(ResolveData::from(raw.clone()).into_raw(), raw);
    }
}
