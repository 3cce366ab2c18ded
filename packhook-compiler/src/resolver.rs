use packhook_config::ResolveOptions;
use packhook_hooks::{Hook, HookResult, WaterfallValue};

/// Resolve options for one kind of dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptionsWithDependencyType {
    pub dependency_type: String,
    pub options: ResolveOptions,
}

impl WaterfallValue for ResolveOptionsWithDependencyType {}

pub struct ResolverFactoryHooks {
    /// Rewrite the resolve options used for a dependency type.
    pub resolve_options:
        Hook<ResolveOptionsWithDependencyType, Option<ResolveOptionsWithDependencyType>>,
}

/// Hands out resolve options per dependency type. Shared by a compiler and
/// its children.
pub struct ResolverFactory {
    options: ResolveOptions,
    pub hooks: ResolverFactoryHooks,
}

impl ResolverFactory {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            hooks: ResolverFactoryHooks {
                resolve_options: Hook::sync_waterfall("resolveOptions"),
            },
        }
    }

    pub fn base_options(&self) -> &ResolveOptions {
        &self.options
    }

    /// The resolve options for `dependency_type` after every
    /// `resolveOptions` listener had its say.
    pub fn options_for(&self, dependency_type: &str) -> HookResult<ResolveOptions> {
        let value = ResolveOptionsWithDependencyType {
            dependency_type: dependency_type.to_string(),
            options: self.options.clone(),
        };
        Ok(self.hooks.resolve_options.call_waterfall(value)?.options)
    }
}
