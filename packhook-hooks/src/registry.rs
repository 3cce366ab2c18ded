//! A named registry of hooks.
//!
//! Compiler and compilation hook containers register every hook they own
//! here, so hooks can be looked up, tapped and emitted by name, inspected
//! for listeners, and copied wholesale into child compilers.
//!
//! # Example
//!
//! ```ignore
//! let registry = HookRegistry::new();
//! let done: Hook<u32> = registry.add(Hook::async_series("done"));
//!
//! registry.tap::<u32, (), _>("done", "StatsPlugin", |n| {
//!     println!("{n} modules");
//!     Ok(())
//! })?;
//! registry.emit_async::<u32, ()>("done", 3).await?;
//! ```

use std::{any::Any, future::Future, sync::Arc};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{Discipline, Hook, HookError, HookOutput, HookResult, TapOptions};

/// Type-erased view of a [`Hook`].
pub trait ErasedHook: Send + Sync {
    fn name(&self) -> &str;
    fn discipline(&self) -> Discipline;
    fn is_used(&self) -> bool;
    fn tap_names(&self) -> Vec<String>;
    fn is_intercepted(&self) -> bool;
    fn trace(&self);

    /// Copy the taps of `other` if it has the same argument and result types.
    fn inherit_taps_from(&self, other: &dyn ErasedHook) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Owns a set of hooks keyed by name, in registration order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<IndexMap<String, Arc<dyn ErasedHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing hook under its own name and return it.
    ///
    /// A previously registered hook with the same name is replaced.
    pub fn add<A, R>(&self, hook: Hook<A, R>) -> Hook<A, R>
    where
        A: Clone + Send + 'static,
        R: HookOutput,
    {
        let name = hook.name().to_string();
        if self
            .hooks
            .write()
            .insert(name.clone(), Arc::new(hook.clone()))
            .is_some()
        {
            tracing::debug!(hook = %name, "replaced registered hook");
        }
        hook
    }

    /// Get the hook named `name`, creating it with `discipline` if missing.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::TypeMismatch`] when the name is taken by a hook
    /// with different argument or result types.
    pub fn register<A, R>(&self, name: &str, discipline: Discipline) -> HookResult<Hook<A, R>>
    where
        A: Clone + Send + 'static,
        R: HookOutput,
    {
        if let Ok(hook) = self.get::<A, R>(name) {
            return Ok(hook);
        }
        if self.hooks.read().contains_key(name) {
            return Err(HookError::TypeMismatch {
                name: name.to_string(),
            });
        }
        Ok(self.add(Hook::new(name, discipline)))
    }

    /// Look up a typed handle.
    pub fn get<A, R>(&self, name: &str) -> HookResult<Hook<A, R>>
    where
        A: Clone + Send + 'static,
        R: HookOutput,
    {
        let hooks = self.hooks.read();
        let erased = hooks.get(name).ok_or_else(|| HookError::UnknownHook {
            name: name.to_string(),
        })?;
        erased
            .as_any()
            .downcast_ref::<Hook<A, R>>()
            .cloned()
            .ok_or_else(|| HookError::TypeMismatch {
                name: name.to_string(),
            })
    }

    pub fn get_erased(&self, name: &str) -> Option<Arc<dyn ErasedHook>> {
        self.hooks.read().get(name).cloned()
    }

    pub fn tap<A, R, F>(&self, name: &str, options: impl Into<TapOptions>, f: F) -> HookResult<()>
    where
        A: Clone + Send + 'static,
        R: HookOutput,
        F: Fn(A) -> eyre::Result<R> + Send + Sync + 'static,
    {
        self.get::<A, R>(name)?.tap(options, f)
    }

    pub fn tap_async<A, R, F, Fut>(
        &self,
        name: &str,
        options: impl Into<TapOptions>,
        f: F,
    ) -> HookResult<()>
    where
        A: Clone + Send + 'static,
        R: HookOutput,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<R>> + Send + 'static,
    {
        self.get::<A, R>(name)?.tap_async(options, f)
    }

    pub fn emit<A, R>(&self, name: &str, args: A) -> HookResult<R>
    where
        A: Clone + Send + 'static,
        R: HookOutput,
    {
        self.get::<A, R>(name)?.call(args)
    }

    pub async fn emit_async<A, R>(&self, name: &str, args: A) -> HookResult<R>
    where
        A: Clone + Send + 'static,
        R: HookOutput,
    {
        let hook = self.get::<A, R>(name)?;
        hook.call_async(args).await
    }

    /// Names of every registered hook, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.hooks.read().keys().cloned().collect()
    }

    /// Every registered hook, in registration order.
    pub fn hooks(&self) -> Vec<Arc<dyn ErasedHook>> {
        self.hooks.read().values().cloned().collect()
    }

    /// Names of hooks without listeners.
    pub fn unused(&self) -> Vec<String> {
        self.hooks
            .read()
            .iter()
            .filter(|(_, hook)| !hook.is_used())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Copy the taps of every hook in `parent`, except the `excluded` names.
    ///
    /// Hooks missing from this registry or typed differently are skipped.
    pub fn inherit_from(&self, parent: &HookRegistry, excluded: &[&str]) {
        for parent_hook in parent.hooks() {
            let name = parent_hook.name();
            if excluded.contains(&name) {
                continue;
            }
            let Some(own) = self.get_erased(name) else {
                continue;
            };
            if !own.inherit_taps_from(parent_hook.as_ref()) {
                tracing::warn!(hook = %name, "cannot inherit taps from a differently typed hook");
            }
        }
    }

    /// Install a tracing interceptor on every hook.
    pub fn trace_all(&self) {
        for hook in self.hooks() {
            hook.trace();
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_register_returns_same_hook() {
        let registry = HookRegistry::new();
        let a: Hook<u32> = registry.register("compile", Discipline::Sync).unwrap();
        let b: Hook<u32> = registry.register("compile", Discipline::Sync).unwrap();
        a.tap("p", |_| Ok(())).unwrap();
        assert!(b.is_used());
    }

    #[test]
    fn test_register_type_mismatch() {
        let registry = HookRegistry::new();
        let _: Hook<u32> = registry.register("compile", Discipline::Sync).unwrap();
        let err = registry
            .register::<String, ()>("compile", Discipline::Sync)
            .unwrap_err();
        assert!(matches!(err, HookError::TypeMismatch { .. }));
    }

    #[test]
    fn test_tap_and_emit_by_name() {
        let registry = HookRegistry::new();
        registry.add(Hook::<u32, Option<u32>>::sync_bail("pick"));
        registry
            .tap::<u32, Option<u32>, _>("pick", "double", |x| Ok(Some(x * 2)))
            .unwrap();
        assert_eq!(registry.emit::<u32, Option<u32>>("pick", 4).unwrap(), Some(8));
    }

    #[test]
    fn test_unknown_hook() {
        let registry = HookRegistry::new();
        let err = registry.emit::<(), ()>("nope", ()).unwrap_err();
        assert!(matches!(err, HookError::UnknownHook { .. }));
    }

    #[tokio::test]
    async fn test_emit_async_by_name() {
        let registry = HookRegistry::new();
        registry.add(Hook::<(), ()>::async_series("done"));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        registry
            .tap_async::<(), (), _, _>("done", "count", move |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();
        registry.emit_async::<(), ()>("done", ()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unused_lists_hooks_without_taps() {
        let registry = HookRegistry::new();
        let make = registry.add(Hook::<()>::async_parallel("make"));
        registry.add(Hook::<()>::sync("compile"));
        assert_eq!(registry.unused(), vec!["make", "compile"]);
        make.tap("entry", |_| Ok(())).unwrap();
        assert_eq!(registry.unused(), vec!["compile"]);
    }

    #[test]
    fn test_inherit_from_skips_excluded() {
        let parent = HookRegistry::new();
        parent
            .add(Hook::<()>::sync("compilation"))
            .tap("shared", |_| Ok(()))
            .unwrap();
        parent
            .add(Hook::<()>::async_parallel("make"))
            .tap("entry", |_| Ok(()))
            .unwrap();

        let child = HookRegistry::new();
        let compilation = child.add(Hook::<()>::sync("compilation"));
        let make = child.add(Hook::<()>::async_parallel("make"));
        child.inherit_from(&parent, &["make"]);

        assert_eq!(compilation.tap_names(), vec!["shared"]);
        assert!(!make.is_used());
    }
}
