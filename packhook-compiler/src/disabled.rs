//! Tells the build core which callbacks it may skip.

use parking_lot::Mutex;

use crate::{BridgeHook, Compiler};

/// Keeps the build core's disabled callback set in sync with the hooks.
///
/// A callback is disabled while no listener would observe it. The set is
/// pushed to the core only when it changed since the last push.
#[derive(Debug, Default)]
pub struct DisabledHookTracker {
    pushed: Mutex<Vec<BridgeHook>>,
}

impl DisabledHookTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The callbacks nothing currently listens to, in build order.
    pub fn compute(compiler: &Compiler) -> Vec<BridgeHook> {
        let compilation = compiler.current_compilation();
        let params = compiler.compilation_params();
        BridgeHook::all()
            .into_iter()
            .filter(|hook| !hook.is_used(compiler, compilation.as_deref(), params.as_ref()))
            .collect()
    }

    /// Recompute the set and push it to the core if it changed.
    ///
    /// Does nothing but compute while the compiler has no core yet.
    pub fn recompute(&self, compiler: &Compiler) -> Vec<BridgeHook> {
        let disabled = Self::compute(compiler);
        let Some(core) = compiler.core() else {
            return disabled;
        };
        let mut pushed = self.pushed.lock();
        if *pushed != disabled {
            tracing::trace!(count = disabled.len(), "pushing disabled hooks");
            core.set_disabled_hooks(&disabled);
            *pushed = disabled.clone();
        }
        disabled
    }

    /// The set last pushed to the core.
    pub fn pushed(&self) -> Vec<BridgeHook> {
        self.pushed.lock().clone()
    }
}
