use std::sync::Arc;

use crate::Compiler;

/// An extension that taps into a compiler's hooks.
///
/// Plugins are applied once, in order, when the compiler is built. Child
/// compilers get the plugins given in their own options.
pub trait Plugin: Send + Sync {
    /// The name used in error messages. Usually also the tap name.
    fn name(&self) -> &'static str;

    /// Register listeners on `compiler`.
    fn apply(&self, compiler: &Arc<Compiler>) -> eyre::Result<()>;
}
