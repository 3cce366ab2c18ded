use std::sync::Arc;

use packhook_config::OutputOverrides;

use super::{Compiler, Shared};
use crate::{CompilerError, CoreError, Plugin, RunMode, compilation::Compilation};

/// Compiler hooks a child compiler does not inherit from its parent.
pub const CHILD_EXCLUDED_HOOKS: [&str; 7] = [
    "make",
    "compile",
    "emit",
    "afterEmit",
    "invalid",
    "done",
    "thisCompilation",
];

/// How to set up a child compiler.
pub struct ChildCompilerOptions {
    pub name: String,
    /// Position among the parent compilation's children of the same name.
    /// Assigned automatically when `None`.
    pub index: Option<usize>,
    pub output: OutputOverrides,
    pub plugins: Vec<Arc<dyn Plugin>>,
    /// Entry to build as a plain include instead of an entrypoint.
    pub container_name: Option<String>,
}

impl ChildCompilerOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            output: OutputOverrides::default(),
            plugins: Vec::new(),
            container_name: None,
        }
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn output(mut self, output: OutputOverrides) -> Self {
        self.output = output;
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }
}

/// The result of [`Compiler::run_as_child`].
pub struct ChildRunOutput {
    /// Files of the child's entrypoints.
    pub entries: Vec<String>,
    pub compilation: Arc<Compilation>,
}

impl Compiler {
    /// Create a child compiler for `compilation`.
    ///
    /// The child shares the cache, resolver factory and input filesystem of
    /// this compiler but writes nothing to disk. It inherits the taps of
    /// every compiler hook except [`CHILD_EXCLUDED_HOOKS`].
    ///
    /// # Errors
    ///
    /// Fails when one of the child's plugins or a `childCompiler` listener
    /// fails.
    pub fn create_child_compiler(
        self: &Arc<Self>,
        compilation: &Arc<Compilation>,
        options: ChildCompilerOptions,
    ) -> Result<Arc<Compiler>, CompilerError> {
        let ChildCompilerOptions {
            name,
            index,
            output,
            plugins,
            container_name,
        } = options;
        let index = index.unwrap_or_else(|| compilation.next_child_index(&name));

        let mut child_options = self.options.with_output_overrides(&output);
        child_options.name = Some(name.clone());
        if let Some(container) = container_name.as_deref() {
            if child_options.hoist_entry(container) {
                tracing::debug!(container, child = %name, "building container entry as include");
            }
        }

        let shared = Shared {
            cache: self.shared.cache.clone(),
            resolver_factory: self.shared.resolver_factory.clone(),
            input_fs: self.shared.input_fs.clone(),
            output_fs: None,
            core_factory: self.shared.core_factory.clone(),
        };
        let child = Compiler::assemble(
            Arc::new(child_options),
            format!("{}{}|{}|", self.compiler_path, name, index),
            Some(self.root()),
            Some(Arc::downgrade(compilation)),
            shared,
        );
        child
            .hooks
            .registry()
            .inherit_from(self.hooks.registry(), &CHILD_EXCLUDED_HOOKS);
        child.apply_plugins(&plugins)?;
        compilation
            .hooks
            .child_compiler
            .call((child.clone(), name, index))?;
        Ok(child)
    }

    /// Build this child compiler and hand its assets to the parent
    /// compilation.
    ///
    /// This runs one compilation only. No `beforeRun`, `run` or `done`
    /// listeners fire and the shared cache stays awake.
    ///
    /// Errors of the child build stay on the child compilation, which is
    /// added to the parent's children.
    ///
    /// # Errors
    ///
    /// Fails when this is not a child compiler, the parent compilation is
    /// gone, the compile fails, or an asset conflicts with a parent asset.
    pub async fn run_as_child(self: &Arc<Self>) -> Result<ChildRunOutput, CompilerError> {
        let parent = self
            .parent_compilation()
            .ok_or_else(|| CompilerError::NotAChild {
                name: self.name().unwrap_or_default().to_string(),
            })?;
        // A single compilation: the run hooks and the cache idle cycle
        // belong to the parent's build.
        self.scheduler.begin(RunMode::Run)?;
        let compiled = self.compile().await;
        self.scheduler.finish();
        let compilation = compiled?;
        parent.push_child(compilation.clone());

        for asset in compilation.get_assets() {
            let result = if parent.get_asset(&asset.name).is_some() {
                parent.update_asset(&asset.name, asset.source, Some(asset.info))
            } else {
                parent.emit_asset(&asset.name, asset.source, asset.info)
            };
            result.map_err(CoreError::from)?;
        }

        let mut entries: Vec<String> = Vec::new();
        for entrypoint in compilation.entrypoints() {
            for file in entrypoint.files() {
                if !entries.contains(file) {
                    entries.push(file.clone());
                }
            }
        }
        Ok(ChildRunOutput {
            entries,
            compilation,
        })
    }
}
