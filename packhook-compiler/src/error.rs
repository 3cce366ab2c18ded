use std::path::PathBuf;

use miette::Diagnostic;
use packhook_core::{AssetError, Version};
use packhook_hooks::{HookError, ListenerError};
use thiserror::Error;

use crate::{BridgeHook, ProcessAssetsStage};

/// A callback arrived in an order the compilation lifecycle does not allow.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("'{hook}' was called before 'thisCompilation'")]
    NotStarted { hook: String },

    #[error("'{hook}' was called after the compilation finished")]
    Finished { hook: String },

    #[error("processAssets stage {stage} fired after stage {previous}")]
    StageOrder {
        stage: ProcessAssetsStage,
        previous: ProcessAssetsStage,
    },
}

impl PipelineError {
    pub(crate) fn not_started(hook: BridgeHook) -> Self {
        Self::NotStarted {
            hook: hook.to_string(),
        }
    }

    pub(crate) fn finished(hook: BridgeHook) -> Self {
        Self::Finished {
            hook: hook.to_string(),
        }
    }
}

/// An error returned to the build core from one of its callbacks.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("'{hook}' was called without a live compilation")]
    NoCompilation { hook: String },

    #[error("the compiler was dropped while its build core was still running")]
    CompilerDropped,
}

/// An error raised by a build core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Callback(#[from] BridgeError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("failed to write '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl From<HookError> for CoreError {
    fn from(err: HookError) -> Self {
        CoreError::Callback(BridgeError::Hook(err))
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CompilerError {
    #[error(
        "You ran the compiler while it was already running. Wait until the current build has finished before starting another one."
    )]
    #[diagnostic(
        code(packhook::concurrent_compilation),
        help("a compiler runs one build at a time; create a second compiler for parallel builds")
    )]
    ConcurrentCompilation,

    #[error("the compiler has been closed")]
    #[diagnostic(code(packhook::closed))]
    Closed,

    #[error("build core speaks protocol {found}, but this compiler requires {expected}")]
    #[diagnostic(
        code(packhook::incompatible_core),
        help("install a build core whose major and minor version match {expected}")
    )]
    IncompatibleCore { expected: Version, found: Version },

    #[error("failed to start the build core: {0}")]
    #[diagnostic(code(packhook::core_start))]
    CoreStart(#[source] CoreError),

    #[error(transparent)]
    #[diagnostic(code(packhook::hook))]
    Hook(#[from] HookError),

    #[error(transparent)]
    #[diagnostic(code(packhook::build))]
    Core(#[from] CoreError),

    #[error("plugin '{plugin}' failed to apply: {error}")]
    #[diagnostic(code(packhook::plugin))]
    Plugin {
        plugin: String,
        error: ListenerError,
    },

    #[error("the build core finished without creating a compilation")]
    #[diagnostic(code(packhook::missing_compilation))]
    MissingCompilation,

    #[error("invalid ignored path pattern")]
    #[diagnostic(code(packhook::ignored_pattern))]
    IgnoredPattern(#[source] globset::Error),

    #[error("'{name}' is not a child compiler")]
    #[diagnostic(code(packhook::not_a_child))]
    NotAChild { name: String },
}

impl CompilerError {
    pub(crate) fn plugin(plugin: &str, report: eyre::Report) -> Self {
        Self::Plugin {
            plugin: plugin.to_string(),
            error: ListenerError::new(report),
        }
    }
}
