//! Ordering of build core callbacks within one compilation.

use parking_lot::Mutex;

use crate::{BridgeHook, PipelineError, ProcessAssetsStage};

/// Where a compilation is in its lifecycle.
///
/// States only move forward within a compilation; `thisCompilation` starts
/// the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Compiling,
    BuildingModules,
    FinishingMake,
    Sealing,
    Emitting,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_finished(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl BridgeHook {
    /// The state a compilation is in while this callback runs.
    pub fn state(self) -> PipelineState {
        match self {
            BridgeHook::ThisCompilation | BridgeHook::Compilation | BridgeHook::Make => {
                PipelineState::Compiling
            }
            BridgeHook::BeforeResolve
            | BridgeHook::AfterResolve
            | BridgeHook::ContextModuleBeforeResolve
            | BridgeHook::BuildModule
            | BridgeHook::StillValidModule
            | BridgeHook::SucceedModule => PipelineState::BuildingModules,
            BridgeHook::FinishMake | BridgeHook::FinishModules => PipelineState::FinishingMake,
            BridgeHook::Seal
            | BridgeHook::OptimizeModules
            | BridgeHook::AfterOptimizeModules
            | BridgeHook::OptimizeTree
            | BridgeHook::OptimizeChunkModules
            | BridgeHook::ChunkAsset
            | BridgeHook::ProcessAssets(_)
            | BridgeHook::AfterProcessAssets
            | BridgeHook::AfterSeal => PipelineState::Sealing,
            BridgeHook::ShouldEmit
            | BridgeHook::Emit
            | BridgeHook::AssetEmitted
            | BridgeHook::AfterEmit => PipelineState::Emitting,
        }
    }
}

#[derive(Debug, Default)]
struct PipelineInner {
    state: PipelineState,
    started: bool,
    stages: Vec<ProcessAssetsStage>,
}

/// Tracks the callbacks of the current compilation and rejects out of order
/// ones.
///
/// Module callbacks may interleave with `make`, so a callback belonging to an
/// earlier state than the current one is accepted without moving the state
/// back. Process-assets stages must strictly ascend.
#[derive(Debug, Default)]
pub struct CompilationPipeline {
    inner: Mutex<PipelineInner>,
}

impl CompilationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PipelineState {
        self.inner.lock().state
    }

    /// The process-assets stages fired so far in this compilation.
    pub fn stages(&self) -> Vec<ProcessAssetsStage> {
        self.inner.lock().stages.clone()
    }

    /// Reset for a new build.
    pub fn begin(&self) {
        *self.inner.lock() = PipelineInner::default();
    }

    /// Record that `hook` is about to run.
    ///
    /// # Errors
    ///
    /// Fails when `hook` arrives before `thisCompilation`, after the
    /// compilation finished, or at a process-assets stage that is not
    /// strictly later than the previous one.
    pub fn advance(&self, hook: BridgeHook) -> Result<PipelineState, PipelineError> {
        let mut inner = self.inner.lock();
        if hook == BridgeHook::ThisCompilation {
            *inner = PipelineInner {
                state: PipelineState::Compiling,
                started: true,
                stages: Vec::new(),
            };
            return Ok(inner.state);
        }
        if inner.state.is_finished() {
            return Err(PipelineError::finished(hook));
        }
        if !inner.started {
            return Err(PipelineError::not_started(hook));
        }
        if let BridgeHook::ProcessAssets(stage) = hook {
            if let Some(&previous) = inner.stages.last() {
                if stage <= previous {
                    return Err(PipelineError::StageOrder { stage, previous });
                }
            }
            inner.stages.push(stage);
        }
        inner.state = inner.state.max(hook.state());
        Ok(inner.state)
    }

    /// Mark the compilation as complete unless it already failed.
    pub fn finish(&self) {
        let mut inner = self.inner.lock();
        if inner.state != PipelineState::Failed {
            inner.state = PipelineState::Done;
        }
    }

    pub fn fail(&self) {
        self.inner.lock().state = PipelineState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> CompilationPipeline {
        let pipeline = CompilationPipeline::new();
        pipeline.begin();
        pipeline
            .advance(BridgeHook::ThisCompilation)
            .expect("thisCompilation always starts a compilation");
        pipeline
    }

    #[test]
    fn test_callbacks_before_this_compilation_rejected() {
        let pipeline = CompilationPipeline::new();
        let err = pipeline.advance(BridgeHook::Compilation).unwrap_err();
        assert_eq!(
            err,
            PipelineError::NotStarted {
                hook: "compilation".to_string()
            }
        );
    }

    #[test]
    fn test_states_move_forward() {
        let pipeline = started();
        assert_eq!(
            pipeline.advance(BridgeHook::Make).unwrap(),
            PipelineState::Compiling
        );
        assert_eq!(
            pipeline.advance(BridgeHook::BuildModule).unwrap(),
            PipelineState::BuildingModules
        );
        assert_eq!(
            pipeline.advance(BridgeHook::Seal).unwrap(),
            PipelineState::Sealing
        );
        // Late module callbacks do not move the state back.
        assert_eq!(
            pipeline.advance(BridgeHook::SucceedModule).unwrap(),
            PipelineState::Sealing
        );
        assert_eq!(
            pipeline.advance(BridgeHook::AfterEmit).unwrap(),
            PipelineState::Emitting
        );
    }

    #[test]
    fn test_process_assets_stages_must_ascend() {
        let pipeline = started();
        pipeline
            .advance(BridgeHook::ProcessAssets(ProcessAssetsStage::ADDITIONAL))
            .unwrap();
        pipeline
            .advance(BridgeHook::ProcessAssets(ProcessAssetsStage::OPTIMIZE))
            .unwrap();

        let err = pipeline
            .advance(BridgeHook::ProcessAssets(ProcessAssetsStage::OPTIMIZE))
            .unwrap_err();
        assert!(matches!(err, PipelineError::StageOrder { .. }));

        let err = pipeline
            .advance(BridgeHook::ProcessAssets(ProcessAssetsStage::DERIVED))
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::StageOrder {
                stage: ProcessAssetsStage::DERIVED,
                previous: ProcessAssetsStage::OPTIMIZE,
            }
        );
        assert_eq!(
            pipeline.stages(),
            vec![ProcessAssetsStage::ADDITIONAL, ProcessAssetsStage::OPTIMIZE]
        );
    }

    #[test]
    fn test_callbacks_after_done_rejected_until_next_compilation() {
        let pipeline = started();
        pipeline.finish();
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert!(pipeline.advance(BridgeHook::Emit).is_err());

        pipeline.advance(BridgeHook::ThisCompilation).unwrap();
        assert!(pipeline.advance(BridgeHook::Make).is_ok());
    }

    #[test]
    fn test_finish_keeps_failure() {
        let pipeline = started();
        pipeline.fail();
        pipeline.finish();
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }
}
