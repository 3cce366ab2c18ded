//! One build at a time per compiler, and the cache idle cycle between builds.

use parking_lot::Mutex;

use crate::{Cache, CompilerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Run,
    Watch,
}

#[derive(Debug, Default)]
struct SchedulerState {
    running: bool,
    watch_mode: bool,
    /// The cache is idle: `endIdle` must run before the next build.
    idle: bool,
    closed: bool,
}

/// Guards a compiler against overlapping builds.
///
/// A second `run` or `watch` while one is active fails with
/// [`CompilerError::ConcurrentCompilation`] and leaves the active one alone.
#[derive(Debug, Default)]
pub struct RunScheduler {
    state: Mutex<SchedulerState>,
}

impl RunScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        if self.state.lock().running {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn is_watch_mode(&self) -> bool {
        self.state.lock().watch_mode
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().idle
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Claim the compiler for a run or a watch session.
    ///
    /// # Errors
    ///
    /// Fails when the compiler is closed or already running.
    pub fn begin(&self, mode: RunMode) -> Result<(), CompilerError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CompilerError::Closed);
        }
        if state.running {
            return Err(CompilerError::ConcurrentCompilation);
        }
        state.running = true;
        state.watch_mode = mode == RunMode::Watch;
        Ok(())
    }

    /// Wake the cache up when it went idle after the previous build.
    pub async fn leave_idle(&self, cache: &Cache) -> Result<(), CompilerError> {
        if !self.is_idle() {
            return Ok(());
        }
        cache.end_idle().await?;
        self.state.lock().idle = false;
        Ok(())
    }

    /// Let the cache go idle after a build.
    ///
    /// The scheduler only counts as idle once every `beginIdle` listener
    /// succeeded.
    pub fn enter_idle(&self, cache: &Cache) -> Result<(), CompilerError> {
        cache.begin_idle()?;
        self.state.lock().idle = true;
        Ok(())
    }

    /// Release the compiler.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        state.running = false;
        state.watch_mode = false;
    }

    pub fn close(&self) {
        self.state.lock().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn test_second_begin_rejected_while_running() {
        let scheduler = RunScheduler::new();
        scheduler.begin(RunMode::Run).unwrap();
        let err = scheduler.begin(RunMode::Watch).unwrap_err();
        assert!(matches!(err, CompilerError::ConcurrentCompilation));
        assert!(!scheduler.is_watch_mode());

        scheduler.finish();
        scheduler.begin(RunMode::Watch).unwrap();
        assert!(scheduler.is_watch_mode());
    }

    #[test]
    fn test_closed_rejects_begin() {
        let scheduler = RunScheduler::new();
        scheduler.close();
        assert!(matches!(
            scheduler.begin(RunMode::Run),
            Err(CompilerError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_end_idle_only_after_begin_idle() {
        let cache = Cache::new();
        let ended = Arc::new(AtomicUsize::new(0));
        let counter = ended.clone();
        cache
            .hooks
            .end_idle
            .tap_async("Count", move |()| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        let scheduler = RunScheduler::new();
        scheduler.leave_idle(&cache).await.unwrap();
        assert_eq!(ended.load(Ordering::SeqCst), 0);

        scheduler.enter_idle(&cache).unwrap();
        scheduler.leave_idle(&cache).await.unwrap();
        scheduler.leave_idle(&cache).await.unwrap();
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_begin_idle_runs_before_idle_flag() {
        let cache = Cache::new();
        let scheduler = Arc::new(RunScheduler::new());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (observed, watched) = (seen.clone(), scheduler.clone());
        cache
            .hooks
            .begin_idle
            .tap("Observe", move |()| {
                observed.lock().push(watched.is_idle());
                Ok(())
            })
            .unwrap();

        scheduler.enter_idle(&cache).unwrap();
        assert_eq!(*seen.lock(), vec![false]);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_failed_begin_idle_leaves_scheduler_awake() {
        let cache = Cache::new();
        cache
            .hooks
            .begin_idle
            .tap("Thrower", |()| Err(eyre::eyre!("disk full")))
            .unwrap();

        let scheduler = RunScheduler::new();
        assert!(scheduler.enter_idle(&cache).is_err());
        assert!(!scheduler.is_idle());
    }
}
