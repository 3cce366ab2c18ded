//! Watch mode: rebuild when files change.

use std::{collections::BTreeSet, path::PathBuf, sync::Arc, time::SystemTime};

use packhook_config::{IgnoredPaths, WatchOptions};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{Compiler, CompilerError, Stats};

/// Files that changed on disk since the last build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
    pub changed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl FileChanges {
    pub fn changed(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            changed: paths.into_iter().map(Into::into).collect(),
            removed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
struct WatchingState {
    invalid: bool,
    suspended: bool,
    closed: bool,
    changed: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
}

/// A watch session on a compiler.
///
/// File changes invalidate the session; the next [`Watching::build`]
/// rebuilds with every change collected since the previous one. The
/// [`Watching::watch`] loop drives this from a channel of changes.
pub struct Watching {
    compiler: Arc<Compiler>,
    options: WatchOptions,
    ignored: IgnoredPaths,
    state: Mutex<WatchingState>,
}

impl std::fmt::Debug for Watching {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watching")
            .field("options", &self.options)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Watching {
    pub(crate) fn new(
        compiler: Arc<Compiler>,
        options: WatchOptions,
        ignored: IgnoredPaths,
    ) -> Self {
        Self {
            compiler,
            options,
            ignored,
            state: Mutex::new(WatchingState::default()),
        }
    }

    pub fn compiler(&self) -> &Arc<Compiler> {
        &self.compiler
    }

    pub fn is_invalid(&self) -> bool {
        self.state.lock().invalid
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    /// Record changed files. Ignored paths are dropped.
    ///
    /// The first change after a build fires the compiler's `invalid` hook.
    ///
    /// # Errors
    ///
    /// Fails when an `invalid` listener fails.
    pub fn invalidate(&self, changes: FileChanges) -> Result<(), CompilerError> {
        let keep = |path: &PathBuf| !self.ignored.is_ignored(path);
        let changed: Vec<PathBuf> = changes.changed.into_iter().filter(keep).collect();
        let removed: Vec<PathBuf> = changes.removed.into_iter().filter(keep).collect();
        if changed.is_empty() && removed.is_empty() {
            return Ok(());
        }

        let first_file = changed.first().or(removed.first()).cloned();
        let fire = {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.changed.extend(changed);
            state.removed.extend(removed);
            !std::mem::replace(&mut state.invalid, true)
        };
        if fire {
            tracing::debug!(file = ?first_file, "invalidated");
            self.compiler
                .hooks
                .invalid
                .call((first_file, SystemTime::now()))?;
        }
        Ok(())
    }

    /// Rebuild with the changes collected so far.
    ///
    /// Like [`Compiler::run`], a finished build fires `afterDone` and a
    /// broken one fires `failed`.
    ///
    /// # Errors
    ///
    /// Fails when the session is closed or a hook listener fails.
    pub async fn build(&self) -> Result<Stats, CompilerError> {
        let (changed, removed) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(CompilerError::Closed);
            }
            state.invalid = false;
            (
                std::mem::take(&mut state.changed),
                std::mem::take(&mut state.removed),
            )
        };
        let compiler = &self.compiler;
        compiler.set_file_changes(changed, removed);
        let result = self.rebuild().await;
        compiler.go_idle();
        compiler.report_result(result)
    }

    async fn rebuild(&self) -> Result<Stats, CompilerError> {
        let compiler = &self.compiler;
        compiler.scheduler().leave_idle(compiler.cache()).await?;
        compiler.hooks.watch_run.call_async(compiler.clone()).await?;
        compiler.build_cycle().await
    }

    /// Keep collecting changes without rebuilding.
    pub fn suspend(&self) {
        self.state.lock().suspended = true;
    }

    pub fn resume(&self) {
        self.state.lock().suspended = false;
    }

    /// End the session and release the compiler.
    ///
    /// # Errors
    ///
    /// Fails when a `watchClose` listener fails.
    pub fn close(&self) -> Result<(), CompilerError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
        }
        self.compiler.scheduler().finish();
        self.compiler.hooks.watch_close.call(())?;
        Ok(())
    }

    /// Build once, then rebuild whenever changes arrive on `changes`.
    ///
    /// Changes arriving within the aggregate timeout of each other are
    /// batched into one rebuild. Each build result goes to `handler`. The
    /// loop ends when the channel closes or the session is closed.
    pub async fn watch<F>(&self, mut changes: mpsc::Receiver<FileChanges>, mut handler: F)
    where
        F: FnMut(Result<Stats, CompilerError>) + Send,
    {
        handler(self.build().await);
        let timeout = self.options.aggregate_timeout();
        while let Some(first) = changes.recv().await {
            if let Err(err) = self.invalidate(first) {
                handler(Err(err));
            }
            while let Ok(Some(next)) = tokio::time::timeout(timeout, changes.recv()).await {
                if let Err(err) = self.invalidate(next) {
                    handler(Err(err));
                }
            }
            if self.is_closed() {
                break;
            }
            if self.is_suspended() || !self.is_invalid() {
                continue;
            }
            handler(self.build().await);
        }
    }
}
