use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Args;
use eyre::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, new_debouncer};
use packhook_compiler::FileChanges;
use packhook_config::parse_file;
use tokio::sync::mpsc;

use super::{UnwrapOrExit, create_compiler};
use crate::reports::{BuildReport, Report, TerminalOutput};

#[derive(Args)]
pub struct WatchCommand {
    /// Path to packhook.toml (defaults to ./packhook.toml)
    #[arg(short, long, default_value = "packhook.toml")]
    pub config: PathBuf,

    /// How long file events settle before they are reported, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub debounce: u64,
}

impl WatchCommand {
    pub async fn run(&self) -> Result<()> {
        let options = parse_file(&self.config).unwrap_or_exit();
        let root = options.context.clone();
        let output = options.output.path.clone();
        let watch_options = options.watch.clone();
        let compiler = create_compiler(options)?;
        let watching = compiler.watch(watch_options)?;

        let (tx, rx) = mpsc::channel(16);
        let mut debouncer = new_debouncer(
            Duration::from_millis(self.debounce),
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let paths = events
                        .into_iter()
                        .filter(|event| matches!(event.kind, DebouncedEventKind::Any))
                        .map(|event| event.path);
                    if let Some(changes) = file_changes(&output, paths) {
                        // The receiver is gone once the watch loop ended.
                        let _ = tx.blocking_send(changes);
                    }
                }
                Err(err) => tracing::warn!(error = %err, "file watcher failed"),
            },
        )?;
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for changes");

        let handler = |result| match result {
            Ok(stats) => BuildReport::from_stats(&stats).render(&mut TerminalOutput::new()),
            Err(err) => eprintln!("{:?}", miette::Report::new(err)),
        };
        tokio::select! {
            _ = watching.watch(rx, handler) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted, closing watch session");
            }
        }

        drop(debouncer);
        compiler.close().await?;
        Ok(())
    }
}

/// Split changed paths into changed and removed files.
///
/// Files under `output` are emitted by the build itself and never trigger a
/// rebuild.
fn file_changes(output: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Option<FileChanges> {
    let mut changes = FileChanges::default();
    for path in paths {
        if path.starts_with(output) {
            continue;
        }
        if path.exists() {
            changes.changed.push(path);
        } else {
            changes.removed.push(path);
        }
    }
    changes.changed.sort();
    changes.changed.dedup();
    changes.removed.sort();
    changes.removed.dedup();
    (!changes.is_empty()).then_some(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_changes_split_by_existence() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("src/index.js");
        std::fs::create_dir_all(kept.parent().unwrap()).unwrap();
        std::fs::write(&kept, "console.log('main');").unwrap();
        let gone = dir.path().join("src/old.js");
        let emitted = dir.path().join("dist/main.js");

        let changes = file_changes(
            &dir.path().join("dist"),
            [kept.clone(), gone.clone(), emitted, kept.clone()],
        )
        .unwrap();

        assert_eq!(changes.changed, vec![kept]);
        assert_eq!(changes.removed, vec![gone]);
    }

    #[test]
    fn test_output_only_changes_are_dropped() {
        let output = Path::new("/app/dist");
        assert!(file_changes(output, [PathBuf::from("/app/dist/main.js")]).is_none());
        assert!(file_changes(output, Vec::new()).is_none());
    }
}
