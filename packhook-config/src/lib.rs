//! Compiler options for packhook.
//!
//! Options are read from a `packhook.toml` file, completed with defaults and
//! validated. Errors carry the source text so they render as labelled
//! miette reports.

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod entry;
mod error;
mod options;
mod parse;
mod validate;
mod watch;

pub use entry::EntryDescription;
pub use error::{Error, Result, SourceContext};
pub use options::{CompilerOptions, Mode, OutputOptions, OutputOverrides, ResolveOptions};
pub use parse::{parse_file, parse_str, parse_str_with_filename};
pub use watch::{IgnoredPaths, WatchOptions};
