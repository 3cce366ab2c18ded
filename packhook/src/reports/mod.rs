//! Report data structures for commands.
//!
//! Commands build reports, then render them to an Output target.

mod build;
mod check;
mod hooks;
mod output;

pub use build::BuildReport;
pub use check::CheckReport;
pub use hooks::HooksReport;
pub use output::{Report, TerminalOutput};
