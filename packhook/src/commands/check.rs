use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use packhook_config::parse_file;

use super::UnwrapOrExit;
use crate::reports::{CheckReport, Report, TerminalOutput};

#[derive(Args)]
pub struct CheckCommand {
    /// Path to packhook.toml (defaults to ./packhook.toml)
    #[arg(short, long, default_value = "packhook.toml")]
    pub config: PathBuf,
}

impl CheckCommand {
    pub fn run(&self) -> Result<()> {
        let options = parse_file(&self.config).unwrap_or_exit();
        let report = CheckReport::new(&self.config, &options);
        report.render(&mut TerminalOutput::new());
        Ok(())
    }
}
