use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use packhook_compiler::StatsOptions;
use packhook_config::parse_file;

use super::{UnwrapOrExit, create_compiler};
use crate::reports::{BuildReport, Report, TerminalOutput};

#[derive(Args)]
pub struct BuildCommand {
    /// Path to packhook.toml (defaults to ./packhook.toml)
    #[arg(short, long, default_value = "packhook.toml")]
    pub config: PathBuf,

    /// Print the stats as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn run(&self) -> Result<()> {
        let options = parse_file(&self.config).unwrap_or_exit();
        let compiler = create_compiler(options)?;

        let stats = compiler.run().await?;
        compiler.close().await?;

        if self.json {
            let json = stats.to_json(&StatsOptions::default());
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            BuildReport::from_stats(&stats).render(&mut TerminalOutput::new());
        }

        if stats.has_errors() {
            std::process::exit(1);
        }
        Ok(())
    }
}
