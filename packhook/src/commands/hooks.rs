use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use packhook_config::parse_file;

use super::{UnwrapOrExit, create_compiler};
use crate::reports::{HooksReport, Report, TerminalOutput};

#[derive(Args)]
pub struct HooksCommand {
    /// Path to packhook.toml (defaults to ./packhook.toml)
    #[arg(short, long, default_value = "packhook.toml")]
    pub config: PathBuf,

    /// Run a build first and include the compilation and factory hooks
    #[arg(long)]
    pub build: bool,

    /// Only list hooks that have taps
    #[arg(long)]
    pub used: bool,
}

impl HooksCommand {
    pub async fn run(&self) -> Result<()> {
        let options = parse_file(&self.config).unwrap_or_exit();
        let compiler = create_compiler(options)?;

        let mut report = HooksReport::new(self.used);
        report.add_registry("compiler", compiler.hooks.registry());

        if self.build {
            let stats = compiler.run().await?;
            let compilation = stats.compilation();
            report.add_registry("compilation", compilation.hooks.registry());
            let params = compilation.params();
            report.add_registry(
                "normalModuleFactory",
                params.normal_module_factory.hooks.registry(),
            );
            report.add_registry(
                "contextModuleFactory",
                params.context_module_factory.hooks.registry(),
            );
        }
        compiler.close().await?;

        report.render(&mut TerminalOutput::new());
        Ok(())
    }
}
