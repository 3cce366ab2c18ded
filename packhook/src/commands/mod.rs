mod build;
mod check;
mod completions;
mod hooks;
mod watch;

use std::sync::Arc;

use build::BuildCommand;
use check::CheckCommand;
use clap::{ArgAction, Parser, Subcommand};
use completions::CompletionsCommand;
use eyre::Result;
use hooks::HooksCommand;
use packhook_compiler::{Compiler, reference::ReferenceCoreFactory};
use packhook_config::CompilerOptions;
use tracing_subscriber::EnvFilter;
use watch::WatchCommand;

/// Extension trait for exiting on config errors with pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for packhook_config::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(1);
            }
        }
    }
}

/// Create a compiler backed by the in-process build core.
pub(crate) fn create_compiler(options: CompilerOptions) -> Result<Arc<Compiler>> {
    let factory = Arc::new(ReferenceCoreFactory::new());
    Ok(Compiler::builder(options, factory).build()?)
}

#[derive(Parser)]
#[command(name = "packhook")]
#[command(version)]
#[command(about = "Build JavaScript projects through a plugin-driven hook pipeline")]
pub(crate) struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Install the tracing subscriber. `RUST_LOG` takes precedence over `-v`.
    pub fn init_tracing(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Build(cmd) => cmd.run().await,
            Commands::Watch(cmd) => cmd.run().await,
            Commands::Check(cmd) => cmd.run(),
            Commands::Hooks(cmd) => cmd.run().await,
            Commands::Completions(cmd) => cmd.run(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project once
    Build(BuildCommand),

    /// Build the project and rebuild on file changes
    Watch(WatchCommand),

    /// Validate packhook.toml without building
    Check(CheckCommand),

    /// List the hooks of a compiler and their taps
    Hooks(HooksCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}
