use anyhow::Result;
use clap::Parser;

use boundarykit::cli::{Cli, Commands};
use boundarykit::commands::{audit, import};

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Import(args) => import::run(&cli, args),
        Commands::Audit(args) => audit::run(&cli, args),
        #[cfg(feature = "download")]
        Commands::Fetch(args) => boundarykit::commands::fetch::run(&cli, args),
    }
}
