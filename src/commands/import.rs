use anyhow::Result;

use crate::cli::{Cli, ImportArgs};
use crate::pipeline::{import_country_dir, ImportOptions};
use crate::store::MemoryStore;

use super::load_profile;

pub fn run(cli: &Cli, args: &ImportArgs) -> Result<()> {
    let profile = load_profile(args.profiles.as_deref(), &args.country)?;

    if cli.verbose > 0 {
        eprintln!("[import] {} from {}", profile.iso_code, args.dir.display());
    }

    let mut store = MemoryStore::new();
    let opts = ImportOptions {
        clear_existing: !args.keep_existing,
        batch_size: args.batch_size,
        verbose: cli.verbose,
    };
    let report = import_country_dir(&mut store, &profile, &args.dir, &opts)?;

    for (level, outcome) in &report.levels {
        println!(
            "{} {level}: {} imported ({} read, {} dropped), {} batch errors",
            report.country,
            outcome.upsert.inserted,
            outcome.normalize.input,
            outcome.normalize.input - outcome.normalize.kept,
            outcome.upsert.errors,
        );
    }
    for skipped in &report.skipped_layers {
        println!("skipped layer: {skipped}");
    }
    for issue in &report.hierarchy.issues {
        println!("issue: {issue}");
    }
    Ok(())
}
