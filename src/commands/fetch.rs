use anyhow::Result;

use crate::cli::{Cli, FetchArgs};
use crate::fetch::fetch_boundary_archive;

use super::load_profile;

pub fn run(cli: &Cli, args: &FetchArgs) -> Result<()> {
    let profile = load_profile(args.profiles.as_deref(), &args.country)?;

    let extract_dir = fetch_boundary_archive(&profile, &args.out, args.force, cli.verbose)?;
    println!(
        "Fetched {} boundaries into {}",
        profile.iso_code,
        extract_dir.display()
    );
    Ok(())
}
