use anyhow::Result;

use crate::cli::{AuditArgs, Cli, ValueKind};
use crate::health::{load_values_csv, refresh_dataset_health};
use crate::model::{AdminLevel, CountryCode, DatasetDescriptor, DatasetKind};
use crate::pipeline::{import_country_dir, ImportOptions};
use crate::store::MemoryStore;

use super::load_profile;

pub fn run(cli: &Cli, args: &AuditArgs) -> Result<()> {
    let profile = load_profile(args.profiles.as_deref(), &args.country)?;
    let level = AdminLevel::parse(&args.level)?;
    let kind = match args.kind {
        ValueKind::Numeric => DatasetKind::Numeric,
        ValueKind::Categorical => DatasetKind::Categorical,
    };

    // Rebuild the store from the boundary files, then score against it.
    let mut store = MemoryStore::new();
    let opts = ImportOptions { verbose: cli.verbose, ..Default::default() };
    import_country_dir(&mut store, &profile, &args.boundaries, &opts)?;

    let values = load_values_csv(&args.values, kind)?;
    let mut dataset = DatasetDescriptor {
        id: args.values.display().to_string(),
        name: args
            .values
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string(),
        country: CountryCode::new(&profile.iso_code),
        admin_level: level,
        kind,
        metadata: Default::default(),
    };
    if args.computed {
        dataset
            .metadata
            .insert("is_computed".into(), serde_json::Value::Bool(true));
    }
    if args.marked_ready {
        dataset
            .metadata
            .insert("readiness".into(), serde_json::Value::String("ready".into()));
    }

    let (metrics, status) = refresh_dataset_health(&mut dataset, &store, &values, cli.verbose)?;

    println!(
        "{} {} ({} values): {}/{} matched",
        dataset.country,
        level,
        values.len(),
        metrics.matched,
        metrics.total,
    );
    println!(
        "alignment {:.3}  coverage {:.3}  completeness {:.3}  uniqueness {:.3}  errors {}",
        metrics.alignment_rate,
        metrics.coverage,
        metrics.completeness,
        metrics.uniqueness,
        metrics.validation_error_count,
    );
    println!("status: {status}");
    Ok(())
}
