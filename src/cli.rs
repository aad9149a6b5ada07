use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

/// Boundary pipeline CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "boundarykit", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a country's boundary files into the store
    Import(ImportArgs),

    /// Score a dataset's values against imported boundaries
    Audit(AuditArgs),

    /// Fetch a country's boundary archive from the open-data catalog
    #[cfg(feature = "download")]
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Three-letter ISO code, e.g. BGD, MOZ
    pub country: String,

    /// Directory holding per-level boundary files
    #[arg(value_hint = ValueHint::DirPath)]
    pub dir: PathBuf,

    /// Country profiles JSON (defaults to the built-in set)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub profiles: Option<PathBuf>,

    /// Merge into existing records instead of clearing each level first
    #[arg(long)]
    pub keep_existing: bool,

    /// Records per write batch
    #[arg(long, default_value_t = crate::store::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum ValueKind {
    Numeric,
    Categorical,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Three-letter ISO code, e.g. BGD, MOZ
    pub country: String,

    /// Directory holding per-level boundary files
    #[arg(value_hint = ValueHint::DirPath)]
    pub boundaries: PathBuf,

    /// CSV file with the dataset's values
    #[arg(value_hint = ValueHint::FilePath)]
    pub values: PathBuf,

    /// Admin level the dataset is bound to, e.g. ADM3
    #[arg(long, default_value = "ADM3")]
    pub level: String,

    /// Whether values are plain magnitudes or magnitudes per category
    #[arg(long, value_enum, default_value_t = ValueKind::Numeric)]
    pub kind: ValueKind,

    /// The dataset is computed/derived on demand
    #[arg(long)]
    pub computed: bool,

    /// An operator has declared the dataset ready
    #[arg(long)]
    pub marked_ready: bool,

    /// Country profiles JSON (defaults to the built-in set)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub profiles: Option<PathBuf>,
}

#[cfg(feature = "download")]
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Three-letter ISO code, e.g. BGD, MOZ
    pub country: String,

    /// Output location (directory)
    #[arg(value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    /// Overwrite an already-downloaded archive
    #[arg(long)]
    pub force: bool,

    /// Country profiles JSON (defaults to the built-in set)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub profiles: Option<PathBuf>,
}
