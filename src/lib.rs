#![doc = "Boundary normalization and dataset health scoring"]

pub mod cli;
pub mod commands;
pub mod health;
pub mod hierarchy;
pub mod layer;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod store;

#[cfg(feature = "download")]
pub mod fetch;

#[doc(inline)]
pub use model::{
    AdminLevel, AdministrativeBoundary, CleaningStatus, CountryCode, CountryProfile,
    DatasetDescriptor, DatasetKind, DatasetValue, HealthMetrics, Pcode,
};

#[doc(inline)]
pub use pipeline::{import_country, import_country_dir, ImportOptions, ImportReport};

#[doc(inline)]
pub use health::{classify, compute_health, refresh_dataset_health};
