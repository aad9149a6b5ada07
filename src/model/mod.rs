mod boundary;
mod dataset;
mod health;
mod level;
mod profile;

pub use boundary::{AdministrativeBoundary, CountryCode, Pcode};
pub use dataset::{DatasetDescriptor, DatasetKind, DatasetValue};
pub use health::{CleaningStatus, HealthMetrics};
pub use level::AdminLevel;
pub use profile::CountryProfile;
