pub mod audit;
pub mod import;

#[cfg(feature = "download")]
pub mod fetch;

use std::path::Path;

use anyhow::{bail, Result};

use crate::model::CountryProfile;

/// Missing country configuration is a precondition failure; it halts before
/// any work begins.
pub(crate) fn load_profile(profiles: Option<&Path>, iso: &str) -> Result<CountryProfile> {
    let profiles = match profiles {
        Some(path) => CountryProfile::load_all(path)?,
        None => CountryProfile::builtin(),
    };
    let Some(profile) = CountryProfile::find(&profiles, iso) else {
        let known: Vec<&str> = profiles.iter().map(|p| p.iso_code.as_str()).collect();
        bail!("No profile for country {iso:?} (known: {known:?})");
    };
    Ok(profile.clone())
}
