//! Network fetch of boundary archives from the HDX open-data catalog.
//!
//! The only long-latency part of the pipeline. Downloads land in a temp file
//! and are renamed into place, so an interrupted fetch never leaves a partial
//! archive behind. Everything here must finish before normalization of the
//! fetched layers begins.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use tempfile::NamedTempFile;
use zip::ZipArchive;

use crate::model::CountryProfile;

const HDX_API_BASE: &str = "https://data.humdata.org/api/3/action";
const USER_AGENT: &str = concat!("boundarykit/", env!("CARGO_PKG_VERSION"));

/// A download staged in a temp file beside its destination. Nothing appears
/// at the target path until [`StagedFile::commit`] renames the finished file
/// in, so readers never see a half-written archive.
struct StagedFile {
    target: PathBuf,
    tmp: NamedTempFile,
}

impl StagedFile {
    fn create(target: &Path, force: bool) -> Result<Self> {
        let parent = target.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
        if !force && target.exists() {
            bail!("Refusing to overwrite existing file: {} (use --force)", target.display());
        }
        // Staged in the same directory, so the final rename stays on one
        // filesystem.
        let tmp = NamedTempFile::new_in(parent).context("create staging file")?;
        Ok(Self { target: target.to_path_buf(), tmp })
    }

    fn commit(self) -> Result<()> {
        let Self { target, tmp } = self;
        tmp.as_file().sync_all().ok();
        tmp.persist(&target)
            .with_context(|| format!("rename to {}", target.display()))?;
        if let Some(dir) = target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tmp.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.tmp.flush()
    }
}

fn client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(600))
        .build()
        .context("build http client")
}

/// Ask the catalog which file holds a dataset's GeoJSON boundaries.
///
/// Catalog datasets carry several resource formats (shapefile, geodatabase,
/// GeoJSON); the first GeoJSON resource wins.
pub fn resolve_geojson_resource(dataset_id: &str) -> Result<String> {
    let url = format!("{HDX_API_BASE}/package_show");
    let body = client()?
        .get(&url)
        .query(&[("id", dataset_id)])
        .send()
        .with_context(|| format!("GET {url}?id={dataset_id}"))?
        .error_for_status()
        .with_context(|| format!("catalog lookup for {dataset_id} returned error status"))?
        .text()?;

    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("parse catalog response for {dataset_id}"))?;
    let resources = parsed["result"]["resources"]
        .as_array()
        .ok_or_else(|| anyhow!("catalog response for {dataset_id} has no resources"))?;

    resources
        .iter()
        .find(|r| {
            r["format"]
                .as_str()
                .is_some_and(|f| f.to_ascii_lowercase().contains("geojson"))
        })
        .and_then(|r| r["url"].as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no GeoJSON resource in dataset {dataset_id}"))
}

/// Download a large file from `url` to `out_path`.
pub fn download_file(url: &str, out_path: &Path, force: bool) -> Result<()> {
    let mut sink = StagedFile::create(out_path, force)?;

    let mut resp = client()?
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned error status"))?;

    std::io::copy(&mut resp, &mut sink)
        .with_context(|| format!("write {}", out_path.display()))?;

    sink.commit()?;
    Ok(())
}

/// Extract a `.zip` archive to `dest_dir`, deleting the archive on success
/// when `delete_after` is set.
pub fn extract_zip(zip_path: &Path, dest_dir: &Path, delete_after: bool) -> Result<()> {
    let file = File::open(zip_path)
        .with_context(|| format!("open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("read zip archive {}", zip_path.display()))?;

    archive
        .extract(dest_dir)
        .with_context(|| format!("extract {} to {}", zip_path.display(), dest_dir.display()))?;

    if delete_after {
        std::fs::remove_file(zip_path)
            .with_context(|| format!("delete {}", zip_path.display()))?;
    }
    Ok(())
}

/// Fetch and unpack one country's boundary archive.
///
/// Returns the directory holding the extracted per-level files, ready for
/// [`crate::pipeline::import_country_dir`].
pub fn fetch_boundary_archive(
    profile: &CountryProfile,
    out_dir: &Path,
    force: bool,
    verbose: u8,
) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create dir {}", out_dir.display()))?;

    let resource_url = resolve_geojson_resource(&profile.dataset_id)?;
    let zip_path = out_dir.join(format!("{}_boundaries.zip", profile.iso_code.to_lowercase()));
    let extract_dir = out_dir.join(profile.iso_code.to_lowercase());

    if verbose > 0 {
        eprintln!("[fetch] {} -> {}", resource_url, zip_path.display());
    }
    download_file(&resource_url, &zip_path, force)?;

    if verbose > 0 {
        eprintln!("[fetch] extract {} -> {}", zip_path.display(), extract_dir.display());
    }
    extract_zip(&zip_path, &extract_dir, true)?;

    Ok(extract_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_file_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("archive.zip");
        std::fs::write(&target, b"existing").unwrap();

        assert!(StagedFile::create(&target, false).is_err());
        assert!(StagedFile::create(&target, true).is_ok());
        // The refused create left the original untouched.
        assert_eq!(std::fs::read(&target).unwrap(), b"existing");
    }

    #[test]
    fn staged_file_appears_only_on_commit() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");

        let mut sink = StagedFile::create(&target, false).unwrap();
        sink.write_all(b"partial").unwrap();
        assert!(!target.exists());
        sink.commit().unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"partial");
    }

    #[test]
    fn extract_zip_round_trip() {
        use std::io::Write as _;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("bundle.zip");
        let mut writer = zip::ZipWriter::new(File::create(&zip_path).unwrap());
        writer
            .start_file("bgd_admin1.geojson", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"{\"type\":\"FeatureCollection\",\"features\":[]}").unwrap();
        writer.finish().unwrap();

        let dest = dir.path().join("out");
        extract_zip(&zip_path, &dest, true).unwrap();
        assert!(dest.join("bgd_admin1.geojson").exists());
        assert!(!zip_path.exists());
    }
}
