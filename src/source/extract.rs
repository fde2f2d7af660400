//! Archive extraction utilities.
//!
//! MaxMind ships databases as tar.gz archives with a dated top-level
//! directory, e.g. `GeoIP2-City_20240102/GeoIP2-City.mmdb`.

use std::io::Read;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Extracts the member whose path ends with `member_suffix` from a tar.gz archive.
///
/// # Arguments
///
/// * `tar_gz_bytes` - The tar.gz archive bytes
/// * `member_suffix` - Database file name to look for (e.g. "GeoIP2-City.mmdb")
pub(crate) fn extract_member_from_tar_gz(tar_gz_bytes: &[u8], member_suffix: &str) -> Result<Vec<u8>> {
    log::debug!("Extracting {} from tar.gz archive", member_suffix);

    let mut tar_archive = Archive::new(GzDecoder::new(tar_gz_bytes));

    let entries = tar_archive
        .entries()
        .context("Failed to read tar archive entries")?;

    for entry_result in entries {
        let mut entry = entry_result.context("Failed to read tar entry")?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let matches = {
            let path = entry.path().context("Failed to get entry path")?;
            path.to_string_lossy().ends_with(member_suffix)
        };
        if !matches {
            continue;
        }

        let mut member_bytes = Vec::new();
        entry
            .read_to_end(&mut member_bytes)
            .with_context(|| format!("Failed to read {} from archive", member_suffix))?;
        log::info!(
            "Extracted {} from tar.gz ({} bytes)",
            member_suffix,
            member_bytes.len()
        );
        return Ok(member_bytes);
    }

    Err(anyhow::anyhow!("{} not found in tar.gz archive", member_suffix))
}
