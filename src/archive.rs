//! Writes pulled images as `docker load`-compatible tarballs.
//!
//! Layout (the same one `docker save` produces for a single image):
//! - `sha256:<hex>` holding the image config JSON,
//! - one `<hex>.tar`/`<hex>.tar.gz` entry per layer blob, stored as pulled,
//! - `manifest.json` tying them together with the image's repo tag.
//!
//! The archive is assembled in a temporary file next to the destination and renamed
//! into place, so a failed write never leaves a truncated tarball behind.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tar_rs as tar;
use tempfile::NamedTempFile;

use crate::registry::{blob_file_stem, PulledImage};

pub const ARCHIVE_MANIFEST: &str = "manifest.json";

/// One entry of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArchiveManifest {
    pub config: String,
    #[serde(default)]
    pub repo_tags: Vec<String>,
    pub layers: Vec<String>,
}

/// File name a layer blob gets inside the archive.
pub fn layer_entry_name(digest: &str, media_type: &str) -> String {
    let extension = if media_type.ends_with("gzip") {
        "tar.gz"
    } else if media_type.ends_with("zstd") {
        "tar.zst"
    } else {
        "tar"
    };
    format!("{}.{}", blob_file_stem(digest), extension)
}

/// Writes `image` to `path`, tagged as `repo_tag` (e.g. `localhost:5000/golang:1.21-alpine`).
pub fn write_archive(path: &Path, repo_tag: &str, image: &PulledImage) -> Result<ArchiveManifest> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create output folder {}", parent.display()))?;

    let temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;

    let manifest = {
        let mut builder = tar::Builder::new(temp.as_file());

        let config_name = image.manifest.config.digest.clone();
        append_entry(&mut builder, &config_name, image.config.len() as u64, image.config.as_bytes())?;

        let mut layers = Vec::with_capacity(image.layers.len());
        for layer in &image.layers {
            let name = layer_entry_name(&layer.digest, &layer.media_type);
            let file = File::open(&layer.path)
                .with_context(|| format!("Failed to open layer {}", layer.path.display()))?;
            let size = file
                .metadata()
                .with_context(|| format!("Failed to stat layer {}", layer.path.display()))?
                .len();
            append_entry(&mut builder, &name, size, file)?;
            layers.push(name);
        }

        let manifest = ArchiveManifest {
            config: config_name,
            repo_tags: vec![repo_tag.to_string()],
            layers,
        };
        let manifest_json = serde_json::to_vec(&vec![manifest.clone()])
            .context("Failed to serialize archive manifest")?;
        append_entry(
            &mut builder,
            ARCHIVE_MANIFEST,
            manifest_json.len() as u64,
            manifest_json.as_slice(),
        )?;

        builder.finish().context("Failed to finish tarball")?;
        manifest
    };

    temp.as_file()
        .sync_all()
        .context("Failed to flush tarball to disk")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move tarball to {}", path.display()))?;

    Ok(manifest)
}

/// Reads `manifest.json` back out of an archive written by [`write_archive`]
/// (or by `docker save`).
pub fn read_archive_manifest(path: &Path) -> Result<Vec<ArchiveManifest>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open archive {}", path.display()))?;
    let mut archive = tar::Archive::new(file);

    for entry in archive.entries().context("Failed to read archive entries")? {
        let mut entry = entry.context("Failed to read tar entry")?;
        if entry.path()?.as_os_str() == ARCHIVE_MANIFEST {
            let mut json = String::new();
            entry
                .read_to_string(&mut json)
                .context("Failed to read manifest.json")?;
            return serde_json::from_str(&json).context("Failed to parse manifest.json");
        }
    }

    Err(anyhow!("{} has no {}", path.display(), ARCHIVE_MANIFEST))
}

fn append_entry<W: std::io::Write, R: Read>(
    builder: &mut tar::Builder<W>,
    name: &str,
    size: u64,
    data: R,
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(size);
    header.set_mode(0o644);
    header.set_mtime(0);
    builder
        .append_data(&mut header, name, data)
        .with_context(|| format!("Failed to append {} to tarball", name))
}
