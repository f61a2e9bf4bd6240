use anyhow::{Context, Result};
use oci_client::Reference;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory archives land in when no explicit output path is given.
pub const DEFAULT_ARCHIVE_DIR: &str = "downloaded-images";

/// A `registry/repository:tag` triple assembled from command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

impl ImageTarget {
    pub fn new(registry: &str, repository: &str, tag: &str) -> Self {
        let (registry, _) = normalize_registry(registry);
        Self {
            registry,
            repository: repository.trim_matches('/').to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn to_reference(&self) -> Result<Reference> {
        parse_reference(&self.to_string())
    }
}

impl fmt::Display for ImageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

/// URL scheme requested explicitly through the registry flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeHint {
    Http,
    Https,
}

/// Strips an optional `http://`/`https://` prefix and any trailing slashes
/// from a registry flag, so `localhost:5000/` and `http://localhost:5000`
/// both become `localhost:5000`.
pub fn normalize_registry(registry: &str) -> (String, Option<SchemeHint>) {
    let trimmed = registry.trim();
    let (rest, hint) = if let Some(rest) = trimmed.strip_prefix("http://") {
        (rest, Some(SchemeHint::Http))
    } else if let Some(rest) = trimmed.strip_prefix("https://") {
        (rest, Some(SchemeHint::Https))
    } else {
        (trimmed, None)
    };

    (rest.trim_end_matches('/').to_string(), hint)
}

/// Parses a full image reference such as `localhost:5000/mybusybox:latest`.
pub fn parse_reference(image: &str) -> Result<Reference> {
    Reference::try_from(image).with_context(|| format!("parsing reference {:?}", image))
}

/// Builds the `registry/repository@digest` form used to address a manifest by content.
pub fn digest_reference(reference: &Reference, digest: &str) -> Reference {
    Reference::with_digest(
        reference.registry().to_string(),
        reference.repository().to_string(),
        digest.to_string(),
    )
}

/// `<dir>/<last repository segment>_<tag>.tar`
pub fn default_archive_path(dir: &Path, repository: &str, tag: &str) -> PathBuf {
    let base = repository
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image");

    dir.join(format!("{}_{}.tar", base, tag))
}
