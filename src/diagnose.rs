//! Turns opaque registry failures into actionable messages.
//!
//! Registries report failures as JSON error bodies carrying a code such as
//! `MANIFEST_UNKNOWN`. Errors from `oci-client` keep the decoded envelope, so
//! those are classified by their typed code. Our own HTTP calls flatten the body
//! into the error string, so everything else is a substring match over the
//! whole error chain.

use anyhow::Error;
use oci_client::errors::{OciDistributionError, OciErrorCode};
use std::fmt;

/// Registry error codes (and the bare 404) that we know how to explain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorCode {
    ManifestUnknown,
    NotFound,
    Unsupported,
    DigestInvalid,
}

impl RegistryErrorCode {
    /// Finds the first known code mentioned in `message`.
    ///
    /// Specific codes win over the generic `404`.
    pub fn detect(message: &str) -> Option<Self> {
        if message.contains("MANIFEST_UNKNOWN") {
            Some(Self::ManifestUnknown)
        } else if message.contains("UNSUPPORTED") {
            Some(Self::Unsupported)
        } else if message.contains("DIGEST_INVALID") {
            Some(Self::DigestInvalid)
        } else if mentions_status(message, "404") {
            Some(Self::NotFound)
        } else {
            None
        }
    }

    /// Classifies `err`, preferring a typed `oci-client` error anywhere in its
    /// chain over the text of the chain.
    pub fn classify(err: &Error) -> Option<Self> {
        Self::from_client_error(err).or_else(|| Self::detect(&chain_text(err)))
    }

    fn from_client_error(err: &Error) -> Option<Self> {
        err.chain()
            .filter_map(|cause| cause.downcast_ref::<OciDistributionError>())
            .find_map(|cause| match cause {
                OciDistributionError::RegistryError { envelope, .. } => envelope
                    .errors
                    .iter()
                    .find_map(|error| Self::from_oci_code(&error.code)),
                OciDistributionError::ImageManifestNotFoundError(_) => {
                    Some(Self::ManifestUnknown)
                }
                OciDistributionError::ServerError { code: 404, .. } => Some(Self::NotFound),
                _ => None,
            })
    }

    fn from_oci_code(code: &OciErrorCode) -> Option<Self> {
        match code {
            OciErrorCode::ManifestUnknown => Some(Self::ManifestUnknown),
            OciErrorCode::Unsupported => Some(Self::Unsupported),
            OciErrorCode::DigestInvalid => Some(Self::DigestInvalid),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManifestUnknown => "MANIFEST_UNKNOWN",
            Self::NotFound => "404",
            Self::Unsupported => "UNSUPPORTED",
            Self::DigestInvalid => "DIGEST_INVALID",
        }
    }
}

impl fmt::Display for RegistryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A bare status code only counts as a whole token, so digests and ports
// that happen to contain the digits do not match.
fn mentions_status(message: &str, status: &str) -> bool {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == status)
}

/// Full `Display` of an error including every cause, as one line.
pub fn chain_text(err: &Error) -> String {
    format!("{:#}", err)
}

/// Explains a failed manifest lookup for `image`.
pub fn explain_resolve(err: Error, image: &str) -> Error {
    match RegistryErrorCode::classify(&err) {
        Some(RegistryErrorCode::ManifestUnknown) | Some(RegistryErrorCode::NotFound) => {
            err.context(format!(
                "manifest not found for {}. Make sure the tag exists (docker push {})",
                image, image
            ))
        }
        _ => err.context(format!("resolving digest for {} failed", image)),
    }
}

/// Explains a failed manifest delete for `target` (`registry/repo@digest`).
pub fn explain_delete(err: Error, target: &str) -> Error {
    match RegistryErrorCode::classify(&err) {
        Some(RegistryErrorCode::Unsupported) => err.context(format!(
            "deleting {} returned UNSUPPORTED: deletes are likely disabled on the registry. \
             Enable them with REGISTRY_STORAGE_DELETE_ENABLED=true or storage.delete.enabled: true in config.yml",
            target
        )),
        Some(RegistryErrorCode::DigestInvalid) => err.context(format!(
            "deleting {} returned DIGEST_INVALID: the server rejected the digest. \
             Ensure the HEAD request used the proper Accept header and the digest matches the server's manifest",
            target
        )),
        _ => err.context(format!("deleting {} failed", target)),
    }
}
