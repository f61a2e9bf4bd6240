use anyhow::{anyhow, Context, Result};
use log::debug;
use reqwest::header::{HeaderMap, ACCEPT};

use super::{body_snippet, RegistryClient};

/// Manifest types a digest lookup asks for. Without them some registries answer
/// with a schema1 manifest whose digest cannot be deleted.
pub const MANIFEST_ACCEPT: &str =
    "application/vnd.docker.distribution.manifest.v2+json,application/vnd.oci.image.manifest.v1+json";

const DIGEST_HEADERS: &[&str] = &["Docker-Content-Digest", "Content-Digest"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResolution {
    pub digest: String,
    pub status: u16,
    /// Header the digest was read from.
    pub header: &'static str,
}

/// Reads the manifest digest from `Docker-Content-Digest`, falling back to `Content-Digest`.
pub fn digest_from_headers(headers: &HeaderMap) -> Option<(&'static str, String)> {
    DIGEST_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| (*name, value.to_string()))
    })
}

impl RegistryClient {
    /// `HEAD /v2/<repo>/manifests/<tag>` on the configured registry.
    pub async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<DigestResolution> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.config().base_url(),
            repository,
            tag
        );
        debug!("HEAD {}", url);

        let response = self
            .http()
            .head(&url)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await
            .with_context(|| format!("HEAD {} failed", url))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        if status >= 400 {
            let body = body_snippet(response).await;
            return Err(if body.is_empty() {
                anyhow!("manifest HEAD returned status {}", status)
            } else {
                anyhow!("manifest HEAD returned status {}: {}", status, body)
            });
        }

        match digest_from_headers(&headers) {
            Some((header, digest)) => {
                debug!("Digest header {} found: {}", header, digest);
                Ok(DigestResolution {
                    digest,
                    status,
                    header,
                })
            }
            None => Err(anyhow!(
                "digest header not found (status {}); headers: {:?}",
                status,
                headers
            )),
        }
    }

    /// `DELETE /v2/<repo>/manifests/<digest>` on the configured registry.
    ///
    /// Returns the response status, normally `202 Accepted`.
    pub async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<u16> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.config().base_url(),
            repository,
            digest
        );
        debug!("DELETE {}", url);

        let response = self
            .http()
            .delete(&url)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await
            .with_context(|| format!("DELETE {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = body_snippet(response).await;
            return Err(anyhow!(
                "manifest DELETE returned status {}: {}",
                status.as_u16(),
                body
            ));
        }

        Ok(status.as_u16())
    }
}
