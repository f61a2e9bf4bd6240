//! Registry access.
//!
//! [`RegistryClient`] pairs the `oci-client` library (pull, push, digest lookups,
//! token auth) with a plain `reqwest` client for the endpoints the library does not
//! expose or decodes too strictly: the repository catalog, tag listing, an explicit
//! manifest `HEAD`, and manifest deletion.

pub mod catalog;
pub mod digest;
pub mod reference;

use anyhow::{anyhow, Context, Result};
use log::debug;
use oci_client::client::{ClientConfig, ClientProtocol, ImageData};
use oci_client::manifest::{
    OciImageManifest, IMAGE_DOCKER_LAYER_GZIP_MEDIA_TYPE, IMAGE_DOCKER_LAYER_TAR_MEDIA_TYPE,
    IMAGE_LAYER_GZIP_MEDIA_TYPE, IMAGE_LAYER_MEDIA_TYPE,
};
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference};
use oci_spec::image::ImageConfiguration;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::notifier::Notifier;
use reference::{normalize_registry, SchemeHint};

pub use catalog::{CatalogResponse, TagList};
pub use digest::{DigestResolution, MANIFEST_ACCEPT};
pub use reference::ImageTarget;

pub const DEFAULT_REGISTRY: &str = "localhost:5000";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Upper bound on how much of an error response body ends up in a message.
pub const ERROR_BODY_LIMIT: usize = 2048;

/// Layer media types accepted when pulling a whole image into memory.
pub const ACCEPTED_LAYER_MEDIA_TYPES: &[&str] = &[
    IMAGE_LAYER_MEDIA_TYPE,
    IMAGE_LAYER_GZIP_MEDIA_TYPE,
    IMAGE_DOCKER_LAYER_TAR_MEDIA_TYPE,
    IMAGE_DOCKER_LAYER_GZIP_MEDIA_TYPE,
    "application/vnd.oci.image.layer.v1.tar+zstd",
];

/// Connection settings shared by every command.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// `host[:port]` without scheme or trailing slash.
    pub registry: String,
    /// Talk plain HTTP to `registry`.
    pub insecure: bool,
    pub http_timeout: Duration,
    pub pull_timeout: Duration,
}

impl RegistryConfig {
    /// An explicit `http://` or `https://` prefix on `registry` overrides `insecure`.
    pub fn new(registry: &str, insecure: bool) -> Self {
        let (registry, hint) = normalize_registry(registry);
        let insecure = match hint {
            Some(SchemeHint::Http) => true,
            Some(SchemeHint::Https) => false,
            None => insecure,
        };

        Self {
            registry,
            insecure,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            pull_timeout: DEFAULT_PULL_TIMEOUT,
        }
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_pull_timeout(mut self, timeout: Duration) -> Self {
        self.pull_timeout = timeout;
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.insecure {
            "http"
        } else {
            "https"
        }
    }

    /// `scheme://host[:port]`
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.registry)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY, true)
    }
}

/// A layer blob downloaded to disk, in manifest order.
#[derive(Debug, Clone)]
pub struct LayerFile {
    pub digest: String,
    pub media_type: String,
    pub path: PathBuf,
}

/// Everything needed to write an image archive.
#[derive(Debug, Clone)]
pub struct PulledImage {
    pub manifest: OciImageManifest,
    /// Digest of the manifest as reported by the registry.
    pub digest: String,
    /// Raw config JSON exactly as stored in the registry.
    pub config: String,
    pub layers: Vec<LayerFile>,
}

impl PulledImage {
    /// `os/architecture` from the image config, when it parses.
    pub fn platform(&self) -> Option<String> {
        match ImageConfiguration::from_reader(self.config.as_bytes()) {
            Ok(config) => Some(format!("{}/{}", config.os(), config.architecture())),
            Err(e) => {
                debug!("Image config is not a standard OCI config: {}", e);
                None
            }
        }
    }
}

pub struct RegistryClient {
    config: RegistryConfig,
    client: Client,
    http: reqwest::Client,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let protocol = if config.insecure {
            // Only the configured registry drops TLS; public sources keep it.
            ClientProtocol::HttpsExcept(vec![config.registry.clone()])
        } else {
            ClientProtocol::Https
        };
        let client = Client::new(ClientConfig {
            protocol,
            ..Default::default()
        });

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            client,
            http,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// A tagged reference to `repository` on the configured registry.
    pub fn reference(&self, repository: &str, tag: &str) -> Reference {
        Reference::with_tag(
            self.config.registry.clone(),
            repository.to_string(),
            tag.to_string(),
        )
    }

    /// Resolves the manifest digest of `reference` through the client library.
    pub async fn fetch_manifest_digest(&self, reference: &Reference) -> Result<String> {
        let digest = deadline(
            self.config.http_timeout,
            &format!("resolving {}", reference),
            self.client
                .fetch_manifest_digest(reference, &RegistryAuth::Anonymous),
        )
        .await??;

        Ok(digest)
    }

    /// Downloads manifest, config and every layer of `reference`, writing layer
    /// blobs into `scratch`.
    pub async fn pull_image(
        &self,
        reference: &Reference,
        scratch: &Path,
        notifier: &Notifier,
    ) -> Result<PulledImage> {
        deadline(
            self.config.pull_timeout,
            &format!("pulling {}", reference),
            self.pull_to_dir(reference, scratch, notifier),
        )
        .await?
    }

    async fn pull_to_dir(
        &self,
        reference: &Reference,
        scratch: &Path,
        notifier: &Notifier,
    ) -> Result<PulledImage> {
        let (manifest, digest, config) = self
            .client
            .pull_manifest_and_config(reference, &RegistryAuth::Anonymous)
            .await
            .with_context(|| format!("Failed to pull manifest for {}", reference))?;

        notifier.info(&format!(
            "Manifest {} lists {} layers",
            digest,
            manifest.layers.len()
        ));

        let total = manifest.layers.len();
        let mut layers = Vec::with_capacity(total);
        for (i, descriptor) in manifest.layers.iter().enumerate() {
            notifier.info(&format!(
                "Downloading layer {}/{} ({})",
                i + 1,
                total,
                descriptor.digest
            ));

            let path = scratch.join(blob_file_stem(&descriptor.digest));
            let mut file = File::create(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            self.client
                .pull_blob(reference, descriptor, &mut file)
                .await
                .with_context(|| format!("Failed to pull layer {}", descriptor.digest))?;
            file.flush()
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            layers.push(LayerFile {
                digest: descriptor.digest.clone(),
                media_type: descriptor.media_type.clone(),
                path,
            });
        }

        Ok(PulledImage {
            manifest,
            digest,
            config,
            layers,
        })
    }

    /// Pulls a whole image into memory, ready to be pushed elsewhere.
    pub async fn pull_image_data(&self, reference: &Reference) -> Result<ImageData> {
        let image = deadline(
            self.config.pull_timeout,
            &format!("pulling {}", reference),
            self.client.pull(
                reference,
                &RegistryAuth::Anonymous,
                ACCEPTED_LAYER_MEDIA_TYPES.to_vec(),
            ),
        )
        .await?
        .with_context(|| format!("Failed to pull {}", reference))?;

        Ok(image)
    }

    /// Uploads `image` to `destination`, returning the manifest URL.
    pub async fn push_image(&self, image: ImageData, destination: &Reference) -> Result<String> {
        let response = deadline(
            self.config.pull_timeout,
            &format!("pushing {}", destination),
            self.client.push(
                destination,
                &image.layers,
                image.config,
                &RegistryAuth::Anonymous,
                image.manifest,
            ),
        )
        .await?
        .with_context(|| format!("Failed to push {}", destination))?;

        Ok(response.manifest_url)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Runs `fut`, failing with a message naming `what` once `limit` elapses.
pub async fn deadline<F: Future>(limit: Duration, what: &str, fut: F) -> Result<F::Output> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow!("{} timed out after {:?}", what, limit))
}

/// `sha256:abc…` → `abc…`
pub fn blob_file_stem(digest: &str) -> &str {
    digest
        .split_once(':')
        .map(|(_, hex)| hex)
        .unwrap_or(digest)
}

/// Reads at most [`ERROR_BODY_LIMIT`] bytes of a response body for an error message.
pub(crate) async fn body_snippet(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(body) => {
            let end = body.len().min(ERROR_BODY_LIMIT);
            String::from_utf8_lossy(&body[..end]).trim().to_string()
        }
        Err(e) => format!("<unreadable body: {}>", e),
    }
}
