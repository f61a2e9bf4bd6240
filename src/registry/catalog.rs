use anyhow::{anyhow, Context, Result};
use log::debug;
use oci_client::Reference;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{body_snippet, RegistryClient};

/// Body of `GET /v2/_catalog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Body of `GET /v2/<repo>/tags/list`.
///
/// Distribution answers `"tags": null` once the last tag of a repository is
/// deleted; that decodes as no tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl TagList {
    pub fn into_tags(self) -> Vec<String> {
        self.tags.unwrap_or_default()
    }
}

impl RegistryClient {
    /// Lists repository names through the catalog endpoint.
    pub async fn fetch_catalog(&self) -> Result<CatalogResponse> {
        let url = format!("{}/v2/_catalog", self.config().base_url());
        debug!("GET {}", url);

        let response = self
            .http()
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = body_snippet(response).await;
            return Err(anyhow!(
                "catalog returned status {}: {}",
                status.as_u16(),
                body
            ));
        }

        response
            .json::<CatalogResponse>()
            .await
            .with_context(|| format!("Failed to decode catalog from {}", url))
    }

    /// Lists the tags of the repository `reference` points into, on the configured registry.
    pub async fn list_tags(&self, reference: &Reference) -> Result<Vec<String>> {
        let repository = reference.repository();
        let url = format!(
            "{}/v2/{}/tags/list",
            self.config().base_url(),
            repository
        );
        debug!("GET {}", url);

        let response = self
            .http()
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to list tags of {}", repository))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = body_snippet(response).await;
            return Err(anyhow!(
                "tags list for {} returned status {}: {}",
                repository,
                status.as_u16(),
                body
            ));
        }

        let list = response
            .json::<TagList>()
            .await
            .with_context(|| format!("Failed to decode tags of {}", repository))?;
        Ok(list.into_tags())
    }
}
