use anyhow::{bail, Context, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::time::Duration;

use super::tag_lines;
use crate::diagnose::{explain_delete, explain_resolve};
use crate::gc::{GarbageCollector, DEFAULT_CONTAINER};
use crate::notifier::Notifier;
use crate::registry::{ImageTarget, RegistryClient, RegistryConfig, DEFAULT_REGISTRY};

/// List the catalog and tags, optionally deleting one tag's manifest and collecting garbage.
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    #[arg(long, default_value = DEFAULT_REGISTRY, help = "Registry host[:port]")]
    pub registry: String,

    #[arg(long, help = "Repository to act on (e.g. golang)")]
    pub repo: Option<String>,

    #[arg(long, default_value = "latest", help = "Tag to act on (e.g. 1.21-alpine)")]
    pub tag: String,

    #[arg(long, help = "Delete the manifest for repo:tag after resolving its digest")]
    pub delete: bool,

    #[arg(long, help = "Run registry garbage-collect through docker exec after the delete")]
    pub gc: bool,

    #[arg(
        long,
        default_value = DEFAULT_CONTAINER,
        help = "Registry container name (for docker exec gc)"
    )]
    pub container: String,

    #[arg(
        long,
        default_value = "docker",
        help = "Docker-compatible CLI used for the gc exec (e.g. podman)"
    )]
    pub docker: String,

    #[arg(long, default_value_t = 10, help = "HTTP timeout in seconds")]
    pub timeout: u64,

    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set,
        help = "Use plain HTTP; --insecure=false for HTTPS"
    )]
    pub insecure: bool,
}

/// What a catalog run saw and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogReport {
    pub repositories: Vec<String>,
    /// Tags per repository; repositories whose listing failed are absent.
    pub tags: BTreeMap<String, Vec<String>>,
    /// Digest removed by `--delete`.
    pub deleted: Option<String>,
    pub garbage_collected: bool,
}

pub async fn run(args: &CatalogArgs, notifier: &Notifier) -> Result<CatalogReport> {
    let config = RegistryConfig::new(&args.registry, args.insecure)
        .with_http_timeout(Duration::from_secs(args.timeout));
    let client = RegistryClient::new(config)?;
    let registry = client.config().registry.clone();
    let mut report = CatalogReport::default();

    notifier.say(&format!("Registry: {}", registry));

    notifier.say("\n==> 1. Listing catalog via HTTP GET /v2/_catalog");
    let catalog = client
        .fetch_catalog()
        .await
        .context("fetching catalog failed")?;
    if catalog.repositories.is_empty() {
        notifier.say("No repositories in catalog.");
    } else {
        for repo in &catalog.repositories {
            notifier.say(&format!(" - {}", repo));
        }
    }
    report.repositories = catalog.repositories;

    notifier.say("\n==> 2. Listing tags for each repository");
    for repo in &report.repositories {
        notifier.say(&format!("\nRepo: {}/{}", registry, repo));
        let reference = client.reference(repo, "latest");
        match client.list_tags(&reference).await {
            Ok(tags) => {
                for line in tag_lines(&tags) {
                    notifier.say(&line);
                }
                report.tags.insert(repo.clone(), tags);
            }
            Err(e) => notifier.say(&format!("  listing tags failed: {:#}", e)),
        }
    }

    if !args.delete {
        notifier.say("\nDone (no delete requested).");
        return Ok(report);
    }

    let repo = match args.repo.as_deref().map(str::trim) {
        Some(repo) if !repo.is_empty() => repo,
        _ => bail!("please provide --repo when using --delete"),
    };
    let target = ImageTarget::new(&registry, repo, &args.tag);

    notifier.say(&format!(
        "\n==> 3. Resolving digest for {}:{} using HEAD /v2/<repo>/manifests/<tag>",
        repo, args.tag
    ));
    let resolution = client
        .resolve_digest(repo, &args.tag)
        .await
        .map_err(|e| explain_resolve(e, &target.to_string()))?;
    notifier.debug(&format!(
        "Digest header {} found (HTTP {})",
        resolution.header, resolution.status
    ));
    notifier.say(&format!("Resolved digest: {}", resolution.digest));

    let delete_ref = format!("{}/{}@{}", registry, repo, resolution.digest);
    notifier.say(&format!("\n==> 4. Deleting manifest {}", delete_ref));
    let status = client
        .delete_manifest(repo, &resolution.digest)
        .await
        .map_err(|e| explain_delete(e, &delete_ref))?;
    notifier.say(&format!(
        "Delete request accepted by registry (HTTP {}).",
        status
    ));
    report.deleted = Some(resolution.digest);

    if args.gc {
        notifier.say(&format!(
            "\n==> 5. Running garbage-collect inside container '{}'",
            args.container
        ));
        GarbageCollector::new(&args.container)
            .with_docker(&args.docker)
            .run()
            .context("garbage-collect failed")?;
        notifier.say("Garbage-collect completed (check container logs/output).");
        report.garbage_collected = true;
    }

    notifier.say("\nAll done.");
    Ok(report)
}
