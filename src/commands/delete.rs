use anyhow::{bail, Result};
use clap::Args;
use std::time::Duration;

use super::print_tags;
use crate::diagnose::{explain_delete, explain_resolve};
use crate::notifier::Notifier;
use crate::registry::reference::{digest_reference, parse_reference};
use crate::registry::{RegistryClient, RegistryConfig};

/// Delete the manifest a tag points to.
#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(
        long = "ref",
        default_value = "localhost:5000/mybusybox:latest",
        help = "Image reference (host:port/repo:tag)"
    )]
    pub reference: String,

    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set,
        help = "Allow plain HTTP to the registry; --insecure=false for TLS"
    )]
    pub insecure: bool,

    #[arg(long, default_value_t = 10, help = "Digest lookup timeout in seconds")]
    pub timeout: u64,
}

/// Resolves `--ref` to its digest, deletes that manifest, and shows the tag list
/// before and after. Returns the deleted digest.
pub async fn run(args: &DeleteArgs, notifier: &Notifier) -> Result<String> {
    let reference = parse_reference(&args.reference)?;
    let config = RegistryConfig::new(reference.registry(), args.insecure)
        .with_http_timeout(Duration::from_secs(args.timeout));
    let client = RegistryClient::new(config)?;

    let digest = client
        .fetch_manifest_digest(&reference)
        .await
        .map_err(|e| explain_resolve(e, &args.reference))?;
    if digest.is_empty() {
        bail!("no digest found in descriptor for {}", args.reference);
    }
    notifier.say(&format!("Resolved digest: {}", digest));

    if let Err(e) = print_tags(&client, &reference, notifier).await {
        notifier.warn(&format!("Warning: unable to list tags: {:#}", e));
    }

    let target = digest_reference(&reference, &digest).whole();
    notifier.say(&format!("Deleting manifest: {}", target));
    client
        .delete_manifest(reference.repository(), &digest)
        .await
        .map_err(|e| explain_delete(e, &target))?;
    notifier.say("Delete request sent successfully.");

    if let Err(e) = print_tags(&client, &reference, notifier).await {
        notifier.warn(&format!(
            "Warning: unable to list tags after delete: {:#}",
            e
        ));
    }

    Ok(digest)
}
