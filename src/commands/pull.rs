use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::archive::write_archive;
use crate::notifier::Notifier;
use crate::registry::reference::{default_archive_path, DEFAULT_ARCHIVE_DIR};
use crate::registry::{ImageTarget, RegistryClient, RegistryConfig, DEFAULT_REGISTRY};

/// Pull an image and save it as a docker-compatible tarball.
#[derive(Args, Debug, Clone)]
pub struct PullArgs {
    #[arg(long, default_value = DEFAULT_REGISTRY, help = "Registry host[:port]")]
    pub registry: String,

    #[arg(long, default_value = "", help = "Repository name (e.g. golang)")]
    pub repo: String,

    #[arg(long, default_value = "latest", help = "Image tag (e.g. 1.21-alpine)")]
    pub tag: String,

    #[arg(
        long,
        help = "Output tar filename (if empty, saved in ./downloaded-images/<repo>_<tag>.tar)"
    )]
    pub out: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set,
        help = "Allow plain HTTP to the registry; --insecure=false for TLS"
    )]
    pub insecure: bool,

    #[arg(long, default_value_t = 600, help = "Pull timeout in seconds")]
    pub timeout: u64,
}

impl PullArgs {
    /// Where the tarball goes: `--out`, or `downloaded-images/<repo>_<tag>.tar`.
    pub fn output_path(&self) -> PathBuf {
        match &self.out {
            Some(out) if !out.as_os_str().is_empty() => out.clone(),
            _ => default_archive_path(Path::new(DEFAULT_ARCHIVE_DIR), &self.repo, &self.tag),
        }
    }
}

/// Pulls `registry/repo:tag` and writes it to [`PullArgs::output_path`].
///
/// Returns the path of the saved tarball.
pub async fn run(args: &PullArgs, notifier: &Notifier) -> Result<PathBuf> {
    if args.repo.trim().is_empty() {
        bail!("please provide --repo (e.g. --repo golang)");
    }

    let out = args.output_path();
    let config = RegistryConfig::new(&args.registry, args.insecure)
        .with_pull_timeout(Duration::from_secs(args.timeout));
    let target = ImageTarget::new(&config.registry, &args.repo, &args.tag);
    let reference = target.to_reference()?;
    let client = RegistryClient::new(config)?;

    notifier.info(&format!("Pulling {} ...", target));
    notifier.debug(&format!("Output file: {}", out.display()));

    let scratch = TempDir::new().context("Failed to create temporary directory")?;
    let image = client
        .pull_image(&reference, scratch.path(), notifier)
        .await
        .context("pull failed")?;

    if let Some(platform) = image.platform() {
        notifier.debug(&format!("Image platform: {}", platform));
    }

    notifier.info(&format!("Saving {} layers to {}", image.layers.len(), out.display()));
    write_archive(&out, &target.to_string(), &image).context("save failed")?;
    notifier.finish();

    notifier.say(&format!("Saved image to {}", out.display()));
    notifier.say(&format!("You can load it with: docker load -i {}", out.display()));

    Ok(out)
}
