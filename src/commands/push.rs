use anyhow::{Context, Result};
use clap::Args;

use crate::notifier::Notifier;
use crate::registry::reference::parse_reference;
use crate::registry::{RegistryClient, RegistryConfig};

/// Copy an image from one registry to another.
#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    #[arg(long, default_value = "busybox:latest", help = "Image to pull")]
    pub src: String,

    #[arg(
        long,
        default_value = "localhost:5000/mybusybox:latest",
        help = "Destination reference"
    )]
    pub dst: String,

    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set,
        help = "Allow plain HTTP to the destination registry; --insecure=false for TLS"
    )]
    pub insecure: bool,

    #[arg(long, default_value_t = 600, help = "Pull/push timeout in seconds")]
    pub timeout: u64,
}

/// Pulls `src` and pushes it unchanged to `dst`. Returns the pushed manifest URL.
pub async fn run(args: &PushArgs, notifier: &Notifier) -> Result<String> {
    let src = parse_reference(&args.src)?;
    let dst = parse_reference(&args.dst)?;

    let config = RegistryConfig::new(dst.registry(), args.insecure)
        .with_pull_timeout(std::time::Duration::from_secs(args.timeout));
    let client = RegistryClient::new(config)?;

    notifier.say(&format!("Pulling {}", args.src));
    let image = client.pull_image_data(&src).await.context("pull failed")?;
    notifier.debug(&format!(
        "Pulled {} layers of {}",
        image.layers.len(),
        src.whole()
    ));

    notifier.say(&format!("Pushing {}", args.dst));
    let manifest_url = client.push_image(image, &dst).await.context("push failed")?;
    notifier.debug(&format!("Manifest available at {}", manifest_url));

    notifier.say(&format!("Push complete: {}", args.dst));
    Ok(manifest_url)
}
