use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, error};
use std::process;

use regcrane::commands::catalog::{self, CatalogArgs};
use regcrane::commands::delete::{self, DeleteArgs};
use regcrane::commands::pull::{self, PullArgs};
use regcrane::commands::push::{self, PushArgs};
use regcrane::notifier::{init_logging, VerbosityLevel};
use regcrane::Notifier;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v for info, -vv for debug, -vvv for trace). Also switches off the spinner"
    )]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull an image and save it as a tarball for `docker load`
    Pull(PullArgs),
    /// Pull an image and push it to another registry
    Push(PushArgs),
    /// Resolve a tag to its digest and delete the manifest
    Delete(DeleteArgs),
    /// List repositories and tags; optionally delete a manifest and run garbage-collect
    Catalog(CatalogArgs),
}

fn main() {
    let cli = Cli::parse();

    init_logging(VerbosityLevel::from(cli.verbose));

    if let Err(err) = run(cli) {
        error!("{:#}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let notifier = Notifier::new(cli.verbose);
    debug!("Verbosity: {:?}", notifier.verbosity_level());

    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Pull(args) => {
                debug!("Pull: {:?}", args);
                pull::run(args, &notifier).await.map(|_| ())
            }
            Commands::Push(args) => {
                debug!("Push: {:?}", args);
                push::run(args, &notifier).await.map(|_| ())
            }
            Commands::Delete(args) => {
                debug!("Delete: {:?}", args);
                delete::run(args, &notifier).await.map(|_| ())
            }
            Commands::Catalog(args) => {
                debug!("Catalog: {:?}", args);
                catalog::run(args, &notifier).await.map(|_| ())
            }
        }
    })
}
