//! One module per subcommand. Each `run` is a straight sequence of registry calls
//! that prints what it finds and returns the first error it cannot get past.

pub mod catalog;
pub mod delete;
pub mod pull;
pub mod push;

use crate::notifier::Notifier;
use crate::registry::RegistryClient;
use anyhow::Result;
use oci_client::Reference;

/// Indented tag listing, or a `(no tags)` marker.
pub fn tag_lines(tags: &[String]) -> Vec<String> {
    if tags.is_empty() {
        return vec!["  (no tags)".to_string()];
    }
    tags.iter().map(|tag| format!("  {}", tag)).collect()
}

/// Prints the tags of the repository behind `reference`.
pub(crate) async fn print_tags(
    client: &RegistryClient,
    reference: &Reference,
    notifier: &Notifier,
) -> Result<Vec<String>> {
    notifier.say(&format!(
        "\nTags for repo {}/{}:",
        reference.registry(),
        reference.repository()
    ));
    let tags = client.list_tags(reference).await?;
    for line in tag_lines(&tags) {
        notifier.say(&line);
    }
    Ok(tags)
}
