use crate::integration::common::mock_registry::MockRegistry;
use crate::integration::common::test_notifier;
use regcrane::commands::pull::{self, PullArgs};
use regcrane::read_archive_manifest;
use std::fs::File;
use std::io::Read;
use tempfile::TempDir;

fn pull_args(registry: &str, repo: &str, tag: &str, out: &std::path::Path) -> PullArgs {
    PullArgs {
        registry: registry.to_string(),
        repo: repo.to_string(),
        tag: tag.to_string(),
        out: Some(out.to_path_buf()),
        insecure: true,
        timeout: 30,
    }
}

#[tokio::test]
async fn test_pull_saves_loadable_archive() {
    let registry = MockRegistry::start().await;
    let image = registry.seed_image("golang", &["1.21-alpine"], &["base layer", "go toolchain"]);
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("images/golang.tar");

    let saved = pull::run(
        &pull_args(&registry.host(), "golang", "1.21-alpine", &out),
        &test_notifier(),
    )
    .await
    .unwrap();
    assert_eq!(saved, out);

    let manifests = read_archive_manifest(&out).unwrap();
    assert_eq!(manifests.len(), 1);
    let manifest = &manifests[0];
    assert_eq!(manifest.config, image.config_digest);
    assert_eq!(
        manifest.repo_tags,
        vec![format!("{}/golang:1.21-alpine", registry.host())]
    );
    let expected_layers: Vec<String> = image
        .layer_digests
        .iter()
        .map(|digest| format!("{}.tar.gz", digest.trim_start_matches("sha256:")))
        .collect();
    assert_eq!(manifest.layers, expected_layers);

    // layer blobs are stored byte for byte, in manifest order
    let mut archive = tar_rs::Archive::new(File::open(&out).unwrap());
    let mut names = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().to_string();
        if let Some(i) = expected_layers.iter().position(|layer| *layer == name) {
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            assert_eq!(data, image.layers[i]);
        }
        names.push(name);
    }
    let mut expected_names = vec![image.config_digest.clone()];
    expected_names.extend(expected_layers);
    expected_names.push("manifest.json".to_string());
    assert_eq!(names, expected_names);
}

#[tokio::test]
async fn test_pull_missing_tag_fails_without_output() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("golang_nope.tar");

    let err = pull::run(
        &pull_args(&registry.host(), "golang", "nope", &out),
        &test_notifier(),
    )
    .await
    .unwrap_err();

    assert!(format!("{:#}", err).starts_with("pull failed"));
    assert!(!out.exists());
}
