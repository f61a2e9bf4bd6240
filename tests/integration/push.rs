use crate::integration::common::mock_registry::MockRegistry;
use crate::integration::common::test_notifier;
use regcrane::commands::pull::{self, PullArgs};
use regcrane::commands::push::{self, PushArgs};
use regcrane::read_archive_manifest;
use tempfile::TempDir;

fn push_args(src: String, dst: String) -> PushArgs {
    PushArgs {
        src,
        dst,
        insecure: true,
        timeout: 30,
    }
}

#[tokio::test]
async fn test_push_copies_image_between_repositories() {
    let registry = MockRegistry::start().await;
    let image = registry.seed_image("busybox", &["latest"], &["rootfs", "etc"]);

    let manifest_url = push::run(
        &push_args(
            format!("{}/busybox:latest", registry.host()),
            format!("{}/mybusybox:latest", registry.host()),
        ),
        &test_notifier(),
    )
    .await
    .unwrap();

    assert_eq!(registry.tags("mybusybox"), vec!["latest"]);
    let pushed = registry.tag_digest("mybusybox", "latest").unwrap();
    assert!(registry.has_manifest("mybusybox", &pushed));
    assert!(manifest_url.contains("/v2/mybusybox/manifests/"));
    assert!(registry.has_blob(&image.config_digest));
    for digest in &image.layer_digests {
        assert!(registry.has_blob(digest));
    }

    // the copy pulls back with the source's config and layers
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("mybusybox.tar");
    pull::run(
        &PullArgs {
            registry: registry.host(),
            repo: "mybusybox".to_string(),
            tag: "latest".to_string(),
            out: Some(out.clone()),
            insecure: true,
            timeout: 30,
        },
        &test_notifier(),
    )
    .await
    .unwrap();

    let manifests = read_archive_manifest(&out).unwrap();
    assert_eq!(manifests[0].config, image.config_digest);
    assert_eq!(manifests[0].layers.len(), image.layer_digests.len());
}

#[tokio::test]
async fn test_push_missing_source_fails_without_pushing() {
    let registry = MockRegistry::start().await;
    registry.seed_image("busybox", &["latest"], &["rootfs"]);

    let err = push::run(
        &push_args(
            format!("{}/busybox:ghost", registry.host()),
            format!("{}/mybusybox:latest", registry.host()),
        ),
        &test_notifier(),
    )
    .await
    .unwrap_err();

    assert!(format!("{:#}", err).starts_with("pull failed"));
    assert!(registry.tags("mybusybox").is_empty());
}
