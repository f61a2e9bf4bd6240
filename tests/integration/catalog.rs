use crate::integration::common::mock_registry::{DigestHeader, MockRegistry};
use crate::integration::common::test_notifier;
use axum::http::StatusCode;
use regcrane::commands::catalog::{self, CatalogArgs};

fn catalog_args(registry: &str) -> CatalogArgs {
    CatalogArgs {
        registry: registry.to_string(),
        repo: None,
        tag: "latest".to_string(),
        delete: false,
        gc: false,
        container: "local-registry".to_string(),
        docker: "docker".to_string(),
        timeout: 10,
        insecure: true,
    }
}

fn delete_args(registry: &str, repo: &str, tag: &str) -> CatalogArgs {
    CatalogArgs {
        repo: Some(repo.to_string()),
        tag: tag.to_string(),
        delete: true,
        ..catalog_args(registry)
    }
}

#[tokio::test]
async fn test_catalog_lists_repositories_and_tags() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["1.21-alpine", "latest"], &["go"]);
    registry.seed_image("busybox", &["latest"], &["bb"]);

    let report = catalog::run(&catalog_args(&registry.host()), &test_notifier())
        .await
        .unwrap();

    assert_eq!(report.repositories, vec!["busybox", "golang"]);
    assert_eq!(report.tags["golang"], vec!["1.21-alpine", "latest"]);
    assert_eq!(report.tags["busybox"], vec!["latest"]);
    assert_eq!(report.deleted, None);
    assert!(!report.garbage_collected);
}

#[tokio::test]
async fn test_catalog_accepts_scheme_prefixed_registry() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);

    let args = CatalogArgs {
        insecure: false,
        ..catalog_args(&format!("http://{}/", registry.host()))
    };
    let report = catalog::run(&args, &test_notifier()).await.unwrap();

    assert_eq!(report.repositories, vec!["golang"]);
}

#[tokio::test]
async fn test_catalog_empty_registry() {
    let registry = MockRegistry::start().await;

    let report = catalog::run(&catalog_args(&registry.host()), &test_notifier())
        .await
        .unwrap();

    assert!(report.repositories.is_empty());
    assert!(report.tags.is_empty());
}

#[tokio::test]
async fn test_catalog_error_status_is_reported() {
    let registry = MockRegistry::start().await;
    registry.set_catalog_status(StatusCode::INTERNAL_SERVER_ERROR);

    let err = catalog::run(&catalog_args(&registry.host()), &test_notifier())
        .await
        .unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.contains("fetching catalog failed"));
    assert!(message.contains("catalog returned status 500: catalog unavailable"));
}

#[tokio::test]
async fn test_delete_removes_only_the_requested_tag() {
    let registry = MockRegistry::start().await;
    let alpine = registry.seed_image("golang", &["1.21-alpine"], &["alpine"]);
    let latest = registry.seed_image("golang", &["latest"], &["bookworm"]);

    let report = catalog::run(
        &delete_args(&registry.host(), "golang", "1.21-alpine"),
        &test_notifier(),
    )
    .await
    .unwrap();

    assert_eq!(report.deleted, Some(alpine.manifest_digest.clone()));
    assert_eq!(registry.tags("golang"), vec!["latest"]);
    assert!(!registry.has_manifest("golang", &alpine.manifest_digest));
    assert!(registry.has_manifest("golang", &latest.manifest_digest));
}

#[tokio::test]
async fn test_repository_emptied_by_delete_lists_no_tags() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);
    registry.seed_image("busybox", &["latest"], &["bb"]);

    let report = catalog::run(
        &delete_args(&registry.host(), "golang", "latest"),
        &test_notifier(),
    )
    .await
    .unwrap();
    assert!(report.deleted.is_some());

    // the registry now answers `"tags": null` for golang
    let report = catalog::run(&catalog_args(&registry.host()), &test_notifier())
        .await
        .unwrap();
    assert_eq!(report.repositories, vec!["busybox", "golang"]);
    assert_eq!(report.tags["golang"], Vec::<String>::new());
    assert_eq!(report.tags["busybox"], vec!["latest"]);
}

#[tokio::test]
async fn test_delete_requires_repo() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);

    let args = CatalogArgs {
        delete: true,
        ..catalog_args(&registry.host())
    };
    let err = catalog::run(&args, &test_notifier()).await.unwrap_err();

    assert_eq!(err.to_string(), "please provide --repo when using --delete");
    assert_eq!(registry.tags("golang"), vec!["latest"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_gc_runs_after_delete() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);

    // `true` ignores the exec arguments and succeeds
    let args = CatalogArgs {
        gc: true,
        docker: "true".to_string(),
        ..delete_args(&registry.host(), "golang", "latest")
    };
    let report = catalog::run(&args, &test_notifier()).await.unwrap();

    assert!(report.deleted.is_some());
    assert!(report.garbage_collected);
}

#[cfg(unix)]
#[tokio::test]
async fn test_gc_failure_is_reported() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);

    let args = CatalogArgs {
        gc: true,
        docker: "false".to_string(),
        container: "registry".to_string(),
        ..delete_args(&registry.host(), "golang", "latest")
    };
    let err = catalog::run(&args, &test_notifier()).await.unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.starts_with("garbage-collect failed"));
    assert!(message.contains("garbage-collect in container 'registry' failed"));
}

#[tokio::test]
async fn test_delete_disabled_explains_storage_setting() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);
    registry.set_delete_enabled(false);

    let err = catalog::run(
        &delete_args(&registry.host(), "golang", "latest"),
        &test_notifier(),
    )
    .await
    .unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.contains("UNSUPPORTED"));
    assert!(message.contains("REGISTRY_STORAGE_DELETE_ENABLED=true"));
    assert_eq!(registry.tags("golang"), vec!["latest"]);
}

#[tokio::test]
async fn test_delete_reads_content_digest_header() {
    let registry = MockRegistry::start().await;
    let image = registry.seed_image("golang", &["latest"], &["go"]);
    registry.set_digest_header(DigestHeader::ContentDigest);

    let report = catalog::run(
        &delete_args(&registry.host(), "golang", "latest"),
        &test_notifier(),
    )
    .await
    .unwrap();

    assert_eq!(report.deleted, Some(image.manifest_digest));
    assert!(registry.tags("golang").is_empty());
}

#[tokio::test]
async fn test_delete_without_digest_header_fails() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);
    registry.set_digest_header(DigestHeader::Missing);

    let err = catalog::run(
        &delete_args(&registry.host(), "golang", "latest"),
        &test_notifier(),
    )
    .await
    .unwrap_err();

    assert!(format!("{:#}", err).contains("digest header not found (status 200)"));
    assert_eq!(registry.tags("golang"), vec!["latest"]);
}

#[tokio::test]
async fn test_delete_missing_tag_explains_not_found() {
    let registry = MockRegistry::start().await;
    registry.seed_image("golang", &["latest"], &["go"]);

    let err = catalog::run(
        &delete_args(&registry.host(), "golang", "nope"),
        &test_notifier(),
    )
    .await
    .unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.contains(&format!(
        "manifest not found for {}/golang:nope",
        registry.host()
    )));
    assert!(message.contains("manifest HEAD returned status 404"));
}
