pub mod archive;
pub mod commands;
pub mod diagnose;
pub mod gc;
pub mod notifier;
pub mod registry;

// Re-exports for easy access
pub use archive::{read_archive_manifest, write_archive, ArchiveManifest};
pub use diagnose::RegistryErrorCode;
pub use gc::GarbageCollector;
pub use notifier::Notifier;
pub use registry::{ImageTarget, PulledImage, RegistryClient, RegistryConfig};
