use anyhow::{anyhow, Context, Result};
use log::info;
use std::process::{Command, Stdio};

pub const DEFAULT_CONTAINER: &str = "local-registry";
pub const REGISTRY_BINARY: &str = "/bin/registry";
pub const REGISTRY_CONFIG: &str = "/etc/docker/registry/config.yml";

/// Runs `registry garbage-collect` inside the registry's container through `docker exec`.
///
/// The command is non-interactive (no `-it`); its output streams straight to ours.
#[derive(Debug, Clone)]
pub struct GarbageCollector {
    docker: String,
    container: String,
}

impl GarbageCollector {
    pub fn new(container: &str) -> Self {
        Self {
            docker: "docker".to_string(),
            container: container.to_string(),
        }
    }

    /// Uses another docker-compatible CLI (e.g. `podman`, `nerdctl`).
    pub fn with_docker(mut self, docker: &str) -> Self {
        self.docker = docker.to_string();
        self
    }

    /// Arguments passed to the docker CLI.
    pub fn args(&self) -> Vec<String> {
        vec![
            "exec".to_string(),
            self.container.clone(),
            REGISTRY_BINARY.to_string(),
            "garbage-collect".to_string(),
            "--delete-untagged".to_string(),
            REGISTRY_CONFIG.to_string(),
        ]
    }

    /// The full command line, for logging.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.docker.clone()];
        parts.extend(self.args());
        parts.join(" ")
    }

    pub fn run(&self) -> Result<()> {
        info!("Running command: {}", self.command_line());

        let status = Command::new(&self.docker)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| {
                format!(
                    "Failed to execute {} command. Is it installed and running?",
                    self.docker
                )
            })?;

        if !status.success() {
            return Err(anyhow!(
                "garbage-collect in container '{}' failed: {}",
                self.container,
                status
            ));
        }

        Ok(())
    }
}
