//! Container runtime driver used by the emulator to check for images and
//! launch task containers.
//!
//! The runtime binary is picked from `ECS_EMULATOR_CONTAINER_RUNTIME`
//! (`docker` when unset). The special value `stub` selects an in-memory
//! runtime that accepts every image and only records launches.

use config_loader::EnvVar;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod docker;
pub mod stub;

pub use docker::DockerCli;
pub use stub::StubRuntime;

pub const RUNTIME_VAR: &str = "ECS_EMULATOR_CONTAINER_RUNTIME";

/// A concrete container launch produced from an accepted `RunTask` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchInvocation {
    pub image: String,
    pub environment: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedContainer {
    /// Identifier printed by the runtime, when it printed one.
    pub container_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to spawn container runtime {runtime}: {source}")]
    Spawn {
        runtime: String,
        source: std::io::Error,
    },
    #[error("Container runtime command `{command}` exited with {code:?}: {stderr}")]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Stub runtime refused to launch {image}")]
    StubLaunchRefused { image: String },
}

pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Whether an image with this reference is available locally.
    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Starts a detached container for the invocation.
    fn launch(&self, invocation: &LaunchInvocation) -> Result<LaunchedContainer, RuntimeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeKind {
    Binary(String),
    Stub,
}

pub fn detect_runtime_kind() -> RuntimeKind {
    match env::var(RUNTIME_VAR) {
        Ok(val) if val.trim().eq_ignore_ascii_case("stub") => RuntimeKind::Stub,
        Ok(val) if !val.trim().is_empty() => RuntimeKind::Binary(val.trim().to_string()),
        _ => RuntimeKind::Binary("docker".to_string()),
    }
}

pub fn runtime_from_env() -> Arc<dyn ContainerRuntime> {
    let runtime: Arc<dyn ContainerRuntime> = match detect_runtime_kind() {
        RuntimeKind::Stub => Arc::new(StubRuntime::new()),
        RuntimeKind::Binary(bin) => Arc::new(DockerCli::new(bin)),
    };
    info!(runtime = runtime.name(), "Selected container runtime");
    runtime
}
