//! Startup configuration for the ECS emulator.
//!
//! Two pieces of configuration are fixed when the service starts and never
//! change afterwards: the [`ExpectedTopology`] that inbound requests are
//! compared against, and the [`TaskEnvironment`] injected into every launched
//! container.

use thiserror::Error;

pub mod environment;
pub mod topology;

pub use environment::{rewrite_loopback, DockerHostAlias, EnvVar, TaskEnvironment};
pub use topology::ExpectedTopology;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Task environment file not found: {path}")]
    EnvFileNotFound { path: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Failed to parse task environment file {path}: {message}")]
    ParseFailed { path: String, message: String },

    #[error("Task environment must be an object or a list of name/value pairs")]
    UnsupportedShape,

    #[error("Invalid value for task environment variable '{name}': {message}")]
    InvalidValue { name: String, message: String },
}
