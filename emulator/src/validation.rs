//! Request validation and translation into a container launch.
//!
//! Checks run in a fixed order and the first failing check decides the
//! error; nothing is aggregated.

use config_loader::{ExpectedTopology, TaskEnvironment};
use container_runtime::{ContainerRuntime, LaunchInvocation, RuntimeError};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::model::RunTaskRequest;

pub const SUPPORTED_ACTION_SUFFIX: &str = "RunTask";
pub const IMAGE_TAG: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedAction,
    ClusterNotFound,
    ClientException,
    InvalidParameter,
}

impl ErrorKind {
    /// Value of `__type` in the error envelope, as the ECS API names it.
    pub fn wire_type(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedAction => "ClientException",
            ErrorKind::ClusterNotFound => "ClusterNotFoundException",
            ErrorKind::ClientException => "ClientException",
            ErrorKind::InvalidParameter => "InvalidParameterException",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_type())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClientException, message)
    }

    fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }
}

/// Why a request did not produce a launch invocation.
#[derive(Error, Debug)]
pub enum Rejection {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("container runtime failure: {0}")]
    Runtime(#[from] RuntimeError),
}

pub fn image_reference(task_definition: &str) -> String {
    format!("{}:{}", task_definition, IMAGE_TAG)
}

pub struct Validator<'a> {
    topology: &'a ExpectedTopology,
    environment: &'a TaskEnvironment,
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> Validator<'a> {
    pub fn new(
        topology: &'a ExpectedTopology,
        environment: &'a TaskEnvironment,
        runtime: &'a dyn ContainerRuntime,
    ) -> Self {
        Self {
            topology,
            environment,
            runtime,
        }
    }

    pub fn translate(
        &self,
        body: &[u8],
        action: Option<&str>,
    ) -> Result<LaunchInvocation, Rejection> {
        if !action.is_some_and(|a| a.ends_with(SUPPORTED_ACTION_SUFFIX)) {
            return Err(
                ValidationError::new(ErrorKind::UnsupportedAction, "Request not supported").into(),
            );
        }

        let request: RunTaskRequest = serde_json::from_slice(body).map_err(|err| {
            ValidationError::client(format!("Unable to parse request body: {}", err))
        })?;

        let topology = self.topology;

        if request.cluster.as_deref() != Some(topology.cluster_name.as_str()) {
            return Err(ValidationError::new(ErrorKind::ClusterNotFound, "Cluster not found").into());
        }

        let task_definition = request
            .task_definition
            .as_deref()
            .ok_or_else(|| ValidationError::client("Task definition not provided"))?;

        let image = image_reference(task_definition);
        if !self.runtime.image_exists(&image)? {
            return Err(ValidationError::client(format!(
                "TaskDefinition not found. No Docker image: {}",
                image
            ))
            .into());
        }

        if request.launch_type.as_deref() != Some(topology.launch_type.as_str()) {
            debug!(
                launch_type = ?request.launch_type,
                expected = %topology.launch_type,
                "Launch type differs from expected; not enforced"
            );
        }

        let vpc = request
            .network_configuration
            .as_ref()
            .and_then(|n| n.awsvpc_configuration.as_ref())
            .ok_or_else(|| {
                ValidationError::invalid_parameter(
                    "Network Configuration must be provided when networkMode 'awsvpc' is specified",
                )
            })?;

        let subnet = vpc
            .subnets
            .as_deref()
            .and_then(|items| items.first())
            .ok_or_else(|| ValidationError::invalid_parameter("subnets can not be empty"))?;
        if *subnet != topology.subnet_id {
            return Err(ValidationError::invalid_parameter(format!(
                "The subnet ID {} does not exist",
                subnet
            ))
            .into());
        }

        let security_group = vpc
            .security_groups
            .as_deref()
            .and_then(|items| items.first())
            .ok_or_else(|| ValidationError::invalid_parameter("securityGroups can not be empty"))?;
        if *security_group != topology.security_group_id {
            return Err(ValidationError::invalid_parameter(format!(
                "The security group {} does not exist",
                security_group
            ))
            .into());
        }

        if vpc.assign_public_ip.as_deref() != Some(topology.assign_public_ip.as_str()) {
            return Err(ValidationError::invalid_parameter(format!(
                "The assignPublicIp policy for this deployment should be {}",
                topology.assign_public_ip
            ))
            .into());
        }

        if let Some(container) = request.first_container_override() {
            let name = container
                .name
                .as_deref()
                .ok_or_else(|| ValidationError::client("Container override name not provided"))?;
            if name != topology.container_name {
                return Err(ValidationError::invalid_parameter(format!(
                    "The container override name {} does not match container {}",
                    name, topology.container_name
                ))
                .into());
            }
        }

        // Overrides are appended after the base environment; duplicates are kept.
        let mut environment = self.environment.vars().to_vec();
        environment.extend(request.environment_overrides());

        Ok(LaunchInvocation { image, environment })
    }
}
