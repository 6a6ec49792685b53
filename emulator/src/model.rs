//! Wire shape of the `RunTask` request body.
//!
//! Every field is optional at this level; presence and values are checked by
//! the validator so that failures come out in a fixed order. Unknown fields
//! (`count`, `startedBy`, `tags`, ...) are ignored.

use config_loader::EnvVar;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskRequest {
    pub cluster: Option<String>,
    pub task_definition: Option<String>,
    pub launch_type: Option<String>,
    pub network_configuration: Option<NetworkConfiguration>,
    pub overrides: Option<TaskOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub awsvpc_configuration: Option<AwsVpcConfiguration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsVpcConfiguration {
    pub subnets: Option<Vec<String>>,
    pub security_groups: Option<Vec<String>>,
    pub assign_public_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOverride {
    pub container_overrides: Option<Vec<ContainerOverride>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    pub name: Option<String>,
    pub environment: Option<Vec<EnvVar>>,
}

impl RunTaskRequest {
    pub fn first_container_override(&self) -> Option<&ContainerOverride> {
        self.overrides
            .as_ref()
            .and_then(|o| o.container_overrides.as_ref())
            .and_then(|overrides| overrides.first())
    }

    /// Environment overrides of the first container override, empty when absent.
    pub fn environment_overrides(&self) -> Vec<EnvVar> {
        self.first_container_override()
            .and_then(|o| o.environment.clone())
            .unwrap_or_default()
    }
}
