use std::env;
use tracing::debug;

pub const DEFAULT_CLUSTER_NAME: &str = "local-test-cluster";
pub const DEFAULT_LAUNCH_TYPE: &str = "FARGATE";
pub const DEFAULT_SUBNET: &str = "local-subnet-x";
pub const DEFAULT_SECURITY_GROUP: &str = "sg-local-security";
pub const DEFAULT_ASSIGN_PUBLIC_IP: &str = "DISABLED";
pub const DEFAULT_CONTAINER_NAME: &str = "local-test-container";

/// The fixed environment a `RunTask` request must target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTopology {
    pub cluster_name: String,
    pub launch_type: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub assign_public_ip: String,
    pub container_name: String,
}

impl ExpectedTopology {
    /// Defaults, with any `ECS_EMULATOR_*` variable taking precedence.
    pub fn from_env() -> Self {
        let topology = Self {
            cluster_name: env_or("ECS_EMULATOR_CLUSTER", DEFAULT_CLUSTER_NAME),
            launch_type: env_or("ECS_EMULATOR_LAUNCH_TYPE", DEFAULT_LAUNCH_TYPE),
            subnet_id: env_or("ECS_EMULATOR_SUBNET", DEFAULT_SUBNET),
            security_group_id: env_or("ECS_EMULATOR_SECURITY_GROUP", DEFAULT_SECURITY_GROUP),
            assign_public_ip: env_or("ECS_EMULATOR_ASSIGN_PUBLIC_IP", DEFAULT_ASSIGN_PUBLIC_IP),
            container_name: env_or("ECS_EMULATOR_CONTAINER_NAME", DEFAULT_CONTAINER_NAME),
        };
        debug!(?topology, "Resolved expected topology");
        topology
    }
}

impl Default for ExpectedTopology {
    fn default() -> Self {
        Self {
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            launch_type: DEFAULT_LAUNCH_TYPE.to_string(),
            subnet_id: DEFAULT_SUBNET.to_string(),
            security_group_id: DEFAULT_SECURITY_GROUP.to_string(),
            assign_public_ip: DEFAULT_ASSIGN_PUBLIC_IP.to_string(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}
