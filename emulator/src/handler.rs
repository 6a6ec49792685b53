use config_loader::{ExpectedTopology, TaskEnvironment};
use container_runtime::ContainerRuntime;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::responses::ApiResponse;
use crate::validation::{Rejection, Validator};

/// Turns one raw `RunTask` call into a response, launching a container when
/// the request is accepted.
pub struct RunTaskHandler {
    topology: ExpectedTopology,
    environment: TaskEnvironment,
    runtime: Arc<dyn ContainerRuntime>,
}

impl RunTaskHandler {
    pub fn new(
        topology: ExpectedTopology,
        environment: TaskEnvironment,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            topology,
            environment,
            runtime,
        }
    }

    pub fn topology(&self) -> &ExpectedTopology {
        &self.topology
    }

    pub fn handle(&self, body: &[u8], action: Option<&str>) -> ApiResponse {
        let validator = Validator::new(&self.topology, &self.environment, self.runtime.as_ref());

        let invocation = match validator.translate(body, action) {
            Ok(invocation) => invocation,
            Err(Rejection::Invalid(err)) => {
                let response = ApiResponse::validation_error(&err);
                info!("Finished sending error: {}", response.body);
                return response;
            }
            Err(Rejection::Runtime(err)) => {
                error!("Container runtime unavailable: {}", err);
                return ApiResponse::server_error(&err.to_string());
            }
        };

        match self.runtime.launch(&invocation) {
            Ok(container) => {
                info!(
                    image = %invocation.image,
                    container_id = ?container.container_id,
                    variables = invocation.environment.len(),
                    "Finished sending successful response"
                );
                ApiResponse::run_task_success()
            }
            Err(err) => {
                warn!(image = %invocation.image, "Docker run failed");
                error!("Failed to launch task container: {}", err);
                ApiResponse::server_error(&format!("Docker run failed: {}", err))
            }
        }
    }
}
