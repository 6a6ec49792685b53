//! Response envelopes returned to ECS clients.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::validation::ValidationError;

/// Canned `RunTask` result. It describes one PROVISIONING task and does not
/// reflect the container that was actually launched.
pub const RUN_TASK_RESPONSE: &str = include_str!("fixtures/run_task_response.json");

pub const SERVER_EXCEPTION: &str = "ServerException";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn run_task_success() -> Self {
        Self {
            status: StatusCode::OK,
            body: RUN_TASK_RESPONSE.to_string(),
        }
    }

    pub fn validation_error(error: &ValidationError) -> Self {
        Self::error(StatusCode::BAD_REQUEST, error.kind.wire_type(), &error.message)
    }

    pub fn server_error(message: &str) -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, SERVER_EXCEPTION, message)
    }

    pub fn error(status: StatusCode, error_type: &str, message: &str) -> Self {
        Self {
            status,
            body: json!({ "__type": error_type, "message": message }).to_string(),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ErrorKind;
    use serde_json::Value;

    #[test]
    fn success_fixture_is_a_provisioning_task() {
        let body: Value = serde_json::from_str(RUN_TASK_RESPONSE).unwrap();
        assert_eq!(body["failures"], Value::Array(vec![]));
        assert_eq!(body["tasks"][0]["lastStatus"], "PROVISIONING");
        assert_eq!(body["tasks"][0]["launchType"], "FARGATE");
    }

    #[test]
    fn validation_error_envelope_shape() {
        let response = ApiResponse::validation_error(&ValidationError::new(
            ErrorKind::ClusterNotFound,
            "Cluster not found",
        ));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["__type"], "ClusterNotFoundException");
        assert_eq!(body["message"], "Cluster not found");
    }

    #[test]
    fn error_message_is_json_escaped() {
        let response = ApiResponse::server_error("docker said \"no\"");
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["message"], "docker said \"no\"");
    }
}
