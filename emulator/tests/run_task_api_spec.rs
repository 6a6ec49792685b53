//! End-to-end tests of the RunTask endpoint through the axum router

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use config_loader::{EnvVar, ExpectedTopology, TaskEnvironment};
use container_runtime::StubRuntime;
use ecs_emulator::{create_app, responses::RUN_TASK_RESPONSE, AppState, RunTaskHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const RUN_TASK_TARGET: &str = "AmazonEC2ContainerServiceV20141113.RunTask";

fn app_with(runtime: Arc<StubRuntime>, environment: TaskEnvironment) -> Router {
    let handler = RunTaskHandler::new(ExpectedTopology::default(), environment, runtime);
    create_app(AppState::new(handler))
}

fn valid_body() -> Value {
    json!({
        "cluster": "local-test-cluster",
        "taskDefinition": "coverage-task",
        "launchType": "FARGATE",
        "networkConfiguration": {
            "awsvpcConfiguration": {
                "subnets": ["local-subnet-x"],
                "securityGroups": ["sg-local-security"],
                "assignPublicIp": "DISABLED"
            }
        }
    })
}

fn post(target: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-amz-json-1.1");
    if let Some(target) = target {
        builder = builder.header("X-Amz-Target", target);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body_bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn given_valid_request_when_run_task_then_fixture_and_launch() {
    let runtime = Arc::new(StubRuntime::new());
    let app = app_with(
        runtime.clone(),
        TaskEnvironment::new(vec![EnvVar::new("A", "1")]),
    );

    let mut body = valid_body();
    body["overrides"] = json!({
        "containerOverrides": [{
            "name": "local-test-container",
            "environment": [{ "name": "A", "value": "2" }]
        }]
    });

    let (status, text) = send(app, post(Some(RUN_TASK_TARGET), body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, RUN_TASK_RESPONSE);
    let launches = runtime.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].image, "coverage-task:latest");
    assert_eq!(
        launches[0].environment,
        vec![EnvVar::new("A", "1"), EnvVar::new("A", "2")]
    );
}

#[tokio::test]
async fn given_other_action_when_posting_then_unsupported() {
    let runtime = Arc::new(StubRuntime::new());
    let app = app_with(runtime.clone(), TaskEnvironment::default());

    let (status, text) = send(
        app,
        post(
            Some("AmazonEC2ContainerServiceV20141113.DescribeTasks"),
            valid_body().to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(envelope["__type"], "ClientException");
    assert_eq!(envelope["message"], "Request not supported");
    assert!(runtime.launches().is_empty());
}

#[tokio::test]
async fn given_missing_target_header_when_posting_then_unsupported() {
    let app = app_with(Arc::new(StubRuntime::new()), TaskEnvironment::default());

    let (status, text) = send(app, post(None, valid_body().to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(envelope["message"], "Request not supported");
}

#[tokio::test]
async fn given_wrong_cluster_and_subnet_then_cluster_not_found() {
    let app = app_with(Arc::new(StubRuntime::new()), TaskEnvironment::default());

    let mut body = valid_body();
    body["cluster"] = json!("prod");
    body["networkConfiguration"]["awsvpcConfiguration"]["subnets"] = json!(["subnet-1"]);

    let (status, text) = send(app, post(Some(RUN_TASK_TARGET), body.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(envelope["__type"], "ClusterNotFoundException");
}

#[tokio::test]
async fn given_malformed_body_then_client_exception() {
    let app = app_with(Arc::new(StubRuntime::new()), TaskEnvironment::default());

    let (status, text) = send(app, post(Some(RUN_TASK_TARGET), "not json".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(envelope["__type"], "ClientException");
}

#[tokio::test]
async fn given_launch_failure_then_server_exception() {
    let app = app_with(
        Arc::new(StubRuntime::new().refusing_launches()),
        TaskEnvironment::default(),
    );

    let (status, text) = send(app, post(Some(RUN_TASK_TARGET), valid_body().to_string())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let envelope: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(envelope["__type"], "ServerException");
}

#[tokio::test]
async fn given_get_request_then_method_not_allowed() {
    let app = app_with(Arc::new(StubRuntime::new()), TaskEnvironment::default());

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn healthz_returns_ok() {
    let app = app_with(Arc::new(StubRuntime::new()), TaskEnvironment::default());

    let request = Request::builder()
        .method("GET")
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}
