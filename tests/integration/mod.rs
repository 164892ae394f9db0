//! Integration tests for the orbit HTTP service.
//!
//! Most tests drive the router in-process with `oneshot`; one binds a real
//! listener on a loopback port.

use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use chrono::{DateTime, Utc};
use serde::ser::{Error as _, Serializer};
use serde::Serialize;
use tower::ServiceExt;

use orbit::api::handlers::{UNKNOWN_HOSTNAME, VERSION};
use orbit::api::middleware::log_requests;
use orbit::api::{create_router, AppState, RequestDeadline};
use orbit::logging::capture::CapturedLogs;
use orbit::utils::Shutdown;
use orbit::{server, Config, Logger};

/// Value whose serialization always fails.
struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("injected encode failure"))
    }
}

fn test_state() -> AppState {
    AppState::new(Logger::disabled(), &Config::default())
}

fn setup() -> Router {
    create_router(test_state())
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn assert_recent(timestamp: &serde_json::Value) {
    let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(timestamp.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc);
    let drift = (Utc::now() - parsed).num_seconds().abs();
    assert!(drift <= 5, "timestamp {parsed} is {drift}s away from now");
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], VERSION);
    assert_eq!(json["version"], "1.0.0");
    let hostname = json["hostname"].as_str().unwrap();
    assert!(!hostname.is_empty());
    assert_recent(&json["timestamp"]);
}

#[tokio::test]
async fn test_health_hostname_matches_system() {
    let app = setup();

    let json = json_body(app.oneshot(get_request("/health")).await.unwrap()).await;

    let expected = match hostname::get() {
        Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        _ => UNKNOWN_HOSTNAME.to_string(),
    };
    assert_eq!(json["hostname"], expected);
}

#[tokio::test]
async fn test_status() {
    let app = setup();

    let response = app.oneshot(get_request("/api/v1/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "operational");
    assert_eq!(json["services"]["database"], "connected");
    assert_eq!(json["services"]["cache"], "connected");
    assert_recent(&json["timestamp"]);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let app = setup();

    let response = app.oneshot(get_request("/api/v2/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_methods_are_405() {
    for (method, uri) in [
        ("POST", "/health"),
        ("DELETE", "/health"),
        ("PUT", "/api/v1/status"),
    ] {
        let response = setup()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{method} {uri}"
        );
    }
}

#[tokio::test]
async fn test_openapi_document() {
    let app = setup();

    let response = app
        .oneshot(get_request("/api-docs/openapi.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["paths"]["/health"].is_object());
    assert!(json["paths"]["/api/v1/status"].is_object());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_health_checks() {
    let app = setup();

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { app.oneshot(get_request("/health")).await.unwrap() })
        })
        .collect();

    let responses = futures::future::join_all(handles).await;
    assert_eq!(responses.len(), 100);

    for response in responses {
        let response = response.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], VERSION);
        assert!(!json["hostname"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_encode_failure_is_500_and_logged_once() {
    async fn broken(State(state): State<AppState>) -> Response {
        state.json.write(&Unserializable, StatusCode::OK)
    }

    let logs = CapturedLogs::default();
    let state = AppState::new(logs.logger(), &Config::default());
    let app = Router::new()
        .route("/broken", get(broken))
        .layer(from_fn_with_state(state.clone(), log_requests))
        .with_state(state);

    let response = app.oneshot(get_request("/broken")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"Internal Server Error");
    assert!(!String::from_utf8_lossy(&body).contains("injected"));

    assert_eq!(logs.count("failed to serialize JSON response"), 1);
    assert!(logs.contents().contains("status=500"));
}

#[tokio::test]
async fn test_handlers_see_request_deadline() {
    async fn budget(Extension(deadline): Extension<RequestDeadline>) -> String {
        deadline.budget().as_millis().to_string()
    }

    let (config, _) = Config::from_vars(vec![("API_TIMEOUT".to_string(), "2500ms".to_string())]);
    let state = AppState::new(Logger::disabled(), &config);
    let app = Router::new()
        .route("/budget", get(budget))
        .layer(from_fn_with_state(state.clone(), log_requests))
        .with_state(state);

    let response = app.oneshot(get_request("/budget")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"2500");
}

#[tokio::test]
async fn test_serves_over_tcp_and_shuts_down() {
    let listener = server::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            server::serve(listener, setup(), &Logger::disabled(), shutdown).await
        })
    };

    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server did not shut down")
        .unwrap()
        .unwrap();
}
