//! Integration tests for the authorized HTTP transport.
//!
//! A small `axum` app on loopback plays the API. It echoes what it received
//! so tests can assert on headers, query strings, and bodies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::RawQuery;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use medconsole_session::{Claims, SessionManager, codec};
use medconsole_transport::{
    AuthorizedTransport, Form, ListQuery, Navigator, RequestOptions, TransportError, LOGIN_ROUTE,
};
use serde::Deserialize;
use serde_json::{json, Value};

// =========================================================================
// Mock API
// =========================================================================

fn header(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

async fn echo(headers: HeaderMap, RawQuery(query): RawQuery, body: String) -> Json<Value> {
    Json(json!({
        "authorization": header(&headers, "authorization"),
        "accessToken": header(&headers, "accesstoken"),
        "contentType": header(&headers, "content-type"),
        "custom": header(&headers, "x-custom"),
        "query": query,
        "body": body,
    }))
}

fn app() -> Router {
    Router::new()
        .route("/ok", get(|| async { Json(json!({"id": "abc"})) }))
        .route("/echo", get(echo).post(echo).put(echo).patch(echo).delete(echo))
        .route(
            "/unauthorized",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"id": "abc"}))) }),
        )
        .route(
            "/specialty/create",
            post(|| async {
                (StatusCode::BAD_REQUEST, Json(json!({"message": "Invalid specialty"})))
            }),
        )
        .route(
            "/validation",
            put(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"message": ["name is required", "icon is required"]})),
                )
            }),
        )
        .route(
            "/crash",
            patch(|| async {
                (StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>").into_response()
            }),
        )
        .route("/specialty/{id}", delete(|| async { StatusCode::NO_CONTENT }))
}

async fn start_api() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app()).await.unwrap();
    });
    format!("http://{addr}")
}

// =========================================================================
// Helpers
// =========================================================================

#[derive(Clone, Default)]
struct RecordingNavigator {
    routes: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.routes.lock().unwrap().push(route.to_string());
    }
}

fn live_token() -> (String, Claims) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let token = codec::encode_unsigned(&json!({
        "id": "admin-1",
        "name": "Root",
        "email": "root@example.com",
        "role": "admin",
        "exp": now + 3600,
    }));
    let claims = codec::decode(&token).unwrap();
    (token, claims)
}

async fn setup(
    logged_in: bool,
) -> (AuthorizedTransport, SessionManager, RecordingNavigator, Option<String>) {
    let base = start_api().await;
    let session = SessionManager::in_memory();
    let token = if logged_in {
        let (token, claims) = live_token();
        session.save_session(&token, &claims).unwrap();
        Some(token)
    } else {
        None
    };
    let nav = RecordingNavigator::default();
    let transport = AuthorizedTransport::new(&base, session.clone(), nav.clone()).unwrap();
    (transport, session, nav, token)
}

#[derive(Debug, Deserialize, PartialEq)]
struct Created {
    id: String,
}

// =========================================================================
// Success path
// =========================================================================

#[tokio::test]
async fn test_request_success_returns_parsed_body_without_side_effects() {
    let (transport, session, nav, token) = setup(true).await;

    let created: Created = transport.get("/ok").await.unwrap();

    assert_eq!(created, Created { id: "abc".into() });
    assert_eq!(session.current_token(), token);
    assert_eq!(nav.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_injects_bearer_and_legacy_headers() {
    let (transport, _session, _nav, token) = setup(true).await;
    let token = token.unwrap();

    let echoed: Value = transport.get("/echo").await.unwrap();

    assert_eq!(echoed["authorization"], format!("Bearer {token}"));
    assert_eq!(echoed["accessToken"], token);
    assert_eq!(echoed["contentType"], "application/json");
}

#[tokio::test]
async fn test_request_without_session_omits_credentials() {
    let (transport, _session, _nav, _) = setup(false).await;

    let echoed: Value = transport.get("/echo").await.unwrap();

    assert!(echoed["authorization"].is_null());
    assert!(echoed["accessToken"].is_null());
}

#[tokio::test]
async fn test_request_caller_headers_merge_but_credentials_win() {
    let (transport, _session, _nav, token) = setup(true).await;
    let opts = RequestOptions::get()
        .header("x-custom", "yes")
        .unwrap()
        .header("authorization", "Bearer spoofed")
        .unwrap();

    let echoed: Value = transport.request("/echo", opts).await.unwrap();

    assert_eq!(echoed["custom"], "yes");
    assert_eq!(echoed["authorization"], format!("Bearer {}", token.unwrap()));
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let (transport, _session, _nav, _) = setup(true).await;

    let echoed: Value = transport.post("/echo", &json!({"name": "Cardiology"})).await.unwrap();

    let sent: Value = serde_json::from_str(echoed["body"].as_str().unwrap()).unwrap();
    assert_eq!(sent, json!({"name": "Cardiology"}));
}

#[tokio::test]
async fn test_get_with_query_passes_list_parameters_through() {
    let (transport, _session, _nav, _) = setup(true).await;
    let list = ListQuery {
        limit: Some(20),
        offset: Some(40),
        search: Some("nguyen".into()),
    };

    let echoed: Value = transport.get_with_query("/echo", &list).await.unwrap();

    assert_eq!(echoed["query"], "limit=20&offset=40&search=nguyen");
}

#[tokio::test]
async fn test_form_variants_let_multipart_set_content_type() {
    let (transport, _session, _nav, token) = setup(true).await;
    let token = token.unwrap();

    for method in ["post", "put", "patch"] {
        let form = Form::new().text("name", "Cardiology");
        let echoed: Value = match method {
            "post" => transport.post_form("/echo", form).await,
            "put" => transport.put_form("/echo", form).await,
            _ => transport.patch_form("/echo", form).await,
        }
        .unwrap();

        let content_type = echoed["contentType"].as_str().unwrap();
        assert!(
            content_type.starts_with("multipart/form-data; boundary="),
            "{method}: unexpected content type {content_type}"
        );
        assert_eq!(echoed["authorization"], format!("Bearer {token}"));
        assert_eq!(echoed["accessToken"], token);
    }
}

#[tokio::test]
async fn test_delete_no_content_tolerates_empty_body() {
    let (transport, _session, _nav, _) = setup(true).await;

    let body: Value = transport.delete("/specialty/42").await.unwrap();
    assert_eq!(body, Value::Null);

    transport.delete::<()>("/specialty/43").await.unwrap();
}

// =========================================================================
// 401 handling
// =========================================================================

#[tokio::test]
async fn test_unauthorized_clears_session_and_redirects_once() {
    let (transport, session, nav, _) = setup(true).await;

    let err = transport.get::<Value>("/unauthorized").await.unwrap_err();

    assert!(matches!(err, TransportError::Unauthorized));
    assert_eq!(session.current_token(), None);
    assert_eq!(session.current_identity(), None);
    assert_eq!(nav.calls.load(Ordering::SeqCst), 1);
    assert_eq!(nav.routes.lock().unwrap().as_slice(), &[LOGIN_ROUTE.to_string()]);
}

#[tokio::test]
async fn test_unauthorized_preempts_well_formed_body() {
    let (transport, _session, _nav, _) = setup(true).await;

    // The body would deserialize into `Created`; the 401 must still win.
    let err = transport.get::<Created>("/unauthorized").await.unwrap_err();
    assert!(err.is_unauthorized());
}

// =========================================================================
// Other failures
// =========================================================================

#[tokio::test]
async fn test_http_error_uses_message_from_body() {
    let (transport, session, nav, token) = setup(true).await;

    let err = transport
        .post::<Value, _>("/specialty/create", &json!({"name": ""}))
        .await
        .unwrap_err();

    match err {
        TransportError::Http { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid specialty");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    // Non-401 failures never touch the session.
    assert_eq!(session.current_token(), token);
    assert_eq!(nav.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_http_error_joins_validation_messages() {
    let (transport, _session, _nav, _) = setup(true).await;

    let err = transport.put::<Value, _>("/validation", &json!({})).await.unwrap_err();

    assert_eq!(err.to_string(), "name is required, icon is required");
    assert_eq!(err.status(), Some(422));
}

#[tokio::test]
async fn test_http_error_without_json_body_falls_back_to_status() {
    let (transport, _session, _nav, _) = setup(true).await;

    let err = transport.patch::<Value, _>("/crash", &json!({})).await.unwrap_err();

    assert_eq!(err.to_string(), "HTTP 500");
}

#[tokio::test]
async fn test_unknown_route_is_http_404() {
    let (transport, _session, _nav, _) = setup(true).await;

    let err = transport.get::<Value>("/nope").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "HTTP 404");
}

#[tokio::test]
async fn test_unreachable_api_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let session = SessionManager::in_memory();
    let transport =
        AuthorizedTransport::new(&format!("http://{addr}"), session, |_: &str| {}).unwrap();

    let err = transport.get::<Value>("/ok").await.unwrap_err();

    assert!(matches!(err, TransportError::Network(_)));
}
