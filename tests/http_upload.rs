//! Integration tests for the HTTP query endpoint.
//!
//! Spins up an Axum server on a random port that plays the role of the
//! management API, records every request it receives, and answers from a
//! per-test responder. Verifies request shape, response classification and
//! the halt-on-first-error contract over a real HTTP connection.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::routing::post;
use seed_loader::{
    ClientConfig, ClientError, ManagementApiClient, Phase, QueryEndpoint, QueryResponse,
    UploadError, UploadOptions, Uploader,
};
use tokio::net::TcpListener;

const QUERY_PATH: &str = "/v1/projects/test/database/query";
const TOKEN: &str = "sbp_test_token";

const SCRIPT: &str = "
-- seed
INSERT INTO profiles (id, name) VALUES (1, 'O''Brien');
INSERT INTO matches (id, title) VALUES (1, 'Five-a-side; Plainpalais');
INSERT INTO notifications (user_id, message) VALUES (1, 'See you -- tomorrow');
";

/// A request as seen by the mock server.
#[derive(Debug, Clone)]
struct Received {
    query: String,
    authorization: Option<String>,
    content_type: Option<String>,
    accept: Option<String>,
    user_agent: Option<String>,
}

/// Builds the answer to the n-th request (1-based).
type Responder = fn(usize, &str) -> (StatusCode, String);

#[derive(Clone)]
struct MockState {
    received: Arc<Mutex<Vec<Received>>>,
    respond: Responder,
}

async fn query_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let request: serde_json::Value = serde_json::from_str(&body).expect("request body is JSON");
    let query = request["query"]
        .as_str()
        .expect("request has a query field")
        .to_owned();
    let header_value = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };

    let mut received = state.received.lock().unwrap();
    received.push(Received {
        query: query.clone(),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        accept: header_value(header::ACCEPT),
        user_agent: header_value(header::USER_AGENT),
    });
    (state.respond)(received.len(), &query)
}

async fn slow_handler() -> (StatusCode, String) {
    tokio::time::sleep(Duration::from_secs(5)).await;
    (StatusCode::OK, "[]".into())
}

/// Start the mock server and return its base URL and request log.
async fn start_server(respond: Responder) -> (String, Arc<Mutex<Vec<Received>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        received: Arc::clone(&received),
        respond,
    };
    let app = Router::new()
        .route(QUERY_PATH, post(query_handler))
        .route("/slow", post(slow_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}"), received)
}

fn uploader(endpoint: String, options: UploadOptions) -> Uploader<ManagementApiClient> {
    let client = ManagementApiClient::new(ClientConfig::new(endpoint, TOKEN))
        .expect("Failed to build client");
    Uploader::new(client, options)
}

fn one_statement_per_batch() -> UploadOptions {
    UploadOptions::default().with_max_batch_size(1)
}

fn log(received: &Arc<Mutex<Vec<Received>>>) -> Vec<Received> {
    received.lock().unwrap().clone()
}

// =============================================================================
// Successful uploads
// =============================================================================

#[tokio::test]
async fn test_batches_are_posted_in_order() {
    let (base, received) = start_server(|_, _| (StatusCode::CREATED, "[]".into())).await;
    let uploader = uploader(format!("{base}{QUERY_PATH}"), one_statement_per_batch());

    let batches = uploader.plan(SCRIPT);
    let report = uploader.upload(&batches).await.expect("upload failed");

    let received = log(&received);
    assert_eq!(received.len(), 3);
    for (request, batch) in received.iter().zip(&batches) {
        assert_eq!(request.query, batch.to_query());
        assert_eq!(request.authorization.as_deref(), Some("Bearer sbp_test_token"));
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
        assert_eq!(request.accept.as_deref(), Some("application/json"));
        assert!(
            request
                .user_agent
                .as_deref()
                .is_some_and(|agent| agent.starts_with("seed-loader/"))
        );
    }
    assert_eq!(report.batches, 3);
    assert_eq!(report.statements, 3);
}

#[tokio::test]
async fn test_execute_decodes_rows() {
    let (base, _) = start_server(|_, _| (StatusCode::OK, r#"[{"answer": 42}]"#.into())).await;
    let client = ManagementApiClient::new(ClientConfig::new(format!("{base}{QUERY_PATH}"), TOKEN))
        .expect("Failed to build client");

    let response = client.execute("SELECT 42 AS answer").await.expect("request failed");
    assert_eq!(response, QueryResponse::Rows(serde_json::json!([{"answer": 42}])));
}

#[tokio::test]
async fn test_cleanup_runs_before_seed() {
    let (base, received) = start_server(|_, _| (StatusCode::CREATED, "[]".into())).await;
    let uploader = uploader(format!("{base}{QUERY_PATH}"), UploadOptions::default());

    let report = uploader
        .apply_script(SCRIPT, &["DELETE FROM matches", "DELETE FROM profiles"])
        .await
        .expect("apply failed");

    let received = log(&received);
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].query, "DELETE FROM matches;\nDELETE FROM profiles;");
    assert!(received[1].query.contains("'Five-a-side; Plainpalais'"));
    assert_eq!(report.batches, 1);
    assert_eq!(report.statements, 3);
}

#[tokio::test]
async fn test_undecodable_body_is_not_fatal() {
    let (base, received) = start_server(|_, _| (StatusCode::OK, "OK".into())).await;
    let uploader = uploader(format!("{base}{QUERY_PATH}"), one_statement_per_batch());

    let batches = uploader.plan(SCRIPT);
    let report = uploader.upload(&batches).await.expect("upload failed");

    assert_eq!(log(&received).len(), 3);
    assert_eq!(report.undecodable, 3);
}

// =============================================================================
// Failures halt the run
// =============================================================================

#[tokio::test]
async fn test_error_payload_halts_after_failing_batch() {
    let (base, received) = start_server(|n, _| {
        if n == 2 {
            (
                StatusCode::OK,
                r#"[{"error": "duplicate key value violates unique constraint"}]"#.into(),
            )
        } else {
            (StatusCode::OK, "[]".into())
        }
    })
    .await;
    let uploader = uploader(format!("{base}{QUERY_PATH}"), one_statement_per_batch());

    let batches = uploader.plan(SCRIPT);
    let err = uploader.upload(&batches).await.unwrap_err();

    assert_eq!(log(&received).len(), 2);
    match err {
        UploadError::Rejected {
            phase,
            message,
            preview,
        } => {
            assert_eq!(phase, Phase::Batch { index: 2, total: 3 });
            assert_eq!(message, "duplicate key value violates unique constraint");
            assert_eq!(preview, batches[1].to_query());
        }
        UploadError::Transport { source, .. } => panic!("unexpected transport error: {source}"),
    }
}

#[tokio::test]
async fn test_error_status_halts_immediately() {
    let (base, received) = start_server(|_, _| {
        (
            StatusCode::BAD_REQUEST,
            r#"{"message": "syntax error at or near \"INSRT\""}"#.into(),
        )
    })
    .await;
    let uploader = uploader(format!("{base}{QUERY_PATH}"), one_statement_per_batch());

    let err = uploader.apply_script(SCRIPT, &[] as &[&str]).await.unwrap_err();

    assert_eq!(log(&received).len(), 1);
    assert_eq!(err.phase(), Phase::Batch { index: 1, total: 3 });
    match err {
        UploadError::Rejected { message, .. } => assert!(message.starts_with("HTTP 400: ")),
        UploadError::Transport { source, .. } => panic!("unexpected transport error: {source}"),
    }
}

#[tokio::test]
async fn test_failed_cleanup_sends_no_batch() {
    let (base, received) = start_server(|_, _| {
        (
            StatusCode::OK,
            r#"{"error": "permission denied for table profiles"}"#.into(),
        )
    })
    .await;
    let uploader = uploader(format!("{base}{QUERY_PATH}"), UploadOptions::default());

    let err = uploader
        .apply_script(SCRIPT, &["DELETE FROM profiles"])
        .await
        .unwrap_err();

    assert_eq!(err.phase(), Phase::Cleanup);
    assert_eq!(log(&received).len(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let uploader = uploader(format!("http://{addr}{QUERY_PATH}"), UploadOptions::default());

    let batches = uploader.plan(SCRIPT);
    let err = uploader.upload(&batches).await.unwrap_err();

    assert!(matches!(
        err,
        UploadError::Transport {
            phase: Phase::Batch { index: 1, total: 1 },
            source: ClientError::Transport(_),
        }
    ));
}

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let (base, _) = start_server(|_, _| (StatusCode::OK, "[]".into())).await;
    let client = ManagementApiClient::new(
        ClientConfig::new(format!("{base}/slow"), TOKEN).with_timeout(Duration::from_millis(200)),
    )
    .expect("Failed to build client");
    let uploader = Uploader::new(client, UploadOptions::default());

    let batches = uploader.plan(SCRIPT);
    let err = uploader.upload(&batches).await.unwrap_err();

    match err {
        UploadError::Transport {
            source: ClientError::Transport(source),
            ..
        } => assert!(source.is_timeout()),
        other => panic!("expected a timeout, got {other}"),
    }
}
