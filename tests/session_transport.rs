//! Session transport against an in-process HTTP backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use surplus_agent::config::{ApiConfig, RetryConfig};
use surplus_agent::session::{
    ApiRequest, HttpSession, SessionDefaults, SessionSettings, Transport, TransportError,
};

mod common;

use common::{start_programmable_backend, MockReply};

fn session(base_url: String, max_retries: u32, cookie: Option<&str>) -> HttpSession {
    let defaults = SessionDefaults::from_config(
        &ApiConfig {
            base_url,
            ..ApiConfig::default()
        },
        &RetryConfig {
            max_retries,
            base_delay_ms: 10,
            max_delay_ms: 50,
            ..RetryConfig::default()
        },
    )
    .unwrap();

    HttpSession::new(
        &defaults,
        &SessionSettings {
            user_agent: "TGTG/24.10.1 Dalvik/2.1.0 (test)".into(),
            proxy: None,
            datadome_cookie: cookie.map(str::to_string),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_retry_on_transient_status() {
    let calls = AtomicU32::new(0);
    let backend = start_programmable_backend(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            MockReply::html(503, "Service Unavailable")
        } else {
            MockReply::json(200, r#"{"items":[]}"#)
        }
    })
    .await;

    let session = session(backend.base_url(), 5, None);
    let response = session
        .post(&ApiRequest::new("item/v8/", Some(serde_json::json!({"page": 1}))))
        .await
        .expect("backend unreachable");

    assert_eq!(response.status, 200, "Should eventually succeed after retries");
    assert!(response.is_json());
    assert_eq!(backend.count("/api/item/v8/"), 3);
}

#[tokio::test]
async fn test_exhausted_retries_return_last_response() {
    let backend = start_programmable_backend(|_| MockReply::html(503, "busy")).await;

    let session = session(backend.base_url(), 2, None);
    let response = session
        .post(&ApiRequest::new("item/v8/", None))
        .await
        .expect("backend unreachable");

    assert_eq!(response.status, 503);
    assert_eq!(backend.count("/api/"), 3);
}

#[tokio::test]
async fn test_connection_errors_retried_until_budget_spent() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = session(format!("http://{addr}/api/"), 2, None);
    let started = std::time::Instant::now();
    let err = session
        .post(&ApiRequest::new("item/v8/", None))
        .await
        .unwrap_err();

    match err {
        TransportError::Request(e) => assert!(e.is_connect(), "unexpected error: {e}"),
        other => panic!("expected request error, got {other:?}"),
    }
    // two backoff pauses: 10ms then 20ms
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_forbidden_is_not_retried() {
    let backend = start_programmable_backend(|_| MockReply::html(403, "blocked")).await;

    let session = session(backend.base_url(), 5, None);
    let response = session.post(&ApiRequest::new("item/v8/", None)).await.unwrap();

    assert_eq!(response.status, 403);
    assert_eq!(backend.count("/api/"), 1);
}

#[tokio::test]
async fn test_default_headers_and_bearer() {
    let backend = start_programmable_backend(|_| MockReply::json(200, "{}")).await;

    let session = session(backend.base_url(), 0, None);
    session
        .post(
            &ApiRequest::new("order/v7/o-1/abort", Some(serde_json::json!({"cancel_reason_id": 1})))
                .with_access_token(Some("token-1")),
        )
        .await
        .unwrap();

    let request = &backend.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/order/v7/o-1/abort");
    assert_eq!(request.header("accept-language"), Some("en-GB"));
    assert_eq!(request.header("accept"), Some("application/json"));
    assert!(request
        .header("content-type")
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(
        request.header("user-agent"),
        Some("TGTG/24.10.1 Dalvik/2.1.0 (test)")
    );
    assert_eq!(request.header("authorization"), Some("Bearer token-1"));
    assert_eq!(request.json(), serde_json::json!({"cancel_reason_id": 1}));
}

#[tokio::test]
async fn test_datadome_cookie_round_trip() {
    let backend = start_programmable_backend(|_| {
        MockReply::json(200, "{}").with_cookie("datadome=fresh; Path=/")
    })
    .await;

    let session = session(backend.base_url(), 0, Some("seeded"));
    assert_eq!(session.datadome_cookie().as_deref(), Some("seeded"));

    session.post(&ApiRequest::new("item/v8/", None)).await.unwrap();

    let sent = backend.requests()[0].header("cookie").map(str::to_string);
    assert_eq!(sent.as_deref(), Some("datadome=seeded"));
    assert_eq!(session.datadome_cookie().as_deref(), Some("fresh"));
}
