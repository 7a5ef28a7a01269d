//! In-process tests of the HTTP surface

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tower::ServiceExt;

use scamcheck_parser::config::ServiceConfig;
use scamcheck_parser::http::{AppState, create_router};

mod common;
use common::{FakeBehavior, TEST_BASE_URL, build_limiter, build_service, test_config};

fn router_with(behavior: &std::sync::Arc<FakeBehavior>, config: &ServiceConfig) -> Router {
    let state = AppState::new(build_service(behavior, config), build_limiter(config))
        .with_trust_proxy(config.trust_proxy());
    create_router(state)
}

fn from_socket(mut request: Request<Body>, addr: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((addr, 40_000))));
    request
}

fn post_json(uri: &str, body: &Value, client: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_parse_domain_endpoint_then_cached() {
    let behavior = FakeBehavior::new();
    let app = router_with(&behavior, &test_config());

    let response = app
        .clone()
        .oneshot(post_json("/parse-domain", &json!({ "domain": "vk-com" }), "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["cached"], json!(false));
    assert_eq!(first["summary"]["totalPercent"], json!("100%"));
    assert!(first["technicalAnalysis"]["Domain Whois"].is_object());
    assert!(first["technicalAnalysis"]["Empty Panel"].is_null());
    assert!(first["processingTime"].is_u64());

    let response = app
        .oneshot(post_json("/parse-domain", &json!({ "domain": "vk-com" }), "10.0.0.1"))
        .await
        .unwrap();
    let second = body_json(response).await;
    assert_eq!(second["cached"], json!(true));
    assert_eq!(second["summary"], first["summary"]);
    assert_eq!(behavior.pages_opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_domain_is_bad_request() {
    let behavior = FakeBehavior::new();
    let app = router_with(&behavior, &test_config());

    for body in [json!({}), json!({ "domain": 42 }), json!({ "domain": "not a domain" })] {
        let response = app
            .clone()
            .oneshot(post_json("/parse-domain", &body, "10.0.0.2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let error = body_json(response).await;
        assert_eq!(error["error"], json!("Invalid domain format"));
        assert!(error["details"].is_string());
    }
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let behavior = FakeBehavior::new();
    let app = router_with(&behavior, &test_config());

    let request = Request::builder()
        .method("POST")
        .uri("/parse-domain")
        .body(Body::from("domain=vk.com"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_31st_request_is_rate_limited() {
    let behavior = FakeBehavior::new();
    let config = ServiceConfig::builder()
        .trust_proxy(true)
        .scam_detector_base_url(TEST_BASE_URL)
        .build()
        .unwrap();
    let app = router_with(&behavior, &config);

    // Invalid bodies still count against the budget
    for _ in 0..30 {
        let response = app
            .clone()
            .oneshot(post_json("/parse-domain", &json!({}), "203.0.113.7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .clone()
        .oneshot(post_json("/parse-domain", &json!({ "domain": "vk-com" }), "203.0.113.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let error = body_json(response).await;
    assert_eq!(error["error"], json!("Too many requests"));
    assert!(error["retryAfter"].as_u64().unwrap() > 0);

    // Another client is unaffected
    let response = app
        .oneshot(post_json("/parse-domain", &json!({ "domain": "vk-com" }), "203.0.113.8"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_header_is_ignored_by_default() {
    let behavior = FakeBehavior::new();
    let app = router_with(&behavior, &test_config());

    let mut limited = 0;
    for i in 0..31u8 {
        let request = from_socket(
            post_json("/parse-domain", &json!({}), &format!("198.51.100.{i}")),
            [192, 0, 2, 10],
        );
        let response = app.clone().oneshot(request).await.unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }
    assert_eq!(limited, 1);

    // A different socket is a different client
    let request = from_socket(
        post_json("/parse-domain", &json!({ "domain": "vk-com" }), "198.51.100.1"),
        [192, 0, 2, 11],
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trusted_proxy_header_identifies_client() {
    let behavior = FakeBehavior::new();
    let config = ServiceConfig::builder()
        .trust_proxy(true)
        .rate_limit(1, Duration::from_secs(60))
        .scam_detector_base_url(TEST_BASE_URL)
        .build()
        .unwrap();
    let app = router_with(&behavior, &config);

    // Same socket, two forwarded clients: each gets its own budget
    for client in ["203.0.113.1", "203.0.113.2"] {
        let request = from_socket(
            post_json("/parse-domain", &json!({ "domain": "vk-com" }), client),
            [192, 0, 2, 10],
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{client}");
    }
}

#[tokio::test]
async fn test_timeout_maps_to_gateway_timeout() {
    let behavior = FakeBehavior::new();
    *behavior.navigate_delay.lock() = Duration::from_secs(5);
    let config = ServiceConfig::builder()
        .request_timeout(Duration::from_millis(50))
        .scam_detector_base_url(TEST_BASE_URL)
        .build()
        .unwrap();
    let app = router_with(&behavior, &config);

    let response = app
        .oneshot(post_json("/parse-domain", &json!({ "domain": "vk-com" }), "10.0.0.3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let error = body_json(response).await;
    assert_eq!(error["error"], json!("Parsing failed"));
    assert_eq!(error["domain"], json!("vk-com"));
    assert!(error["processingTime"].is_u64());
}

#[tokio::test]
async fn test_check_phish_endpoint() {
    let behavior = FakeBehavior::new();
    behavior
        .present
        .lock()
        .insert(r#"input[name="isaphishurl"]"#.to_string());
    let app = router_with(&behavior, &test_config());

    let response = app
        .oneshot(post_json("/check-phish", &json!({ "domain": "vk.com" }), "10.0.0.4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["checkedUrl"], json!("http://vk.com"));
    assert_eq!(body["status"], json!("page_loaded"));
    assert_eq!(body["challengeDetected"], json!(false));
    assert_eq!(body["cached"], json!(false));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_reports_pool_and_cache() {
    let behavior = FakeBehavior::new();
    let app = router_with(&behavior, &test_config());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert!(body["uptime"].is_f64());
    assert_eq!(
        body["browserPool"],
        json!({ "available": 0, "active": 0, "max": 2 })
    );
    assert_eq!(body["cache"], json!({ "size": 0, "maxSize": 1000 }));
}

#[tokio::test]
async fn test_delete_cache_reports_cleared_entries() {
    let behavior = FakeBehavior::new();
    let app = router_with(&behavior, &test_config());

    for domain in ["vk-com", "ok-ru"] {
        let response = app
            .clone()
            .oneshot(post_json("/parse-domain", &json!({ "domain": domain }), "10.0.0.5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Cache cleared", "clearedEntries": 2 })
    );
}
