use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- json ---

#[tokio::test]
async fn json_returns_object() {
    let resp = app().oneshot(get("/json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    let value: serde_json::Value = body_json(resp).await;
    assert_eq!(value["hello"], "world");
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_method_query_headers_and_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo?page=2&q=a+b")
        .header("X-Custom", "yes")
        .body(r#"{"title":"Buy milk"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.as_deref(), Some("page=2&q=a+b"));
    assert_eq!(echo.headers.get("x-custom").map(String::as_str), Some("yes"));
    assert_eq!(echo.body, r#"{"title":"Buy milk"}"#);
}

#[tokio::test]
async fn echo_accepts_any_method() {
    for method in ["GET", "PUT", "PATCH", "DELETE", "OPTIONS"] {
        let req = Request::builder()
            .method(method)
            .uri("/echo")
            .body(String::new())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{method}");
        let echo: Echo = body_json(resp).await;
        assert_eq!(echo.method, method);
        assert!(echo.query.is_none());
    }
}

// --- empty ---

#[tokio::test]
async fn empty_returns_204_without_body() {
    let resp = app().oneshot(get("/empty")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/418")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_bytes(resp).await, "status 418");
}

#[tokio::test]
async fn status_rejects_invalid_code() {
    let resp = app().oneshot(get("/status/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- slow ---

#[tokio::test(start_paused = true)]
async fn slow_waits_before_responding() {
    let started = tokio::time::Instant::now();
    let resp = app().oneshot(get("/slow/250")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(250));
    assert_eq!(body_bytes(resp).await, "finally");
}

// --- bytes ---

#[tokio::test]
async fn bytes_returns_sized_body() {
    let resp = app().oneshot(get("/bytes/100")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await.len(), 100);
}

// --- form ---

#[tokio::test]
async fn form_is_urlencoded() {
    let resp = app().oneshot(get("/form")).await.unwrap();

    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/x-www-form-urlencoded"
    );
    assert_eq!(body_bytes(resp).await, "a=1&b=two+words");
}

// --- routing ---

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
