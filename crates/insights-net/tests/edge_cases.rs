//! Edge case tests for insights-net
//!
//! Request construction, method handling, and response body semantics.

use insights_net::*;

// ============================================================================
// REQUEST TESTS
// ============================================================================

#[test]
fn test_request_from_str() {
    let req: Request = "https://example.com".into();
    assert_eq!(req.url(), "https://example.com");
    assert!(req.options().is_none());
    assert_eq!(req.method(), Method::Get);
}

#[test]
fn test_request_options_without_method_defaults_to_get() {
    let req = Request::with_options(
        "https://example.com",
        FetchOptions::new().header("Accept", "text/html"),
    );
    assert_eq!(req.method(), Method::Get);
    assert_eq!(req.headers().len(), 1);
}

#[test]
fn test_request_with_multiple_headers() {
    let opts = FetchOptions::new()
        .header("Accept", "application/json")
        .header("Authorization", "Bearer token123")
        .header("X-Custom-Header", "value");
    let req = Request::with_options("https://example.com", opts);

    assert_eq!(req.headers().len(), 3);
    assert_eq!(req.headers()[1].1, "Bearer token123");
}

#[test]
fn test_request_empty_body() {
    let req = Request::with_options(
        "https://example.com",
        FetchOptions::new().method(Method::Post).body(Vec::new()),
    );
    assert_eq!(req.body(), Some(&[][..]));
}

// ============================================================================
// METHOD TESTS
// ============================================================================

#[test]
fn test_all_methods() {
    let methods = [
        (Method::Get, "GET"),
        (Method::Post, "POST"),
        (Method::Put, "PUT"),
        (Method::Delete, "DELETE"),
        (Method::Head, "HEAD"),
        (Method::Options, "OPTIONS"),
        (Method::Patch, "PATCH"),
    ];

    for (method, name) in methods {
        assert_eq!(method.as_str(), name);
        assert_eq!(method.to_string(), name);
        assert_eq!(name.parse::<Method>().unwrap(), method);
    }
}

// ============================================================================
// RESPONSE TESTS
// ============================================================================

#[test]
fn test_response_defaults() {
    let resp = Response::new(404);
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.status_text(), "");
    assert!(!resp.ok());
    assert!(!resp.body_used());
}

#[test]
fn test_response_json() {
    #[derive(serde::Deserialize)]
    struct Todo {
        id: u32,
        completed: bool,
    }

    let mut resp = Response::new(200).with_body(r#"{"id": 1, "completed": false}"#);
    let todo: Todo = resp.json().unwrap();
    assert_eq!(todo.id, 1);
    assert!(!todo.completed);
    assert!(resp.body_used());
}

#[test]
fn test_response_json_decode_error() {
    let mut resp = Response::new(200).with_body("not json");
    let result: Result<serde_json::Value, _> = resp.json();
    assert!(matches!(result, Err(NetError::Decode(_))));
}

#[test]
fn test_response_text_lossy() {
    let mut resp = Response::new(200).with_body(vec![0x68, 0x69, 0xff]);
    assert_eq!(resp.text().unwrap(), "hi\u{fffd}");
}

#[test]
fn test_clone_chain() {
    let resp = Response::new(200).with_body("abc");
    let first = resp.try_clone().unwrap();
    let mut second = first.try_clone().unwrap();
    assert_eq!(second.text().unwrap(), "abc");
    assert!(!first.body_used());
}

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_error_display() {
    assert_eq!(
        NetError::Network("connection refused".into()).to_string(),
        "Network error: connection refused"
    );
    assert_eq!(NetError::BodyUsed.to_string(), "Body has already been consumed");
}
