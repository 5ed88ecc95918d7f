use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use beget_gateway::validate::MAX_BODY_BYTES;
use beget_kernel::Config;
use beget_testing::{SpyProducer, TestGateway, body_text, produce_request};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn gateway(spy: &SpyProducer) -> TestGateway {
    TestGateway::new(&["foo"], Arc::new(spy.clone()))
}

async fn post(spy: &SpyProducer, request: Request<Body>) -> (StatusCode, String) {
    let response = gateway(spy).app().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_text(response).await)
}

#[tokio::test]
async fn test_rejected_requests_never_publish() {
    let oversized = {
        let mut body = br#"{"topic":"foo","value":""#.to_vec();
        body.extend(std::iter::repeat_n(b'a', MAX_BODY_BYTES + 1));
        body.extend(br#""}"#);
        body
    };

    let cases: Vec<(&str, Vec<u8>, StatusCode, &str)> = vec![
        (
            "syntax error",
            b"<>".to_vec(),
            StatusCode::BAD_REQUEST,
            "Request body contains badly-formed JSON (at position 1)\n",
        ),
        (
            "wrong field type",
            br#"{"topic":false,"value":{"foo":1}}"#.to_vec(),
            StatusCode::BAD_REQUEST,
            "Request body contains an invalid value for the \"topic\" field (at position 14)\n",
        ),
        (
            "unknown field",
            br#"{"foobar":false,"value":{"foo":1}}"#.to_vec(),
            StatusCode::BAD_REQUEST,
            "Request body contains unknown field \"foobar\"\n",
        ),
        (
            "two objects",
            br#"{"topic":"foo","value":{"foo":1}}something else"#.to_vec(),
            StatusCode::BAD_REQUEST,
            "Request body must only contain a single JSON object\n",
        ),
        (
            "empty body",
            Vec::new(),
            StatusCode::BAD_REQUEST,
            "Request body must not be empty\n",
        ),
        (
            "too large",
            oversized,
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body must not be larger than 1MB\n",
        ),
        (
            "missing topic",
            br#"{"value":{"foo":1}}"#.to_vec(),
            StatusCode::BAD_REQUEST,
            "missing topic\n",
        ),
        (
            "topic not allowed",
            br#"{"topic":"bar","value":{"foo":1}}"#.to_vec(),
            StatusCode::BAD_REQUEST,
            "invalid topic\n",
        ),
        (
            "missing value",
            br#"{"topic":"foo"}"#.to_vec(),
            StatusCode::BAD_REQUEST,
            "missing message value\n",
        ),
        (
            "both values",
            br#"{"topic":"foo","value":1,"value_str":"1"}"#.to_vec(),
            StatusCode::BAD_REQUEST,
            "Request body must not set both \"value\" and \"value_str\"\n",
        ),
    ];

    for (name, body, status, text) in cases {
        let spy = SpyProducer::new();
        let (got_status, got_text) = post(&spy, produce_request(body)).await;
        assert_eq!(got_status, status, "{name}");
        assert_eq!(got_text, text, "{name}");
        assert_eq!(spy.call_count(), 0, "{name}");
    }
}

#[tokio::test]
async fn test_content_type_is_required() {
    let spy = SpyProducer::new();
    let request = Request::post("/produce")
        .body(Body::from(r#"{"topic":"foo","value":1}"#))
        .unwrap();
    let (status, text) = post(&spy, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(text, "missing Content-Type header\n");

    let request = Request::post("/produce")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"topic":"foo","value":1}"#))
        .unwrap();
    let (status, text) = post(&spy, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(text, "Content-Type header is not application/json\n");
    assert_eq!(spy.call_count(), 0);
}

#[tokio::test]
async fn test_declared_length_over_limit() {
    let spy = SpyProducer::new();
    let request = Request::post("/produce")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, (MAX_BODY_BYTES + 1).to_string())
        .body(Body::empty())
        .unwrap();
    let (status, _) = post(&spy, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_accepted_requests_publish_canonical_messages() {
    let cases = [
        (
            "json value",
            r#"{"topic":"foo","value":{"foo":1}}"#,
            "",
            r#"{"foo":1}"#,
        ),
        (
            "string value",
            r#"{"topic":"foo","value":"{\"foo\":1}"}"#,
            "",
            r#"{"foo":1}"#,
        ),
        (
            "value_str with key",
            r#"{"topic":"foo","key":"bar","value_str":"{\"foo\":1}"}"#,
            "bar",
            r#"{"foo":1}"#,
        ),
        (
            "keys are sorted",
            r#"{"topic":"foo","value":{"z":1,"a":[true,null]}}"#,
            "",
            r#"{"a":[true,null],"z":1}"#,
        ),
    ];

    for (name, body, key, payload) in cases {
        let spy = SpyProducer::new();
        let (status, text) = post(&spy, produce_request(body)).await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_eq!(text, "OK", "{name}");

        let messages = spy.messages().await;
        assert_eq!(messages.len(), 1, "{name}");
        assert_eq!(messages[0].topic(), "foo", "{name}");
        assert_eq!(messages[0].key(), key.as_bytes(), "{name}");
        assert_eq!(messages[0].payload(), payload.as_bytes(), "{name}");
    }
}

#[tokio::test]
async fn test_publish_failure_still_answers_ok() {
    let spy = SpyProducer::failing("broker unreachable");
    let (status, text) = post(&spy, produce_request(r#"{"topic":"foo","value":1}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
    assert_eq!(spy.call_count(), 1);
    beget_testing::assert_published!(spy, 0);
}

#[tokio::test]
async fn test_slow_publish_outlasting_request_timeout_still_answers_ok() {
    let spy = SpyProducer::new().with_delay(Duration::from_millis(1500));
    let mut config = Config::new(["foo"]);
    config.server.request_timeout_secs = 1;

    let response = TestGateway::with_config(config, Arc::new(spy.clone()))
        .app()
        .oneshot(produce_request(r#"{"topic":"foo","value":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    beget_testing::assert_published!(spy, 1);
}

#[tokio::test]
async fn test_healthz() {
    let spy = SpyProducer::new();
    let response = gateway(&spy)
        .app()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
    assert_eq!(spy.call_count(), 0);
}

#[tokio::test]
async fn test_error_responses_are_plain_text() {
    let spy = SpyProducer::new();
    let response = gateway(&spy)
        .app()
        .oneshot(produce_request("<>"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}
