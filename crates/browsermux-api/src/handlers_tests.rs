
use super::*;
use axum::response::IntoResponse;
use browsermux_cdp::CdpError;
use browsermux_session::SessionError;
use http_body_util::BodyExt;

#[test]
fn not_found_errors_map_to_404_with_their_own_codes() {
    let err = ApiError::from_session(
        SessionError::SessionNotFound("sess_x".into()),
        "NavigationFailed",
    );
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.code, "SessionNotFound");

    let err = ApiError::from_session(SessionError::PageNotFound("P1".into()), "ExecutionFailed");
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.code, "PageNotFound");
}

#[test]
fn other_errors_take_the_operation_code() {
    let err = ApiError::from_session(
        SessionError::Control(CdpError::Timeout(10)),
        "ExecutionFailed",
    );
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.code, "ExecutionFailed");
    assert!(err.message.contains("timed out"));
}

#[tokio::test]
async fn error_envelope_has_code_and_message() {
    let response = ApiError::bad_request("url is required").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "InvalidRequest");
    assert_eq!(body["error"]["message"], "url is required");
}

#[test]
fn screenshot_response_encodes_bytes_and_defaults_format() {
    let bytes = b"fake-png".to_vec();
    let format: Option<String> = None;
    let response = ScreenshotResponse {
        session_id: "sess_a".into(),
        page_id: "P1".into(),
        size: bytes.len(),
        screenshot: BASE64.encode(&bytes),
        format: format.unwrap_or_else(|| "png".to_string()),
    };

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["format"], "png");
    assert_eq!(value["size"], 8);
    assert_eq!(
        BASE64.decode(value["screenshot"].as_str().unwrap()).unwrap(),
        bytes
    );
}
