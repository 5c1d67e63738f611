use gateway_core::error::GatewayError;

/// **VALUE**: Verifies `GatewayError` constructors capture the caller's location.
///
/// **WHY THIS MATTERS**: A `ConnectionFailed` can come from URL parsing, the
/// socket, the challenge wait or the signer. The location says which.
///
/// **BUG THIS CATCHES**: Would catch a constructor losing `#[track_caller]`,
/// which makes every error point at `gateway.rs` instead of its real origin.
#[test]
fn given_connection_failed_when_formatted_then_includes_reason_and_caller_location() {
    // GIVEN
    let error = GatewayError::connection_failed("Timed out waiting for connect.challenge");

    // WHEN
    let message = error.to_string();

    // THEN
    assert!(message.contains("Connection Failed Error"));
    assert!(message.contains("Timed out waiting for connect.challenge"));
    assert!(message.contains("gateway_error.rs"), "{message}");
}

#[test]
fn given_each_variant_when_categorized_then_stable_names() {
    let cases = [
        (GatewayError::not_connected(), "not_connected"),
        (GatewayError::connection_failed("x"), "connection_failed"),
        (GatewayError::timeout(), "timeout"),
        (GatewayError::request_failed("x"), "request_failed"),
        (GatewayError::invalid_response("x"), "invalid_response"),
    ];

    for (error, category) in cases {
        assert_eq!(error.error_category(), category);
        assert!(error.to_string().contains("gateway_error.rs"));
    }
}

#[test]
fn given_variants_when_reading_detail_then_only_message_variants_have_one() {
    assert_eq!(GatewayError::request_failed("busy").detail(), Some("busy"));
    assert_eq!(GatewayError::invalid_response("bad").detail(), Some("bad"));
    assert_eq!(GatewayError::not_connected().detail(), None);
    assert_eq!(GatewayError::timeout().detail(), None);
}

#[test]
fn given_json_error_when_converted_then_invalid_response() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

    let error = GatewayError::from(json_error);

    assert!(matches!(error, GatewayError::InvalidResponse { .. }));
}
