// Unit tests for the JSON frame codec

use crate::error::GatewayError;
use crate::protocol::{Frame, decode_frame, encode_request};

use serde_json::{Value, json};

// ============================================
// ENCODING
// ============================================

#[test]
fn given_request_when_encoded_then_wire_shape_matches_gateway() {
    // GIVEN / WHEN
    let text = encode_request("req-1", "sessions.list", json!({"limit": 20})).unwrap();

    // THEN
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "req",
            "id": "req-1",
            "method": "sessions.list",
            "params": {"limit": 20}
        })
    );
}

/// **VALUE**: Verifies `Null` params go out as `{}`.
///
/// **BUG THIS CATCHES**: The gateway validates `params` as an object and rejects
/// `null`, so parameterless methods like `health` would always fail.
#[test]
fn given_null_params_when_encoded_then_sent_as_empty_object() {
    let text = encode_request("req-2", "health", Value::Null).unwrap();

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["params"], json!({}));
}

// ============================================
// DECODING
// ============================================

/// **VALUE**: Verifies a matching `res` frame yields back the exact payload for
/// a spread of JSON shapes.
///
/// **WHY THIS MATTERS**: The client is payload-agnostic. Any reshaping would
/// corrupt results for methods the client has never heard of.
#[test]
fn given_ok_response_when_decoded_then_payload_returned_unchanged() {
    let payloads = [
        json!({"sessions": [{"id": "a", "tokens": 12}], "cursor": null}),
        json!([1, "two", 3.5, false]),
        json!("plain string"),
        json!({"nested": {"deeper": {"unicode": "żółw 🐢"}}}),
    ];

    for payload in payloads {
        // GIVEN: A request and the response the gateway would send for it
        let request: Value =
            serde_json::from_str(&encode_request("id-7", "m", json!({})).unwrap()).unwrap();
        let text = json!({
            "type": "res",
            "id": request["id"],
            "ok": true,
            "payload": payload
        })
        .to_string();

        // WHEN
        let frame = decode_frame(&text).unwrap();

        // THEN
        let Frame::Res(response) = frame else {
            panic!("Expected a response frame");
        };
        assert_eq!(response.id, "id-7");
        assert_eq!(response.into_result().unwrap(), payload);
    }
}

#[test]
fn given_ok_response_without_payload_when_resolved_then_null() {
    let frame = decode_frame(r#"{"type":"res","id":"x","ok":true}"#).unwrap();

    let Frame::Res(response) = frame else {
        panic!("Expected a response frame");
    };
    assert_eq!(response.into_result().unwrap(), Value::Null);
}

#[test]
fn given_error_response_when_resolved_then_request_failed_with_message() {
    let text = r#"{"type":"res","id":"x","ok":false,"error":{"message":"unknown method","code":"E_METHOD"}}"#;
    let Frame::Res(response) = decode_frame(text).unwrap() else {
        panic!("Expected a response frame");
    };

    let error = response.into_result().unwrap_err();

    assert!(matches!(error, GatewayError::RequestFailed { .. }));
    assert_eq!(error.detail(), Some("unknown method"));
}

#[test]
fn given_error_response_without_message_when_resolved_then_generic_message() {
    let Frame::Res(response) = decode_frame(r#"{"type":"res","id":"x","ok":false}"#).unwrap() else {
        panic!("Expected a response frame");
    };

    let error = response.into_result().unwrap_err();

    assert_eq!(error.detail(), Some("request failed"));
}

#[test]
fn given_event_when_decoded_then_sequence_is_optional() {
    let with_seq = decode_frame(r#"{"type":"event","event":"tick","payload":{},"seq":9}"#).unwrap();
    let without_seq = decode_frame(r#"{"type":"event","event":"tick","payload":{}}"#).unwrap();

    match (with_seq, without_seq) {
        (Frame::Event(first), Frame::Event(second)) => {
            assert_eq!(first.seq, Some(9));
            assert_eq!(second.seq, None);
        }
        other => panic!("Expected two events, got {other:?}"),
    }
}

/// **VALUE**: Verifies an event with a nonsensical `seq` still decodes.
///
/// **BUG THIS CATCHES**: Would catch a negative or fractional sequence number
/// failing the whole frame, which drops an event the subscribers should see.
#[test]
fn given_event_with_invalid_seq_when_decoded_then_event_kept_without_seq() {
    for seq in ["-1", "2.5", "\"7\"", "null"] {
        // GIVEN
        let text = format!(r#"{{"type":"event","event":"tick","payload":{{}},"seq":{seq}}}"#);

        // WHEN
        let frame = decode_frame(&text).unwrap();

        // THEN
        let Frame::Event(event) = frame else {
            panic!("Expected an event for seq {seq}");
        };
        assert_eq!(event.event, "tick");
        assert_eq!(event.seq, None, "seq {seq}");
    }
}

/// **VALUE**: Verifies every malformed shape is reported as `InvalidResponse`
/// instead of panicking.
///
/// **BUG THIS CATCHES**: A panic here would kill the receive loop and silently
/// stall the connection.
#[test]
fn given_malformed_frames_when_decoded_then_invalid_response() {
    let malformed = [
        "",
        "{not json",
        "[1,2,3]",
        "\"just a string\"",
        r#"{"id":"x","ok":true}"#,
        r#"{"type":42}"#,
        r#"{"type":"mystery","id":"x"}"#,
        r#"{"type":"res","ok":true}"#,
    ];

    for text in malformed {
        let result = decode_frame(text);

        assert!(
            matches!(result, Err(GatewayError::InvalidResponse { .. })),
            "{text:?} should be rejected, got {result:?}"
        );
    }
}
