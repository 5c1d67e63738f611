use gateway_core::error::TransportError;
use gateway_core::error::identity::IdentityError;

#[test]
fn given_transport_errors_when_formatted_then_include_kind_and_location() {
    let cases = [
        (TransportError::closed(), "Transport Closed Error"),
        (TransportError::connect("refused"), "Transport Connect Error"),
        (TransportError::send("reset"), "Transport Send Error"),
        (TransportError::receive("eof"), "Transport Receive Error"),
        (TransportError::ping("broken pipe"), "Transport Ping Error"),
    ];

    for (error, kind) in cases {
        let message = error.to_string();

        assert!(message.contains(kind), "{message}");
        assert!(message.contains("transport_error.rs"), "{message}");
    }
}

#[test]
fn given_identity_error_when_formatted_then_includes_message_and_location() {
    let message = IdentityError::signing("keychain locked").to_string();

    assert!(message.contains("keychain locked"));
    assert!(message.contains("transport_error.rs"));
}
