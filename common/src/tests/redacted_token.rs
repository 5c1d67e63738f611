use crate::{RedactedToken, TokenError};

/// **VALUE**: Verifies the gateway token never appears in Debug or Display output.
///
/// **WHY THIS MATTERS**: The client logs connect attempts with their inputs. A token
/// that leaked through `{:?}` would end up in the dashboard's log file.
///
/// **BUG THIS CATCHES**: Would catch a derived `Debug` replacing the manual impl.
#[test]
fn given_token_when_formatted_then_value_is_hidden() {
    // GIVEN: A token with a recognizable value
    let token = RedactedToken::new("super-secret-gateway-token");

    // WHEN: Formatting it both ways
    let debug = format!("{token:?}");
    let display = format!("{token}");

    // THEN: Neither contains the secret
    assert!(!debug.contains("super-secret"));
    assert!(!display.contains("super-secret"));
    assert_eq!(token.as_str(), "super-secret-gateway-token");
    assert_eq!(token.len(), 26);
}

#[test]
fn given_token_when_serialized_then_fails() {
    let token = RedactedToken::new("abc");

    let result = serde_json::to_string(&token);

    assert!(result.is_err(), "Serializing a token must be refused");
}

#[test]
fn given_token_when_debug_formatted_then_only_length_shown() {
    let token = RedactedToken::new("abcd");

    assert_eq!(format!("{token:?}"), "RedactedToken(len=4)");
}

#[test]
fn given_padded_input_when_parsing_then_token_is_trimmed() {
    let token = RedactedToken::parse("  gw-token\n").unwrap();

    assert_eq!(token.as_str(), "gw-token");
}

/// **VALUE**: Verifies blank input is rejected instead of becoming an empty token.
///
/// **BUG THIS CATCHES**: Would catch an empty `auth.token` being sent, which the
/// gateway treats as an anonymous device rather than a missing token.
#[test]
fn given_blank_input_when_parsing_then_blank_error() {
    // GIVEN / WHEN
    let result = RedactedToken::parse(" \t ");

    // THEN
    match result {
        Err(TokenError::Blank { location }) => {
            assert!(location.file.ends_with("tests/redacted_token.rs"), "{location:?}");
        }
        other => panic!("Expected Blank, got {other:?}"),
    }
}
