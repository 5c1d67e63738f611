use crate::error::GatewayError;
use crate::transport::websocket_url;

/// **VALUE**: Verifies dashboard-style base URLs map onto the gateway socket.
///
/// **WHY THIS MATTERS**: Users paste the HTTP address of the gateway's web UI.
/// The socket lives on the same host and port at the root path.
///
/// **BUG THIS CATCHES**: Would catch a scheme swap that drops the port or keeps
/// the UI path, which the gateway answers with a 404 upgrade failure.
#[test]
fn given_http_urls_when_deriving_websocket_url_then_scheme_swapped_and_path_cleared() {
    // GIVEN / WHEN
    let plain = websocket_url("http://localhost:18789/dashboard/index.html").unwrap();
    let secure = websocket_url("https://gateway.example.com/ui").unwrap();

    // THEN
    assert_eq!(plain.as_str(), "ws://localhost:18789/");
    assert_eq!(secure.as_str(), "wss://gateway.example.com/");
}

#[test]
fn given_websocket_urls_when_deriving_then_scheme_kept() {
    let plain = websocket_url("ws://127.0.0.1:9000/some/path").unwrap();
    let secure = websocket_url("wss://gateway.example.com:8443").unwrap();

    assert_eq!(plain.scheme(), "ws");
    assert_eq!(plain.port(), Some(9000));
    assert_eq!(plain.path(), "/");
    assert_eq!(secure.scheme(), "wss");
    assert_eq!(secure.port(), Some(8443));
}

#[test]
fn given_query_string_when_deriving_then_query_kept() {
    let url = websocket_url("http://localhost:18789/app?profile=work").unwrap();

    assert_eq!(url.query(), Some("profile=work"));
    assert_eq!(url.path(), "/");
}

#[test]
fn given_unsupported_scheme_when_deriving_then_connection_failed() {
    let result = websocket_url("ftp://localhost/files");

    match result {
        Err(GatewayError::ConnectionFailed { reason, .. }) => {
            assert!(reason.contains("ftp"), "reason should name the scheme: {reason}");
        }
        other => panic!("Expected ConnectionFailed, got {other:?}"),
    }
}

#[test]
fn given_garbage_when_deriving_then_connection_failed() {
    let result = websocket_url("not a url");

    assert!(matches!(result, Err(GatewayError::ConnectionFailed { .. })));
}
