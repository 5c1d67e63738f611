use crate::error::GatewayError;

use url::Url;

/// Derive the WebSocket endpoint for a gateway base URL.
///
/// `http` → `ws`, `https` → `wss`, `ws`/`wss` unchanged. The path is
/// cleared; host, port and query are kept.
///
/// # Errors
///
/// Returns [`GatewayError::ConnectionFailed`] for unparseable input or any
/// other scheme.
pub fn websocket_url(raw: &str) -> Result<Url, GatewayError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| {
        GatewayError::connection_failed(format!("Invalid gateway URL '{raw}': {e}"))
    })?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(GatewayError::connection_failed(format!(
                "Unsupported gateway URL scheme '{other}'"
            )));
        }
    };

    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(GatewayError::connection_failed(format!(
            "Cannot convert '{raw}' to a {scheme} URL"
        )));
    }

    url.set_path("");
    Ok(url)
}
