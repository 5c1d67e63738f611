use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;

/// Lifecycle of the single gateway connection a client owns.
///
/// `Reconnecting` means a live connection was lost without the caller asking
/// for it. Nothing reconnects automatically; callers watch for this state and
/// decide when to call `connect` again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl Display for ConnectionState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        formatter.write_str(name)
    }
}
