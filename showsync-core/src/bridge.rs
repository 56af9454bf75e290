//! Boundary to the host process
//!
//! The host owns the authoritative show document. It is reached through two
//! surfaces: a request/response command surface and a set of named one-way
//! event channels. Both carry JSON values; typing happens on this side of the
//! boundary (see [`crate::channel`] and the typed commands in `showsync`).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::Stream;

/// Stream of raw payloads delivered on one host channel, in host-send order.
pub type EventStream = Pin<Box<dyn Stream<Item = Value> + Send + 'static>>;

/// Identifies one listener registration on a host channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live registration on a host channel.
pub struct HostSubscription {
    /// Registration id, passed back to [`HostBridge::unlisten`]
    pub id: ListenerId,
    /// Messages for this registration
    pub events: EventStream,
}

impl fmt::Debug for HostSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Transport-level failures talking to the host.
///
/// These are distinct from a command that ran and reported an error, which
/// arrives as [`CommandResponse::Error`].
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The host side of the bridge has gone away
    #[error("host bridge closed")]
    Closed,
    /// The host does not expose the requested channel
    #[error("unknown host channel `{0}`")]
    UnknownChannel(String),
    /// The host does not know the requested command
    #[error("unknown host command `{0}`")]
    UnknownCommand(String),
    /// A request or response could not be encoded/decoded
    #[error("malformed host message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Discriminated result of a host command.
///
/// On the wire: `{"status":"ok","data":...}` or `{"status":"error","error":"..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResponse {
    Ok {
        #[serde(default)]
        data: Value,
    },
    Error {
        error: String,
    },
}

impl CommandResponse {
    /// Successful response carrying `data`.
    pub fn ok(data: impl Serialize) -> Result<Self, BridgeError> {
        Ok(Self::Ok {
            data: serde_json::to_value(data)?,
        })
    }

    /// Failed response carrying a host-provided message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Whether the host reported success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// The host bridge, as seen from the front end.
///
/// Implementations must deliver the messages of one registration in the
/// order the host sent them. No ordering is required across channels.
pub trait HostBridge: Send + Sync + 'static {
    /// Run a command. `request` is the encoded command (name + arguments).
    fn invoke(
        &self,
        request: Value,
    ) -> impl Future<Output = Result<CommandResponse, BridgeError>> + Send;

    /// Register a listener on `channel`.
    fn listen(
        &self,
        channel: &'static str,
    ) -> impl Future<Output = Result<HostSubscription, BridgeError>> + Send;

    /// Release a registration made by [`listen`](Self::listen).
    ///
    /// Releasing an unknown id is a no-op.
    fn unlisten(&self, channel: &'static str, id: ListenerId) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_response_wire_format() {
        let ok: CommandResponse =
            serde_json::from_value(json!({"status": "ok", "data": [1, 2]})).unwrap();
        assert_eq!(ok, CommandResponse::Ok { data: json!([1, 2]) });
        assert!(ok.is_ok());

        let err: CommandResponse =
            serde_json::from_value(json!({"status": "error", "error": "Cue not found"})).unwrap();
        assert_eq!(err, CommandResponse::error("Cue not found"));
        assert!(!err.is_ok());
    }

    #[test]
    fn test_unit_ok_response_without_data() {
        let ok: CommandResponse = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert_eq!(ok, CommandResponse::Ok { data: Value::Null });
    }

    #[test]
    fn test_listener_id_display() {
        assert_eq!(ListenerId(7).to_string(), "#7");
    }
}
