//! Chat socket relay.
//!
//! The browser never talks to the backend socket directly: it opens a
//! WebSocket to `/chat/ws`, and the storefront opens a matching upstream
//! connection with the visitor's identity. Frames are JSON text of the form
//! `{ "event": "<name>", "data": { ... } }` in both directions.

pub mod events;
pub mod registry;
pub mod relay;

pub use events::{ClientEvent, JoinPayload, PresenceNotice, ServerEvent, TypingNotice, UpstreamEvent};
pub use registry::{RelayTicket, SocketRegistry, relay_key};
pub use relay::{Participant, connect_upstream, run_relay};

use thiserror::Error;

/// Errors from the upstream socket connection.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Connecting to or talking with the backend socket failed.
    #[error("backend socket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// An event could not be encoded.
    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The identity's token carries no account id to join with.
    #[error("identity has no account id")]
    AnonymousIdentity,
}
