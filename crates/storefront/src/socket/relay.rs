//! Frame pumps between a browser socket and the backend socket.

use axum::extract::ws::{Message as BrowserMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::SocketError;
use super::events::{ClientEvent, JoinPayload, ServerEvent, UpstreamEvent};
use crate::backend::types::ChatRole;
use crate::models::Identity;

/// Connection to the backend socket.
pub type Upstream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Who the relay speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub role: ChatRole,
}

impl Participant {
    /// # Errors
    ///
    /// Returns [`SocketError::AnonymousIdentity`] if the token has no id claim.
    pub fn from_identity(identity: &Identity, role: ChatRole) -> Result<Self, SocketError> {
        let id = identity.id().ok_or(SocketError::AnonymousIdentity)?;
        Ok(Self {
            id: id.to_string(),
            role,
        })
    }
}

/// Open the backend socket and announce the participant with `join`.
///
/// # Errors
///
/// Returns an error if the connection or the join frame fails.
#[tracing::instrument(skip(url), fields(socket_url = %url))]
pub async fn connect_upstream(url: &Url, participant: &Participant) -> Result<Upstream, SocketError> {
    let (mut stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;

    let join = serde_json::to_string(&UpstreamEvent::Join(JoinPayload {
        id: participant.id.clone(),
        role: participant.role,
    }))?;
    stream.send(UpstreamMessage::Text(join.into())).await?;

    tracing::debug!("Joined backend socket");
    Ok(stream)
}

/// Relay frames until either side closes or `shutdown` fires.
pub async fn run_relay(
    browser: WebSocket,
    upstream: Upstream,
    participant: Participant,
    shutdown: oneshot::Receiver<()>,
) {
    let (browser_tx, browser_rx) = browser.split();
    let (upstream_tx, upstream_rx) = upstream.split();

    tokio::select! {
        () = browser_to_upstream(browser_rx, upstream_tx, &participant) => {
            tracing::debug!(participant = %participant.id, "Browser closed chat socket");
        }
        () = upstream_to_browser(upstream_rx, browser_tx) => {
            tracing::debug!(participant = %participant.id, "Backend closed chat socket");
        }
        _ = shutdown => {
            tracing::debug!(participant = %participant.id, "Chat relay replaced");
        }
    }
}

async fn browser_to_upstream(
    mut from: SplitStream<WebSocket>,
    mut to: SplitSink<Upstream, UpstreamMessage>,
    participant: &Participant,
) {
    while let Some(frame) = from.next().await {
        let text = match frame {
            Ok(BrowserMessage::Text(text)) => text,
            Ok(BrowserMessage::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let event = match serde_json::from_str::<ClientEvent>(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping unreadable browser frame: {e}");
                continue;
            }
        };

        let Some(event) = UpstreamEvent::from_client(event, &participant.id, participant.role)
        else {
            continue;
        };

        match serde_json::to_string(&event) {
            Ok(json) => {
                if to.send(UpstreamMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("Failed to encode chat event: {e}"),
        }
    }
    let _ = to.close().await;
}

async fn upstream_to_browser(
    mut from: SplitStream<Upstream>,
    mut to: SplitSink<WebSocket, BrowserMessage>,
) {
    while let Some(frame) = from.next().await {
        let text = match frame {
            Ok(UpstreamMessage::Text(text)) => text,
            Ok(UpstreamMessage::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let event = match serde_json::from_str::<ServerEvent>(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping unreadable backend frame: {e}");
                continue;
            }
        };

        match serde_json::to_string(&event) {
            Ok(json) => {
                if to.send(BrowserMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("Failed to encode chat event: {e}"),
        }
    }
    let _ = to.close().await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::claims::unsigned_token;

    #[test]
    fn test_participant_needs_an_id() {
        let anonymous = Identity::from_token(unsigned_token(&json!({ "name": "x" }))).unwrap();
        assert!(matches!(
            Participant::from_identity(&anonymous, ChatRole::User),
            Err(SocketError::AnonymousIdentity)
        ));

        let admin = Identity::from_token(unsigned_token(&json!({ "sub": "a1" }))).unwrap();
        let participant = Participant::from_identity(&admin, ChatRole::Admin).unwrap();
        assert_eq!(participant.id, "a1");
        assert_eq!(participant.role, ChatRole::Admin);
    }
}
