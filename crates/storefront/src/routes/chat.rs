//! Live chat between customers and the shop.
//!
//! The page loads the conversation history over JSON, then opens
//! `/chat/ws`, which the storefront relays to the backend socket under the
//! visitor's identity.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State, WebSocketUpgrade, ws::WebSocket},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use brewhouse_core::{ConversationId, UserId};

use crate::backend::types::ChatRole;
use crate::backend::{BackendError, Conversation};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireParticipant, clear_identity};
use crate::models::session::socket_key;
use crate::page::PageContext;
use crate::socket::{Participant, connect_upstream, relay_key, run_relay};
use crate::state::AppState;

/// Query for the chat page and the conversation endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    /// Conversation to open. Admins only; customers always get their own.
    pub id: Option<ConversationId>,
}

/// Chat page template.
#[derive(Template, WebTemplate)]
#[template(path = "chat.html")]
pub struct ChatTemplate {
    pub page: PageContext,
    pub role: ChatRole,
    pub participant_id: String,
    pub conversation_url: String,
    pub socket_path: &'static str,
}

/// URL the page fetches history from.
fn conversation_url(role: ChatRole, id: Option<&ConversationId>) -> String {
    match (role, id) {
        (ChatRole::Admin, Some(id)) => format!(
            "/chat/conversation?as=admin&id={}",
            urlencoding::encode(id.as_str())
        ),
        (ChatRole::Admin, None) => "/chat/conversation?as=admin".to_string(),
        (ChatRole::User, _) => "/chat/conversation".to_string(),
    }
}

const fn socket_path(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "/chat/ws",
        ChatRole::Admin => "/chat/ws?as=admin",
    }
}

/// Display the chat page.
pub async fn show(
    participant: RequireParticipant,
    Query(query): Query<ChatQuery>,
    page: PageContext,
) -> impl IntoResponse {
    let RequireParticipant { identity, role } = participant;
    ChatTemplate {
        page,
        role,
        participant_id: identity.id().unwrap_or_default().to_string(),
        conversation_url: conversation_url(role, query.id.as_ref()),
        socket_path: socket_path(role),
    }
}

/// Conversation history as JSON.
///
/// Customers get their own conversation. Admins must name one with `?id=`.
///
/// # Errors
///
/// Returns 400 if an admin omits the id or a customer token has no id,
/// 401 if the backend rejects the token, and 404 for unknown conversations.
#[instrument(skip(state, session, participant), fields(role = participant.role.as_str()))]
pub async fn conversation(
    State(state): State<AppState>,
    session: Session,
    participant: RequireParticipant,
    Query(query): Query<ChatQuery>,
) -> Result<Json<Conversation>, AppError> {
    let RequireParticipant { identity, role } = participant;
    let token = identity.bearer();

    let result = match role {
        ChatRole::User => {
            let user_id = identity.id().map(UserId::new).ok_or_else(|| {
                AppError::BadRequest("Your account has no id, please log in again.".to_string())
            })?;
            state.backend().user_conversation(&token, &user_id).await
        }
        ChatRole::Admin => {
            let id = query
                .id
                .ok_or_else(|| AppError::BadRequest("Choose a conversation.".to_string()))?;
            state.backend().conversation(&token, &id).await
        }
    };

    match result {
        Ok(conversation) => Ok(Json(conversation)),
        Err(BackendError::Unauthorized(message)) => {
            clear_identity(&session, role).await?;
            Err(BackendError::Unauthorized(message).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Upgrade to a WebSocket and relay it to the backend socket.
///
/// A session has at most one live relay per role; opening another (a second
/// tab, a reload) replaces the older one.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn socket(
    State(state): State<AppState>,
    session: Session,
    participant: RequireParticipant,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let RequireParticipant { identity, role } = participant;
    let Ok(participant) = Participant::from_identity(&identity, role) else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };
    let key = relay_key(&socket_key(&session).await?, role);

    Ok(ws
        .on_upgrade(move |browser| relay(browser, state, participant, key))
        .into_response())
}

async fn relay(browser: WebSocket, state: AppState, participant: Participant, key: String) {
    let ticket = state.sockets().register(&key).await;

    match connect_upstream(&state.config().backend.socket_url, &participant).await {
        Ok(upstream) => {
            tracing::info!(
                participant = %participant.id,
                role = participant.role.as_str(),
                "Chat relay started"
            );
            run_relay(browser, upstream, participant, ticket.shutdown).await;
        }
        Err(e) => {
            // Dropping the browser socket closes it; the page reconnects.
            tracing::warn!("Could not reach backend socket: {e}");
        }
    }

    state.sockets().release(&ticket.key, ticket.generation).await;
}

/// Stop the relay a session runs for `role`, e.g. on logout.
pub async fn close_relay(state: &AppState, session: &Session, role: ChatRole) {
    match socket_key(session).await {
        Ok(key) => state.sockets().shutdown(&relay_key(&key, role)).await,
        Err(e) => tracing::warn!("Failed to read socket key: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_url() {
        assert_eq!(conversation_url(ChatRole::User, None), "/chat/conversation");
        assert_eq!(
            conversation_url(ChatRole::User, Some(&ConversationId::new("c1"))),
            "/chat/conversation"
        );
        assert_eq!(
            conversation_url(ChatRole::Admin, Some(&ConversationId::new("c 1"))),
            "/chat/conversation?as=admin&id=c%201"
        );
    }

    #[test]
    fn test_socket_path_keeps_role() {
        assert_eq!(socket_path(ChatRole::User), "/chat/ws");
        assert_eq!(socket_path(ChatRole::Admin), "/chat/ws?as=admin");
    }
}
