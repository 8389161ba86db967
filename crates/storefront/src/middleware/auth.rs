//! Authentication extractors.
//!
//! Gates are presence checks: a route is open to whoever has the matching
//! identity in the session. Token expiry is never checked here; the backend
//! rejects stale tokens and handlers react to that.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::backend::types::ChatRole;
use crate::models::{Identity, session_keys};

/// Where anonymous visitors are sent for each kind of gate.
pub const USER_LOGIN_PATH: &str = "/auth/login";
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// Extractor that requires a logged-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireUser(pub Identity);

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub Identity);

/// Extractor for chat routes: a customer or an admin.
///
/// When both identities are present the customer wins, unless the request
/// asks for the admin side with `?as=admin`.
pub struct RequireParticipant {
    pub identity: Identity,
    pub role: ChatRole,
}

/// Both identities, either of which may be missing.
pub struct CurrentIdentities {
    pub user: Option<Identity>,
    pub admin: Option<Identity>,
}

/// Error returned when a gate is not satisfied.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to a login page (for HTML requests).
    RedirectTo(&'static str),
    /// Unauthorized response (for JSON and socket requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectTo(path) => Redirect::to(path).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Session key holding the identity for a role.
#[must_use]
pub const fn identity_key(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => session_keys::USER,
        ChatRole::Admin => session_keys::ADMIN,
    }
}

/// Whether a rejected request should get 401 instead of a redirect.
fn wants_status(parts: &Parts) -> bool {
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path());
    path.starts_with("/api/") || path.starts_with("/chat/")
}

fn rejection(parts: &Parts, login_path: &'static str) -> AuthRejection {
    if wants_status(parts) {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectTo(login_path)
    }
}

fn asks_for_admin(parts: &Parts) -> bool {
    parts.uri.query().is_some_and(|query| {
        url::form_urlencoded::parse(query.as_bytes()).any(|(k, v)| k == "as" && v == "admin")
    })
}

/// Load one identity from the session.
pub async fn load_identity(session: &Session, role: ChatRole) -> Option<Identity> {
    session
        .get::<Identity>(identity_key(role))
        .await
        .ok()
        .flatten()
}

async fn identity_from_parts(parts: &Parts, role: ChatRole) -> Option<Identity> {
    let session = parts.extensions.get::<Session>()?;
    load_identity(session, role).await
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts, ChatRole::User)
            .await
            .map(Self)
            .ok_or_else(|| rejection(parts, USER_LOGIN_PATH))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts, ChatRole::Admin)
            .await
            .map(Self)
            .ok_or_else(|| rejection(parts, ADMIN_LOGIN_PATH))
    }
}

impl<S> FromRequestParts<S> for RequireParticipant
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = identity_from_parts(parts, ChatRole::User).await;
        let admin = identity_from_parts(parts, ChatRole::Admin).await;

        let chosen = match (user, admin) {
            (Some(_), Some(admin)) if asks_for_admin(parts) => Some((admin, ChatRole::Admin)),
            (Some(user), _) => Some((user, ChatRole::User)),
            (None, Some(admin)) => Some((admin, ChatRole::Admin)),
            (None, None) => None,
        };

        chosen
            .map(|(identity, role)| Self { identity, role })
            .ok_or_else(|| rejection(parts, USER_LOGIN_PATH))
    }
}

impl<S> FromRequestParts<S> for CurrentIdentities
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            user: identity_from_parts(parts, ChatRole::User).await,
            admin: identity_from_parts(parts, ChatRole::Admin).await,
        })
    }
}

/// Store an identity in the session.
///
/// The session id is cycled on login to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_identity(
    session: &Session,
    role: ChatRole,
    identity: &Identity,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(identity_key(role), identity).await
}

/// Remove an identity from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_identity(
    session: &Session,
    role: ChatRole,
) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Identity>(identity_key(role)).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use serde_json::json;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::claims::unsigned_token;

    fn parts_for(uri: &str, session: &Session) -> Parts {
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        parts.extensions.insert(session.clone());
        parts
    }

    fn identity(id: &str) -> Identity {
        Identity::from_token(unsigned_token(&json!({ "id": id }))).unwrap()
    }

    fn new_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_anonymous_page_request_redirects() {
        let session = new_session();
        let mut parts = parts_for("/profile", &session);
        let rejection = RequireUser::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection, AuthRejection::RedirectTo(USER_LOGIN_PATH));
    }

    #[tokio::test]
    async fn test_anonymous_json_request_gets_401() {
        let session = new_session();
        let mut parts = parts_for("/chat/conversation", &session);
        let rejection = RequireParticipant::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection, AuthRejection::Unauthorized);
    }

    #[tokio::test]
    async fn test_admin_gate_redirects_to_admin_login() {
        let session = new_session();
        set_identity(&session, ChatRole::User, &identity("u1"))
            .await
            .unwrap();
        let mut parts = parts_for("/admin", &session);
        let rejection = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection, AuthRejection::RedirectTo(ADMIN_LOGIN_PATH));
    }

    #[tokio::test]
    async fn test_participant_prefers_user_unless_asked() {
        let session = new_session();
        set_identity(&session, ChatRole::User, &identity("u1"))
            .await
            .unwrap();
        set_identity(&session, ChatRole::Admin, &identity("a1"))
            .await
            .unwrap();

        let mut parts = parts_for("/chat", &session);
        let participant = RequireParticipant::from_request_parts(&mut parts, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(participant.role, ChatRole::User);

        let mut parts = parts_for("/chat/ws?as=admin", &session);
        let participant = RequireParticipant::from_request_parts(&mut parts, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(participant.role, ChatRole::Admin);
        assert_eq!(participant.identity.id(), Some("a1"));
    }

    #[tokio::test]
    async fn test_clear_identity_leaves_the_other() {
        let session = new_session();
        set_identity(&session, ChatRole::User, &identity("u1"))
            .await
            .unwrap();
        set_identity(&session, ChatRole::Admin, &identity("a1"))
            .await
            .unwrap();

        clear_identity(&session, ChatRole::User).await.unwrap();

        assert!(load_identity(&session, ChatRole::User).await.is_none());
        assert!(load_identity(&session, ChatRole::Admin).await.is_some());
    }
}
