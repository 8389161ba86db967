//! Customer profile and order history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use brewhouse_core::UserId;

use crate::backend::types::ChatRole;
use crate::backend::{BackendError, ProfileUpdate, UserProfile};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::{Notification, TokenClaims};
use crate::page::PageContext;
use crate::routes::{OrderView, format_timestamp, redirect_with, session_expired};
use crate::state::AppState;

/// Token details shown on the profile page.
#[derive(Debug, Clone)]
pub struct TokenView {
    pub id: String,
    pub email: String,
    pub role: String,
    pub issued_at: String,
    pub expires_at: String,
}

impl From<&TokenClaims> for TokenView {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            id: claims.id.clone().unwrap_or_default(),
            email: claims.email.clone().unwrap_or_default(),
            role: claims.role.clone().unwrap_or_else(|| "customer".to_string()),
            issued_at: format_timestamp(claims.issued_at()),
            expires_at: format_timestamp(claims.expires_at()),
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub profile: UserProfile,
    pub token: TokenView,
    pub orders: Vec<OrderView>,
}

/// Profile edit form.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl ProfileForm {
    /// Trim the fields and require a name.
    ///
    /// # Errors
    ///
    /// Returns the message to show the customer.
    pub fn validate(self) -> Result<ProfileUpdate, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required.".to_string());
        }
        Ok(ProfileUpdate {
            name: name.to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
        })
    }
}

/// Profile built from the token alone, shown when the backend copy cannot
/// be loaded.
fn profile_from_claims(claims: &TokenClaims) -> UserProfile {
    UserProfile {
        id: UserId::new(claims.id.clone().unwrap_or_default()),
        name: claims.name.clone().unwrap_or_default(),
        email: claims.email.clone().unwrap_or_default(),
        phone: None,
        address: None,
    }
}

/// Display the profile page with the customer's orders, newest first.
///
/// A failed profile or order fetch still renders the page, from the token
/// claims and with an empty history, plus an error notification.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireUser(identity): RequireUser,
    page: PageContext,
) -> Response {
    let token = identity.bearer();
    let (profile, orders) = tokio::join!(
        state.backend().profile(&token),
        state.backend().my_orders(&token),
    );

    if matches!(profile, Err(BackendError::Unauthorized(_)))
        || matches!(orders, Err(BackendError::Unauthorized(_)))
    {
        return session_expired(&session, ChatRole::User).await;
    }

    let mut failure = None;
    let profile = profile.unwrap_or_else(|e| {
        tracing::warn!("Failed to load profile: {e}");
        failure.get_or_insert(e.user_message());
        profile_from_claims(&identity.claims)
    });
    let mut orders = orders.unwrap_or_else(|e| {
        tracing::warn!("Failed to load orders: {e}");
        failure.get_or_insert(e.user_message());
        Vec::new()
    });
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let page = match failure {
        Some(message) => page.with_notification(Notification::error(message)),
        None => page,
    };

    ProfileTemplate {
        page,
        profile,
        token: TokenView::from(&identity.claims),
        orders: orders
            .into_iter()
            .map(|order| OrderView::new(order, &state))
            .collect(),
    }
    .into_response()
}

/// Save profile changes.
///
/// # Errors
///
/// Returns an error if the backend fails for a reason other than the
/// token or the submitted data.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireUser(identity): RequireUser,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let update = match form.validate() {
        Ok(update) => update,
        Err(message) => {
            return Ok(redirect_with(&session, Notification::error(message), "/profile").await);
        }
    };

    match state
        .backend()
        .update_profile(&identity.bearer(), &update)
        .await
    {
        Ok(_) => {
            Ok(redirect_with(&session, Notification::success("Profile updated."), "/profile").await)
        }
        Err(BackendError::Unauthorized(_)) => Ok(session_expired(&session, ChatRole::User).await),
        Err(e @ BackendError::Rejected { .. }) => {
            Ok(redirect_with(&session, Notification::error(e.user_message()), "/profile").await)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_profile_form_trims() {
        let form = ProfileForm {
            name: "  Sari ".to_string(),
            phone: " 0812 ".to_string(),
            address: String::new(),
        };
        let update = form.validate().unwrap();
        assert_eq!(update.name, "Sari");
        assert_eq!(update.phone, "0812");
        assert!(update.address.is_empty());
    }

    #[test]
    fn test_profile_form_requires_name() {
        let form = ProfileForm {
            name: " ".to_string(),
            phone: String::new(),
            address: String::new(),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_token_view() {
        let claims: TokenClaims = serde_json::from_value(json!({
            "id": "u1",
            "email": "sari@kopi.id",
            "iat": 1_714_557_600,
            "exp": 1_714_644_000
        }))
        .unwrap();

        let view = TokenView::from(&claims);
        assert_eq!(view.id, "u1");
        assert_eq!(view.role, "customer");
        assert_eq!(view.issued_at, "01 May 2024, 10:00");
        assert_eq!(view.expires_at, "02 May 2024, 10:00");
    }

    #[test]
    fn test_profile_from_claims() {
        let claims: TokenClaims = serde_json::from_value(json!({
            "id": "u1",
            "name": "Sari",
            "email": "sari@kopi.id"
        }))
        .unwrap();

        let profile = profile_from_claims(&claims);
        assert_eq!(profile.id.as_str(), "u1");
        assert_eq!(profile.name, "Sari");
        assert_eq!(profile.email, "sari@kopi.id");
        assert!(profile.phone.is_none());
    }
}
