//! Authentication route handlers.
//!
//! The backend issues a token on login; the storefront decodes its claims
//! and keeps both in the session. Nothing is verified locally.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use brewhouse_core::Email;

use crate::backend::types::ChatRole;
use crate::backend::{BackendError, RegisterRequest};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CurrentIdentities, clear_identity, set_identity};
use crate::models::session::clear_cart;
use crate::models::{Identity, Notification};
use crate::page::PageContext;
use crate::routes::chat::close_relay;
use crate::routes::redirect_with;
use crate::state::AppState;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub phone: String,
}

impl RegisterForm {
    /// Check the form before bothering the backend.
    ///
    /// # Errors
    ///
    /// Returns the message to show the visitor.
    pub fn validate(&self) -> Result<Email, String> {
        if self.name.trim().is_empty() {
            return Err("Name is required.".to_string());
        }
        let email = Email::parse(&self.email).map_err(|e| format!("Email {e}."))?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters."
            ));
        }
        if self.password != self.password_confirm {
            return Err("Passwords do not match.".to_string());
        }
        Ok(email)
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub min_password_len: usize,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    identities: CurrentIdentities,
) -> Response {
    if identities.user.is_some() {
        return Redirect::to("/profile").into_response();
    }
    LoginTemplate {
        page: PageContext::load(&state, &session).await,
    }
    .into_response()
}

/// Handle login form submission.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(redirect_with(
            &session,
            Notification::error("Enter a valid email address."),
            "/auth/login",
        )
        .await);
    };

    let token = match state.backend().login(email.as_str(), &form.password).await {
        Ok(response) => response.token,
        Err(BackendError::Unauthorized(_)) => {
            return Ok(redirect_with(
                &session,
                Notification::error("Invalid email or password."),
                "/auth/login",
            )
            .await);
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            return Ok(
                redirect_with(&session, Notification::error(e.user_message()), "/auth/login")
                    .await,
            );
        }
    };

    let identity = match Identity::from_token(token) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("Backend issued an unreadable token: {e}");
            return Ok(redirect_with(
                &session,
                Notification::error("Login failed, please try again."),
                "/auth/login",
            )
            .await);
        }
    };

    set_identity(&session, ChatRole::User, &identity).await?;
    // A new identity needs a fresh chat connection.
    close_relay(&state, &session, ChatRole::User).await;

    if let Some(id) = identity.id() {
        set_sentry_user(&id, identity.claims.email.as_deref());
    }
    tracing::info!(user_id = ?identity.id(), "User logged in");

    Ok(redirect_with(
        &session,
        Notification::success(format!("Welcome back, {}!", identity.display_name())),
        "/",
    )
    .await)
}

/// Handle logout. Empties the cart as well.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    clear_identity(&session, ChatRole::User).await?;
    clear_cart(&session).await?;
    close_relay(&state, &session, ChatRole::User).await;
    clear_sentry_user();

    Ok(redirect_with(&session, Notification::info("You have been logged out."), "/").await)
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        page,
        min_password_len: MIN_PASSWORD_LEN,
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let email = match form.validate() {
        Ok(email) => email,
        Err(message) => {
            return redirect_with(&session, Notification::error(message), "/auth/register").await;
        }
    };

    let request = RegisterRequest {
        name: form.name.trim(),
        email: email.as_str(),
        password: &form.password,
        phone: form.phone.trim(),
    };

    match state.backend().register(&request).await {
        Ok(()) => {
            redirect_with(
                &session,
                Notification::success("Account created. Please log in."),
                "/auth/login",
            )
            .await
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            redirect_with(&session, Notification::error(e.user_message()), "/auth/register").await
        }
    }
}
