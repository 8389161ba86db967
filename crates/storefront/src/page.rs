//! Layout data shared by every rendered page.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::backend::types::ChatRole;
use crate::config::ShopConfig;
use crate::middleware::load_identity;
use crate::models::notification::DISMISS_AFTER_MS;
use crate::models::{Notification, session};
use crate::state::AppState;

/// What `base.html` needs: shop details, who is logged in, the cart badge
/// and the notification to show.
///
/// Extracting this takes the pending notification out of the session, so
/// only handlers that render a page should ask for it.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub shop: ShopConfig,
    pub user_name: Option<String>,
    pub admin_name: Option<String>,
    pub cart_count: u32,
    pub notification: Option<Notification>,
    pub dismiss_after_ms: u32,
    pub translator_enabled: bool,
}

impl PageContext {
    /// Show a notification on this render instead of the next one.
    #[must_use]
    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }

    /// Whether a customer is logged in.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user_name.is_some()
    }

    /// Whether an admin is logged in.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.admin_name.is_some()
    }

    fn anonymous(state: &AppState) -> Self {
        Self {
            shop: state.config().shop.clone(),
            user_name: None,
            admin_name: None,
            cart_count: 0,
            notification: None,
            dismiss_after_ms: DISMISS_AFTER_MS,
            translator_enabled: state.translator().is_some(),
        }
    }
}

impl PageContext {
    /// Build the context for `session`, taking its pending notification.
    ///
    /// Handlers that may redirect instead of rendering call this on the
    /// render branch only, so the notification survives the redirect.
    pub async fn load(state: &AppState, session: &Session) -> Self {
        let mut context = Self::anonymous(state);
        context.user_name = load_identity(session, ChatRole::User)
            .await
            .map(|identity| identity.display_name());
        context.admin_name = load_identity(session, ChatRole::Admin)
            .await
            .map(|identity| identity.display_name());
        context.cart_count = session::load_cart(session).await.item_count();
        context.notification = Notification::take(session).await;
        context
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Session>() {
            Some(session) => Ok(Self::load(state, session).await),
            None => Ok(Self::anonymous(state)),
        }
    }
}
