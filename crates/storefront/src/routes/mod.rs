//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Home page
//!
//! # Catalog & content
//! GET  /products                   - Product listing (?category=, ?q=)
//! GET  /products/{id}              - Product detail
//! GET  /news                       - News listing
//! GET  /news/{id}                  - News article
//! GET  /contact                    - Shop details and map
//!
//! # Cart (session backed)
//! GET  /cart                       - Cart page
//! POST /cart/add                   - Add to cart
//! POST /cart/update                - Set a line's quantity (0 removes)
//! POST /cart/remove                - Remove a line
//! POST /cart/clear                 - Empty the cart
//! GET  /cart/count                 - Cart badge count (JSON)
//!
//! # Checkout (requires user)
//! GET  /checkout                   - Order form with payment instructions
//! POST /checkout                   - Place order (multipart, payment proof)
//!
//! # Auth
//! GET  /auth/login                 - Login page
//! POST /auth/login                 - Login action
//! GET  /auth/register              - Register page
//! POST /auth/register              - Register action
//! POST /auth/logout                - Logout action (also empties the cart)
//!
//! # Profile (requires user)
//! GET  /profile                    - Profile, token details, order history
//! POST /profile                    - Update profile
//!
//! # Chat (requires user or admin)
//! GET  /chat                       - Chat page
//! GET  /chat/conversation          - Conversation JSON (?id= for admins)
//! GET  /chat/ws                    - WebSocket relay to the backend socket
//!
//! # API
//! POST /api/translate              - Batch page translation
//!
//! # Admin
//! GET  /admin/login                - Admin login page
//! POST /admin/login                - Admin login action
//! POST /admin/logout               - Admin logout
//! GET  /admin                      - Order dashboard (requires admin)
//! POST /admin/orders/{id}/status   - Change order status (requires admin)
//! GET  /admin/chat                 - Conversation inbox (requires admin)
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod contact;
pub mod home;
pub mod news;
pub mod products;
pub mod profile;
pub mod translate;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tower_sessions::Session;

use brewhouse_core::{OrderStatus, Price};

use crate::backend::Order;
use crate::backend::types::ChatRole;
use crate::filters;
use crate::middleware::auth::{ADMIN_LOGIN_PATH, USER_LOGIN_PATH};
use crate::middleware::{auth_rate_limiter, clear_identity, translate_rate_limiter};
use crate::models::Notification;
use crate::page::PageContext;
use crate::state::AppState;

/// Largest accepted checkout upload, payment proof included.
pub const CHECKOUT_BODY_LIMIT: usize = 6 * 1024 * 1024;

// =============================================================================
// Shared Templates & Helpers
// =============================================================================

/// Not found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub page: PageContext,
    pub what: String,
}

/// Render the not found page with a 404 status.
pub fn not_found(page: PageContext, what: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            page,
            what: what.into(),
        },
    )
        .into_response()
}

/// Fallback for unknown paths.
async fn fallback(page: PageContext) -> Response {
    not_found(page, "page")
}

/// The backend rejected a stored token: drop that identity and send the
/// visitor to log in again.
pub async fn session_expired(session: &Session, role: ChatRole) -> Response {
    if let Err(e) = clear_identity(session, role).await {
        tracing::warn!("Failed to clear expired identity: {e}");
    }
    Notification::error("Your session has expired, please log in again.")
        .post(session)
        .await;

    let login = match role {
        ChatRole::User => USER_LOGIN_PATH,
        ChatRole::Admin => ADMIN_LOGIN_PATH,
    };
    Redirect::to(login).into_response()
}

/// Post a notification and redirect.
pub async fn redirect_with(session: &Session, notification: Notification, to: &str) -> Response {
    notification.post(session).await;
    Redirect::to(to).into_response()
}

/// Only same-site relative paths are followed after a form post.
#[must_use]
pub fn safe_redirect(target: Option<&str>, default: &'static str) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => default.to_string(),
    }
}

/// Human-readable timestamp, or an empty string.
#[must_use]
pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_default()
}

/// Resolve a backend-relative asset path (e.g. `/uploads/proof.jpg`)
/// against the backend URL. Absolute URLs pass through.
#[must_use]
pub fn backend_asset_url(state: &AppState, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    state
        .config()
        .backend
        .api_url
        .join(path)
        .map_or_else(|_| path.to_string(), String::from)
}

/// One line of an order, ready to render.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: Option<Price>,
}

/// An order as shown on the profile page and the admin dashboard.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub placed_at: String,
    pub status: OrderStatus,
    pub payment_label: &'static str,
    pub total: Price,
    pub lines: Vec<OrderLineView>,
    pub customer_name: String,
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub notes: String,
    pub proof_url: Option<String>,
}

impl OrderView {
    /// Build the view, resolving the proof image against the backend.
    #[must_use]
    pub fn new(order: Order, state: &AppState) -> Self {
        let lines = order
            .items
            .into_iter()
            .map(|line| OrderLineView {
                name: line
                    .name
                    .unwrap_or_else(|| line.product_id.as_str().to_string()),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        Self {
            id: order.id.into_inner(),
            placed_at: format_timestamp(order.created_at),
            status: order.status,
            payment_label: order.payment_method.label(),
            total: order.total,
            lines,
            customer_name: order
                .customer_name
                .unwrap_or_else(|| order.recipient_name.clone()),
            recipient_name: order.recipient_name,
            phone: order.phone,
            address: order.address,
            notes: order.notes.unwrap_or_default(),
            proof_url: order
                .payment_proof_url
                .map(|path| backend_asset_url(state, &path)),
        }
    }

    /// CSS modifier for the status badge.
    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self.status {
            OrderStatus::Pending => "badge--pending",
            OrderStatus::Paid | OrderStatus::Processing => "badge--active",
            OrderStatus::Shipped | OrderStatus::Completed => "badge--done",
            OrderStatus::Cancelled => "badge--cancelled",
        }
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the auth routes router.
///
/// Form submissions are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(admin::login))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/", get(admin::dashboard))
        .route("/login", get(admin::login_page))
        .route("/logout", post(admin::logout))
        .route("/orders/{id}/status", post(admin::update_status))
        .route("/chat", get(admin::inbox))
        .merge(limited)
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/translate", post(translate::translate))
        .route_layer(translate_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog & content
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/news", get(news::index))
        .route("/news/{id}", get(news::show))
        .route("/contact", get(contact::show))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout
        .route(
            "/checkout",
            get(checkout::show)
                .post(checkout::submit)
                .layer(DefaultBodyLimit::max(CHECKOUT_BODY_LIMIT)),
        )
        // Account
        .nest("/auth", auth_routes())
        .route("/profile", get(profile::show).post(profile::update))
        // Chat
        .route("/chat", get(chat::show))
        .route("/chat/conversation", get(chat::conversation))
        .route("/chat/ws", get(chat::socket))
        // API
        .nest("/api", api_routes())
        // Admin
        .nest("/admin", admin_routes())
        .fallback(fallback)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/products?q=aren"), "/cart"), "/products?q=aren");
        assert_eq!(safe_redirect(Some("https://evil.example"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("//evil.example"), "/cart"), "/cart");
        assert_eq!(safe_redirect(Some("/\\evil.example"), "/cart"), "/cart");
        assert_eq!(safe_redirect(None, "/cart"), "/cart");
    }

    #[test]
    fn test_format_timestamp() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(Some(at)), "01 May 2024, 10:30");
        assert_eq!(format_timestamp(None), "");
    }
}
