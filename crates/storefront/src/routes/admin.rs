//! Admin pages: order verification and the chat inbox.
//!
//! Admins log in separately from customers; both identities can live in
//! the same session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use brewhouse_core::{Email, OrderId, OrderStatus};

use crate::backend::types::ChatRole;
use crate::backend::{BackendError, ConversationSummary};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{CurrentIdentities, RequireAdmin, clear_identity, set_identity};
use crate::models::{Identity, Notification};
use crate::page::PageContext;
use crate::routes::auth::LoginForm;
use crate::routes::chat::close_relay;
use crate::routes::{OrderView, format_timestamp, redirect_with, session_expired};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Admin login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub page: PageContext,
}

/// Order dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
    pub statuses: [OrderStatus; 6],
    pub filter: Option<OrderStatus>,
    pub pending_count: usize,
}

impl DashboardTemplate {
    fn is_filter(&self, status: &OrderStatus) -> bool {
        self.filter.as_ref() == Some(status)
    }
}

/// Inbox row, ready to render.
#[derive(Debug, Clone)]
pub struct InboxRow {
    pub chat_url: String,
    pub customer: String,
    pub last_message: String,
    pub updated: String,
    pub unread: u32,
}

impl From<ConversationSummary> for InboxRow {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            chat_url: format!(
                "/chat?as=admin&id={}",
                urlencoding::encode(summary.id.as_str())
            ),
            customer: summary
                .user_name
                .unwrap_or_else(|| summary.user_id.into_inner()),
            last_message: summary.last_message.unwrap_or_default(),
            updated: format_timestamp(summary.updated_at),
            unread: summary.unread,
        }
    }
}

/// Chat inbox template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/chat.html")]
pub struct InboxTemplate {
    pub page: PageContext,
    pub conversations: Vec<InboxRow>,
}

// =============================================================================
// Login
// =============================================================================

/// Display the admin login page.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    identities: CurrentIdentities,
) -> Response {
    if identities.admin.is_some() {
        return Redirect::to("/admin").into_response();
    }
    AdminLoginTemplate {
        page: PageContext::load(&state, &session).await,
    }
    .into_response()
}

/// Handle admin login.
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
            "/admin/login",
        )
        .await);
    };

    let token = match state
        .backend()
        .admin_login(email.as_str(), &form.password)
        .await
    {
        Ok(response) => response.token,
        Err(BackendError::Unauthorized(_)) => {
            return Ok(redirect_with(
                &session,
                Notification::error("Invalid admin credentials."),
                "/admin/login",
            )
            .await);
        }
        Err(e) => {
            tracing::warn!("Admin login failed: {e}");
            return Ok(
                redirect_with(&session, Notification::error(e.user_message()), "/admin/login")
                    .await,
            );
        }
    };

    let Ok(identity) = Identity::from_token(token) else {
        tracing::error!("Backend issued an unreadable admin token");
        return Ok(redirect_with(
            &session,
            Notification::error("Login failed, please try again."),
            "/admin/login",
        )
        .await);
    };

    set_identity(&session, ChatRole::Admin, &identity).await?;
    close_relay(&state, &session, ChatRole::Admin).await;
    tracing::info!(admin_id = ?identity.id(), "Admin logged in");

    Ok(redirect_with(
        &session,
        Notification::success(format!("Signed in as {}.", identity.display_name())),
        "/admin",
    )
    .await)
}

/// Handle admin logout. The customer side of the session is untouched.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    clear_identity(&session, ChatRole::Admin).await?;
    close_relay(&state, &session, ChatRole::Admin).await;
    Ok(redirect_with(&session, Notification::info("Admin signed out."), "/admin/login").await)
}

// =============================================================================
// Orders
// =============================================================================

/// Dashboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub status: Option<String>,
}

/// Keep only orders with the given status; pending orders first otherwise.
fn arrange(mut orders: Vec<OrderView>, filter: Option<OrderStatus>) -> Vec<OrderView> {
    if let Some(status) = filter {
        orders.retain(|order| order.status == status);
    }
    orders.sort_by_key(|order| order.status != OrderStatus::Pending);
    orders
}

/// Display the order dashboard.
///
/// A failed fetch renders an empty dashboard with an error notification.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<DashboardQuery>,
    page: PageContext,
) -> Response {
    let (orders, page) = match state.backend().admin_orders(&admin.bearer()).await {
        Ok(orders) => (orders, page),
        Err(BackendError::Unauthorized(_)) => {
            return session_expired(&session, ChatRole::Admin).await;
        }
        Err(e) => {
            tracing::warn!("Failed to load orders: {e}");
            (Vec::new(), page.with_notification(Notification::error(e.user_message())))
        }
    };

    let filter = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok());
    let orders: Vec<OrderView> = orders
        .into_iter()
        .map(|order| OrderView::new(order, &state))
        .collect();
    let pending_count = orders
        .iter()
        .filter(|order| order.status == OrderStatus::Pending)
        .count();

    DashboardTemplate {
        page,
        orders: arrange(orders, filter),
        statuses: OrderStatus::ALL,
        filter,
        pending_count,
    }
    .into_response()
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Move an order to a new status.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
#[instrument(skip(state, session, admin, form), fields(order_id = %id))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let Ok(status) = form.status.parse::<OrderStatus>() else {
        return Ok(
            redirect_with(&session, Notification::error("Unknown order status."), "/admin").await,
        );
    };

    match state
        .backend()
        .update_order_status(&admin.bearer(), &id, status)
        .await
    {
        Ok(_) => {
            add_breadcrumb(
                "admin",
                "Order status changed",
                Some(&[("order_id", id.as_str()), ("status", status.as_str())]),
            );
            Ok(redirect_with(
                &session,
                Notification::success(format!("Order {id} marked {}.", status.label())),
                "/admin",
            )
            .await)
        }
        Err(BackendError::Unauthorized(_)) => Ok(session_expired(&session, ChatRole::Admin).await),
        Err(e @ (BackendError::NotFound(_) | BackendError::Rejected { .. })) => {
            Ok(redirect_with(&session, Notification::error(e.user_message()), "/admin").await)
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Chat Inbox
// =============================================================================

/// Display the conversation inbox.
///
/// A failed fetch renders an empty inbox with an error notification.
#[instrument(skip_all)]
pub async fn inbox(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
) -> Response {
    let (mut conversations, page) =
        match state.backend().admin_conversations(&admin.bearer()).await {
            Ok(conversations) => (conversations, page),
            Err(BackendError::Unauthorized(_)) => {
                return session_expired(&session, ChatRole::Admin).await;
            }
            Err(e) => {
                tracing::warn!("Failed to load conversations: {e}");
                (Vec::new(), page.with_notification(Notification::error(e.user_message())))
            }
        };
    conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    InboxTemplate {
        page,
        conversations: conversations.into_iter().map(InboxRow::from).collect(),
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brewhouse_core::Price;

    use super::*;

    fn view(id: &str, status: OrderStatus) -> OrderView {
        OrderView {
            id: id.to_string(),
            placed_at: String::new(),
            status,
            payment_label: "QRIS",
            total: Price::from_rupiah(20_000),
            lines: Vec::new(),
            customer_name: String::new(),
            recipient_name: String::new(),
            phone: String::new(),
            address: String::new(),
            notes: String::new(),
            proof_url: None,
        }
    }

    fn ids(orders: &[OrderView]) -> Vec<&str> {
        orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_arrange_puts_pending_first() {
        let orders = vec![
            view("a", OrderStatus::Shipped),
            view("b", OrderStatus::Pending),
            view("c", OrderStatus::Paid),
            view("d", OrderStatus::Pending),
        ];
        assert_eq!(ids(&arrange(orders, None)), ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_arrange_filters_by_status() {
        let orders = vec![view("a", OrderStatus::Shipped), view("b", OrderStatus::Pending)];
        assert_eq!(ids(&arrange(orders, Some(OrderStatus::Shipped))), ["a"]);
    }

    #[test]
    fn test_inbox_row_falls_back_to_user_id() {
        let summary: ConversationSummary = serde_json::from_value(serde_json::json!({
            "_id": "c1",
            "user_id": "u1",
            "last_message": "Halo"
        }))
        .unwrap();

        let row = InboxRow::from(summary);
        assert_eq!(row.customer, "u1");
        assert_eq!(row.chat_url, "/chat?as=admin&id=c1");
        assert_eq!(row.last_message, "Halo");
    }
}
