//! Cart route handlers.
//!
//! The cart lives in the session as JSON. Every mutation loads it, changes
//! it, saves it and redirects back with a notification.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use brewhouse_core::{Cart, ProductId, Quantity};

use crate::backend::BackendError;
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::models::Notification;
use crate::models::session::{clear_cart, load_cart, save_cart};
use crate::page::PageContext;
use crate::routes::{redirect_with, safe_redirect};
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub redirect_to: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart badge payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct CartCount {
    pub count: u32,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: Cart,
    pub max_quantity: u32,
}

/// Display cart page.
#[instrument(skip(session, page))]
pub async fn show(session: Session, page: PageContext) -> impl IntoResponse {
    CartShowTemplate {
        page,
        cart: load_cart(&session).await,
        max_quantity: Quantity::MAX,
    }
}

/// Add a product to the cart.
///
/// The product is fetched from the backend so the stored snapshot carries
/// the real price, not whatever the form said.
///
/// # Errors
///
/// Returns an error if the session cannot be saved.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let back = safe_redirect(form.redirect_to.as_deref(), "/cart");

    let quantity = match Quantity::new(form.quantity.unwrap_or(1)) {
        Ok(quantity) => quantity,
        Err(e) => {
            return Ok(redirect_with(&session, Notification::error(e.to_string()), &back).await);
        }
    };

    let product = match state.backend().get_product(&form.product_id).await {
        Ok(product) => product,
        Err(BackendError::NotFound(_)) => {
            return Ok(redirect_with(
                &session,
                Notification::error("That product is no longer available."),
                &back,
            )
            .await);
        }
        Err(e) => {
            tracing::warn!("Failed to load product for cart: {e}");
            return Ok(
                redirect_with(&session, Notification::error(e.user_message()), &back).await,
            );
        }
    };

    if !product.in_stock() {
        return Ok(redirect_with(
            &session,
            Notification::error(format!("{} is sold out.", product.name)),
            &back,
        )
        .await);
    }

    let mut cart = load_cart(&session).await;
    cart.add(product.snapshot(), quantity);
    save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product.id.as_str())]));

    Ok(redirect_with(
        &session,
        Notification::success(format!("{} added to cart.", product.name)),
        &back,
    )
    .await)
}

/// Set the quantity of a cart line. Zero removes the line.
///
/// # Errors
///
/// Returns an error if the session cannot be saved.
#[instrument(skip(session, form), fields(product_id = %form.product_id, quantity = form.quantity))]
pub async fn update(
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    if !cart.update(&form.product_id, form.quantity) {
        return Ok(redirect_with(
            &session,
            Notification::error("That item is not in your cart."),
            "/cart",
        )
        .await);
    }
    save_cart(&session, &cart).await?;

    Ok(redirect_with(&session, Notification::info("Cart updated."), "/cart").await)
}

/// Remove a line from the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be saved.
#[instrument(skip(session, form), fields(product_id = %form.product_id))]
pub async fn remove(
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await;
    if cart.remove(&form.product_id) {
        save_cart(&session, &cart).await?;
    }
    Ok(redirect_with(&session, Notification::info("Item removed."), "/cart").await)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Response, AppError> {
    clear_cart(&session).await?;
    Ok(redirect_with(&session, Notification::info("Cart cleared."), "/cart").await)
}

/// Cart badge count.
pub async fn count(session: Session) -> Json<CartCount> {
    Json(CartCount {
        count: load_cart(&session).await.item_count(),
    })
}
