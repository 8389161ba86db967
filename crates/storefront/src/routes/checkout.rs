//! Checkout: shipping details plus an uploaded payment proof.
//!
//! Payment happens outside the shop (bank transfer or QRIS). The customer
//! uploads a screenshot of the transfer and an admin confirms it later.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use brewhouse_core::{Cart, PaymentMethod};

use crate::backend::types::ChatRole;
use crate::backend::{BackendError, NewOrder, NewOrderLine, PaymentInfo, PaymentProof};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::Notification;
use crate::models::session::{clear_cart, load_cart};
use crate::page::PageContext;
use crate::routes::{backend_asset_url, redirect_with, session_expired};
use crate::state::AppState;

/// Largest accepted payment proof.
pub const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;

/// Raw checkout form as submitted.
#[derive(Debug, Default, Clone)]
pub struct CheckoutForm {
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub notes: String,
    pub payment_method: String,
    pub proof: Option<PaymentProof>,
}

impl CheckoutForm {
    /// Check the form against the cart and build the order.
    ///
    /// # Errors
    ///
    /// Returns the message to show the customer.
    pub fn validate(self, cart: &Cart) -> Result<NewOrder, String> {
        if cart.is_empty() {
            return Err("Your cart is empty.".to_string());
        }
        let recipient_name = required(&self.recipient_name, "Recipient name")?;
        let phone = required(&self.phone, "Phone number")?;
        let address = required(&self.address, "Address")?;
        let payment_method: PaymentMethod = self
            .payment_method
            .parse()
            .map_err(|_| "Choose a payment method.".to_string())?;

        let proof = self
            .proof
            .filter(|p| !p.bytes.is_empty())
            .ok_or_else(|| "Upload your payment proof.".to_string())?;
        if !proof.content_type.starts_with("image/") {
            return Err("Payment proof must be an image.".to_string());
        }
        if proof.bytes.len() > MAX_PROOF_BYTES {
            return Err("Payment proof must be 5 MB or smaller.".to_string());
        }

        let notes = self.notes.trim();
        Ok(NewOrder {
            recipient_name,
            phone,
            address,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            payment_method,
            items: cart
                .lines()
                .iter()
                .map(|item| NewOrderLine {
                    product_id: item.product.id.clone(),
                    quantity: item.quantity.get(),
                })
                .collect(),
            proof,
        })
    }
}

fn required(value: &str, label: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(format!("{label} is required."))
    } else {
        Ok(value.to_string())
    }
}

/// Read the multipart body into a [`CheckoutForm`].
async fn read_form(mut multipart: Multipart) -> Result<CheckoutForm, AppError> {
    let mut form = CheckoutForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "payment_proof" {
            let file_name = field.file_name().unwrap_or("proof").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.proof = Some(PaymentProof {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "recipient_name" => form.recipient_name = value,
            "phone" => form.phone = value,
            "address" => form.address = value,
            "notes" => form.notes = value,
            "payment_method" => form.payment_method = value,
            _ => {}
        }
    }

    Ok(form)
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: Cart,
    pub payment: PaymentInfo,
    pub qris_image_url: Option<String>,
    pub methods: [PaymentMethod; 2],
    pub form: CheckoutForm,
}

impl CheckoutTemplate {
    fn new(
        state: &AppState,
        page: PageContext,
        cart: Cart,
        payment: PaymentInfo,
        form: CheckoutForm,
    ) -> Self {
        let qris_image_url = payment
            .qris_image_url
            .as_deref()
            .map(|path| backend_asset_url(state, path));
        Self {
            page,
            cart,
            payment,
            qris_image_url,
            methods: [PaymentMethod::BankTransfer, PaymentMethod::Qris],
            form,
        }
    }

    /// Whether `method` should be pre-selected.
    #[must_use]
    pub fn is_selected(&self, method: &PaymentMethod) -> bool {
        self.form
            .payment_method
            .parse::<PaymentMethod>()
            .map_or(*method == PaymentMethod::default(), |chosen| chosen == *method)
    }
}

/// Payment instructions, or empty ones with a notification on failure.
async fn payment_info(state: &AppState, page: PageContext) -> (PaymentInfo, PageContext) {
    match state.backend().payment_info().await {
        Ok(info) => (info, page),
        Err(e) => {
            tracing::warn!("Failed to load payment info: {e}");
            (
                PaymentInfo::default(),
                page.with_notification(Notification::error(e.user_message())),
            )
        }
    }
}

/// Display the checkout form.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    session: Session,
    page: PageContext,
) -> Response {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return redirect_with(
            &session,
            Notification::info("Your cart is empty. Add something before checking out."),
            "/cart",
        )
        .await;
    }

    let (payment, page) = payment_info(&state, page).await;
    CheckoutTemplate::new(&state, page, cart, payment, CheckoutForm::default()).into_response()
}

/// Place the order.
///
/// # Errors
///
/// Returns an error if the multipart body cannot be read or the session
/// cannot be modified.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    page: PageContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(redirect_with(
            &session,
            Notification::info("Your cart is empty. Add something before checking out."),
            "/cart",
        )
        .await);
    }

    let form = read_form(multipart).await?;
    let order = match form.clone().validate(&cart) {
        Ok(order) => order,
        Err(message) => {
            let (payment, page) = payment_info(&state, page).await;
            let page = page.with_notification(Notification::error(message));
            return Ok(CheckoutTemplate::new(&state, page, cart, payment, form).into_response());
        }
    };

    match state.backend().create_order(&user.bearer(), order).await {
        Ok(placed) => {
            clear_cart(&session).await?;
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", placed.id.as_str())]));
            Ok(redirect_with(
                &session,
                Notification::success("Order placed! We'll confirm your payment shortly."),
                "/profile",
            )
            .await)
        }
        Err(BackendError::Unauthorized(_)) => Ok(session_expired(&session, ChatRole::User).await),
        Err(e) => {
            tracing::warn!("Order rejected: {e}");
            let (payment, page) = payment_info(&state, page).await;
            let page = page.with_notification(Notification::error(e.user_message()));
            Ok(CheckoutTemplate::new(&state, page, cart, payment, form).into_response())
        }
    }
}
