//! REST client for the shop backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, content, news, orders,
//!   users and chat history. The storefront keeps no copy apart from the
//!   visitor's cart.
//! - Catalog reads are cached in-memory via `moka` (5 minute TTL).
//! - Authenticated calls take the caller's bearer token explicitly; the client
//!   itself holds no identity.
//! - Responses may be bare JSON or wrapped as `{ "data": ... }`; both decode.
//!
//! # Example
//!
//! ```rust,ignore
//! use brewhouse_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let products = client.list_products().await?;
//! let token = client.login("sari@kopi.id", "rahasia123").await?;
//! let orders = client.my_orders(&SecretString::from(token.token)).await?;
//! ```

mod cache;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use brewhouse_core::{ConversationId, OrderId, OrderStatus, ProductId, UserId};

use crate::config::BackendConfig;
use cache::{CacheKey, CacheValue};
pub use types::*;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token was missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the request (4xx other than 401/403/404).
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend failed (5xx).
    #[error("Backend error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Message suitable for showing to the visitor.
    ///
    /// Rejections carry the backend's own wording (e.g. "Email already
    /// registered"); everything else gets a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } if !message.is_empty() => message.clone(),
            Self::Unauthorized(_) => "Your session has expired, please log in again.".to_string(),
            Self::NotFound(_) => "We couldn't find what you were looking for.".to_string(),
            _ => "The shop is not responding right now. Please try again.".to_string(),
        }
    }
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Accepts both `{ "data": T }` and a bare `T`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the shop's REST API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("brewhouse-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Check that the backend answers at all.
    ///
    /// Any HTTP response counts as reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), BackendError> {
        self.inner.client.get(self.url("products")).send().await?;
        Ok(())
    }

    // =========================================================================
    // Catalog (cached)
    // =========================================================================

    /// List every product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let response = self.inner.client.get(self.url("products")).send().await?;
        let products: Vec<Product> = decode(response).await?;

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for unknown ids, or an error if the
    /// API request fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let response = self.inner.client.get(self.url(&path)).send().await?;
        let product: Product = decode(response).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List the editable page copy blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_contents(&self) -> Result<Vec<ContentBlock>, BackendError> {
        let response = self.inner.client.get(self.url("contents")).send().await?;
        decode(response).await
    }

    /// List news posts, newest first as ordered by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_news(&self) -> Result<Vec<NewsArticle>, BackendError> {
        let response = self.inner.client.get(self.url("news")).send().await?;
        decode(response).await
    }

    /// Get a single news post.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for unknown ids, or an error if the
    /// API request fails.
    #[instrument(skip(self))]
    pub async fn get_news(&self, id: &str) -> Result<NewsArticle, BackendError> {
        let path = format!("news/{}", urlencoding::encode(id));
        let response = self.inner.client.get(self.url(&path)).send().await?;
        decode(response).await
    }

    /// Bank account and QRIS details for manual payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn payment_info(&self) -> Result<PaymentInfo, BackendError> {
        let response = self.inner.client.get(self.url("payment-info")).send().await?;
        decode(response).await
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Rejected`] with the backend's message if the
    /// registration is refused (e.g. email taken).
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .post(self.url("users/register"))
            .json(request)
            .send()
            .await?;
        expect_success(response).await
    }

    /// Exchange customer credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] or [`BackendError::Rejected`]
    /// for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, BackendError> {
        let response = self
            .inner
            .client
            .post(self.url("users/login"))
            .json(&Credentials { email, password })
            .send()
            .await?;
        decode(response).await
    }

    /// Exchange admin credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] or [`BackendError::Rejected`]
    /// for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, BackendError> {
        let response = self
            .inner
            .client
            .post(self.url("admin/login"))
            .json(&Credentials { email, password })
            .send()
            .await?;
        decode(response).await
    }

    /// The logged-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the token is rejected.
    #[instrument(skip_all)]
    pub async fn profile(&self, token: &SecretString) -> Result<UserProfile, BackendError> {
        let response = self
            .inner
            .client
            .get(self.url("users/profile"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }

    /// Update the logged-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the token is rejected.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        token: &SecretString,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, BackendError> {
        let response = self
            .inner
            .client
            .put(self.url("users/profile"))
            .bearer_auth(token.expose_secret())
            .json(update)
            .send()
            .await?;
        decode(response).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// The logged-in customer's orders.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the token is rejected.
    #[instrument(skip_all)]
    pub async fn my_orders(&self, token: &SecretString) -> Result<Vec<Order>, BackendError> {
        let response = self
            .inner
            .client
            .get(self.url("orders/mine"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }

    /// Place an order with its payment proof as a multipart upload.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Rejected`] if the backend refuses the order.
    #[instrument(skip_all, fields(lines = order.items.len(), proof_bytes = order.proof.bytes.len()))]
    pub async fn create_order(
        &self,
        token: &SecretString,
        order: NewOrder,
    ) -> Result<Order, BackendError> {
        let items =
            serde_json::to_string(&order.items).map_err(|e| BackendError::Parse(e.to_string()))?;

        let proof = Part::bytes(order.proof.bytes)
            .file_name(order.proof.file_name)
            .mime_str(&order.proof.content_type)?;

        let mut form = Form::new()
            .text("items", items)
            .text("recipient_name", order.recipient_name)
            .text("phone", order.phone)
            .text("address", order.address)
            .text("payment_method", order.payment_method.as_str())
            .part("payment_proof", proof);
        if let Some(notes) = order.notes {
            form = form.text("notes", notes);
        }

        let response = self
            .inner
            .client
            .post(self.url("orders"))
            .bearer_auth(token.expose_secret())
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    /// Every order, for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the admin token is rejected.
    #[instrument(skip_all)]
    pub async fn admin_orders(&self, token: &SecretString) -> Result<Vec<Order>, BackendError> {
        let response = self
            .inner
            .client
            .get(self.url("admin/orders"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the admin token is rejected,
    /// or [`BackendError::NotFound`] for unknown orders.
    #[instrument(skip(self, token, id, status), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &SecretString,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, BackendError> {
        let path = format!("admin/orders/{}/status", urlencoding::encode(id.as_str()));
        let response = self
            .inner
            .client
            .patch(self.url(&path))
            .bearer_auth(token.expose_secret())
            .json(&StatusUpdate { status })
            .send()
            .await?;
        decode(response).await
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// The customer's conversation with the shop, created by the backend on
    /// first access.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the token is rejected.
    #[instrument(skip(self, token, user_id), fields(user_id = %user_id))]
    pub async fn user_conversation(
        &self,
        token: &SecretString,
        user_id: &UserId,
    ) -> Result<Conversation, BackendError> {
        let path = format!(
            "chat/conversations/user/{}",
            urlencoding::encode(user_id.as_str())
        );
        let response = self
            .inner
            .client
            .get(self.url(&path))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }

    /// A conversation by id (admin view).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for unknown conversations.
    #[instrument(skip(self, token, id), fields(conversation_id = %id))]
    pub async fn conversation(
        &self,
        token: &SecretString,
        id: &ConversationId,
    ) -> Result<Conversation, BackendError> {
        let path = format!("chat/conversations/{}", urlencoding::encode(id.as_str()));
        let response = self
            .inner
            .client
            .get(self.url(&path))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }

    /// Admin inbox.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the admin token is rejected.
    #[instrument(skip_all)]
    pub async fn admin_conversations(
        &self,
        token: &SecretString,
    ) -> Result<Vec<ConversationSummary>, BackendError> {
        let response = self
            .inner
            .client
            .get(self.url("admin/chat/conversations"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }
}

// =============================================================================
// Response Handling
// =============================================================================

/// Map a non-success status to a [`BackendError`], reading the error body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        s if s.is_client_error() => BackendError::Rejected {
            status: s.as_u16(),
            message,
        },
        s => BackendError::Server {
            status: s.as_u16(),
            message,
        },
    })
}

/// Check the status and decode a JSON body, unwrapping a `data` envelope.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice::<Envelope<T>>(&bytes)
        .map(Envelope::into_inner)
        .map_err(|e| BackendError::Parse(e.to_string()))
}

/// Check the status and discard the body.
async fn expect_success(response: reqwest::Response) -> Result<(), BackendError> {
    check_status(response).await.map(|_| ())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_wrapped_and_bare() {
        let wrapped: Envelope<Vec<u32>> = serde_json::from_str(r#"{"data": [1, 2]}"#).unwrap();
        let bare: Envelope<Vec<u32>> = serde_json::from_str("[3]").unwrap();
        assert_eq!(wrapped.into_inner(), vec![1, 2]);
        assert_eq!(bare.into_inner(), vec![3]);
    }

    #[test]
    fn test_error_body_aliases() {
        let a: ErrorBody = serde_json::from_str(r#"{"message": "Email sudah terdaftar"}"#).unwrap();
        let b: ErrorBody = serde_json::from_str(r#"{"error": "Invalid token"}"#).unwrap();
        assert_eq!(a.message, "Email sudah terdaftar");
        assert_eq!(b.message, "Invalid token");
    }

    #[test]
    fn test_user_message() {
        let rejected = BackendError::Rejected {
            status: 409,
            message: "Email already registered".to_string(),
        };
        assert_eq!(rejected.user_message(), "Email already registered");

        let server = BackendError::Server {
            status: 500,
            message: "stack trace here".to_string(),
        };
        assert!(!server.user_message().contains("stack trace"));
    }

    #[test]
    fn test_url_joining() {
        let config = BackendConfig {
            api_url: url::Url::parse("http://localhost:5000/api/").unwrap(),
            socket_url: url::Url::parse("ws://localhost:5000/ws").unwrap(),
            timeout: Duration::from_secs(5),
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(client.url("products"), "http://localhost:5000/api/products");
        assert_eq!(client.url("/news/1"), "http://localhost:5000/api/news/1");
    }
}
