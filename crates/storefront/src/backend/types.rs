//! View models exchanged with the shop backend.
//!
//! The backend owns these entities; the storefront only reads and renders
//! them, so every field that the backend may omit has a serde default.
//! Document-style `_id` keys are accepted as aliases for `id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brewhouse_core::{
    ConversationId, MessageId, NewsId, OrderId, OrderStatus, PaymentMethod, Price, ProductId,
    ProductSnapshot, UserId,
};

// =============================================================================
// Catalog & Content
// =============================================================================

/// A product as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default, alias = "featured")]
    pub is_featured: bool,
}

impl Product {
    /// Copy of the fields the cart keeps.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
        }
    }

    /// Unknown stock counts as available.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|stock| stock > 0)
    }
}

/// An editable block of home/about page copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

/// A news post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(alias = "_id")]
    pub id: NewsId,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "content")]
    pub body: String,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub published_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Accounts
// =============================================================================

/// Email/password pair for user and admin login.
#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of the registration call.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone: &'a str,
}

/// Login response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "accessToken", alias = "access_token")]
    pub token: String,
}

/// A customer's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Editable profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    pub address: String,
}

// =============================================================================
// Orders & Payment
// =============================================================================

/// One line of a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<Price>,
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    pub total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_proof_url: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Product id and quantity as sent when placing an order.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Uploaded payment proof image.
#[derive(Debug, Clone)]
pub struct PaymentProof {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything the backend needs to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewOrderLine>,
    pub proof: PaymentProof,
}

/// Where customers send money before uploading proof.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub account_holder: String,
    #[serde(default, alias = "qris_image")]
    pub qris_image_url: Option<String>,
}

/// Body of the admin status change call.
#[derive(Debug, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

// =============================================================================
// Chat
// =============================================================================

/// Which side of a conversation sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Admin,
}

impl ChatRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(alias = "_id")]
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: String,
    pub sender_role: ChatRole,
    pub text: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A customer's thread with the shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(alias = "_id")]
    pub id: ConversationId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Inbox row for admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(alias = "_id")]
    pub id: ConversationId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_accepts_document_style_keys() {
        let json = r#"{
            "_id": "65f0a1",
            "name": "Aren Latte",
            "price": 28000,
            "image": "https://cdn.kopi.id/aren.jpg",
            "featured": true
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "65f0a1");
        assert_eq!(product.price, Price::from_rupiah(28_000));
        assert_eq!(product.image_url.as_deref(), Some("https://cdn.kopi.id/aren.jpg"));
        assert!(product.is_featured);
        assert!(product.in_stock());
        assert!(product.description.is_empty());
    }

    #[test]
    fn test_product_out_of_stock() {
        let json = r#"{"id": "p1", "name": "Tubruk", "price": 12000, "stock": 0}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(!product.in_stock());
    }

    #[test]
    fn test_order_defaults() {
        let json = r#"{"id": "o1", "total": "56000"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, PaymentMethod::BankTransfer);
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_token_response_aliases() {
        let a: TokenResponse = serde_json::from_str(r#"{"token": "t1"}"#).unwrap();
        let b: TokenResponse = serde_json::from_str(r#"{"accessToken": "t2"}"#).unwrap();
        assert_eq!(a.token, "t1");
        assert_eq!(b.token, "t2");
    }

    #[test]
    fn test_chat_message_role() {
        let json = r#"{
            "_id": "m1",
            "conversation_id": "c1",
            "sender_id": "u1",
            "sender_role": "admin",
            "text": "Pesanan sedang diproses",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let message: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.sender_role, ChatRole::Admin);
        assert!(message.created_at.is_some());
    }
}
