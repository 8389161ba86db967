//! Session-related types.
//!
//! Types stored in the session for authentication, cart and chat state.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use brewhouse_core::Cart;

use super::claims::{ClaimsError, TokenClaims, decode_claims};

/// A logged-in user or admin: the raw bearer token and its decoded claims.
///
/// `Debug` redacts the token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    token: String,
    pub claims: TokenClaims,
}

impl Identity {
    /// Build an identity from a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token payload cannot be decoded.
    pub fn from_token(token: String) -> Result<Self, ClaimsError> {
        let claims = decode_claims(&token)?;
        Ok(Self { token, claims })
    }

    /// The bearer token for backend calls.
    #[must_use]
    pub fn bearer(&self) -> SecretString {
        SecretString::from(self.token.as_str())
    }

    /// Account id from the claims, if the token carries one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.claims.id.as_deref()
    }

    /// Best available name for greeting the visitor.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.claims
            .name
            .clone()
            .or_else(|| self.claims.email.clone())
            .unwrap_or_else(|| "there".to_string())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// The logged-in customer.
    pub const USER: &str = "user_identity";

    /// The logged-in admin.
    pub const ADMIN: &str = "admin_identity";

    /// The visitor's cart as a JSON blob.
    pub const CART: &str = "cart";

    /// The single pending notification.
    pub const NOTIFICATION: &str = "notification";

    /// Stable key identifying this session's chat relay.
    pub const SOCKET_KEY: &str = "socket_key";
}

// =============================================================================
// Cart Helpers
// =============================================================================

/// Load the cart from the session. A missing or unreadable cart is empty.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Cart>(keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Discarding unreadable cart: {e}");
            Cart::new()
        }
    }
}

/// Persist the cart in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

/// Remove the cart from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_cart(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Cart>(keys::CART).await?;
    Ok(())
}

/// The chat relay key for this session, created on first use.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn socket_key(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(key) = session.get::<String>(keys::SOCKET_KEY).await? {
        return Ok(key);
    }
    let key = uuid::Uuid::new_v4().to_string();
    session.insert(keys::SOCKET_KEY, &key).await?;
    Ok(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use secrecy::ExposeSecret;
    use serde_json::json;
    use tower_sessions::MemoryStore;

    use brewhouse_core::{Price, ProductId, ProductSnapshot, Quantity};

    use super::*;
    use crate::models::claims::unsigned_token;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[test]
    fn test_identity_from_token() {
        let token = unsigned_token(&json!({ "id": "u1", "name": "Sari" }));
        let identity = Identity::from_token(token.clone()).unwrap();

        assert_eq!(identity.id(), Some("u1"));
        assert_eq!(identity.display_name(), "Sari");
        assert_eq!(identity.bearer().expose_secret(), token);
    }

    #[test]
    fn test_identity_debug_redacts_token() {
        let token = unsigned_token(&json!({ "id": "u1" }));
        let identity = Identity::from_token(token.clone()).unwrap();
        let debug_output = format!("{identity:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(&token));
    }

    #[test]
    fn test_identity_rejects_garbage() {
        assert!(Identity::from_token("not-a-jwt".to_string()).is_err());
    }

    #[tokio::test]
    async fn test_cart_roundtrip_through_session() {
        let session = session();
        assert!(load_cart(&session).await.is_empty());

        let mut cart = Cart::new();
        cart.add(
            ProductSnapshot {
                id: ProductId::new("p1"),
                name: "Kopi Tubruk".to_string(),
                price: Price::from_rupiah(12_000),
                image_url: None,
            },
            Quantity::ONE,
        );
        save_cart(&session, &cart).await.unwrap();
        assert_eq!(load_cart(&session).await, cart);

        clear_cart(&session).await.unwrap();
        assert!(load_cart(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_socket_key_is_stable() {
        let session = session();
        let first = socket_key(&session).await.unwrap();
        let second = socket_key(&session).await.unwrap();
        assert_eq!(first, second);
    }
}
