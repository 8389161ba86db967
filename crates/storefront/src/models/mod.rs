//! Session-held state for the storefront.
//!
//! Everything the visitor's browser would otherwise keep in local storage
//! lives here, keyed by the session cookie: the cart, the user and admin
//! identities, the pending notification and the chat socket key.

pub mod claims;
pub mod notification;
pub mod session;

pub use claims::{ClaimsError, TokenClaims, decode_claims};
pub use notification::{Notification, NotificationKind};
pub use session::{Identity, keys as session_keys};
