//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//! 5. Security headers (CSP, frame and referrer policy)
//! 6. Rate limiting (governor, auth and translate routes only)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, CurrentIdentities, RequireAdmin, RequireParticipant, RequireUser,
    clear_identity, load_identity, set_identity,
};
pub use rate_limit::{auth_rate_limiter, translate_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::{SecurityPolicy, security_headers_middleware};
pub use session::create_session_layer;
