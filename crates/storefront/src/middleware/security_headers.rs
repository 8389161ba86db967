//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. The CSP is built once
//! at startup: images may come from the backend host and the contact page may
//! frame the configured map embed; everything else stays same-origin.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::config::StorefrontConfig;

/// Precomputed header values shared by every response.
#[derive(Clone, Debug)]
pub struct SecurityPolicy {
    csp: HeaderValue,
}

impl SecurityPolicy {
    /// Build the policy for the configured backend and map hosts.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        let backend_origin = origin(&config.backend.api_url);
        let map_origin = config
            .shop
            .map_embed_url
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok())
            .map(|url| origin(&url));

        let csp = content_security_policy(&backend_origin, map_origin.as_deref());
        Self {
            csp: HeaderValue::from_str(&csp)
                .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'")),
        }
    }

    /// The Content-Security-Policy value.
    #[must_use]
    pub const fn csp(&self) -> &HeaderValue {
        &self.csp
    }
}

fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Assemble the CSP.
///
/// ```text
/// default-src 'none';
/// script-src 'self';
/// style-src 'self';
/// font-src 'self';
/// img-src 'self' data: <backend>;
/// connect-src 'self';
/// frame-src <map or 'none'>;
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
fn content_security_policy(backend_origin: &str, map_origin: Option<&str>) -> String {
    let frame_src = map_origin.unwrap_or("'none'");
    format!(
        "default-src 'none'; \
         script-src 'self'; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' data: {backend_origin}; \
         connect-src 'self'; \
         frame-src {frame_src}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin` - Map embeds need the origin
/// - `Content-Security-Policy` - See [`SecurityPolicy`]
/// - `Permissions-Policy` - Deny sensitive features
/// - `Cross-Origin-Opener-Policy: same-origin` - Process isolation
/// - `X-DNS-Prefetch-Control: off` - Prevent DNS prefetch leakage
pub async fn security_headers_middleware(
    State(policy): State<SecurityPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(CONTENT_SECURITY_POLICY, policy.csp.clone());

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             microphone=(), \
             payment=(), \
             usb=()",
        ),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_allows_map_and_backend_images() {
        let csp = content_security_policy(
            "https://api.kopi.id",
            Some("https://www.google.com"),
        );
        assert!(csp.contains("img-src 'self' data: https://api.kopi.id;"));
        assert!(csp.contains("frame-src https://www.google.com;"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_csp_without_map_blocks_frames() {
        let csp = content_security_policy("http://localhost:5000", None);
        assert!(csp.contains("frame-src 'none';"));
    }
}
