//! Contact page.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::page::PageContext;

/// Contact page template.
///
/// Shop name, address, phone and map embed come from configuration via
/// `page.shop`.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
}

/// Display the contact page.
pub async fn show(page: PageContext) -> impl IntoResponse {
    ContactTemplate { page }
}
