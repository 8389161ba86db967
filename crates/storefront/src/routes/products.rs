//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use brewhouse_core::{ProductId, Quantity};

use crate::backend::{BackendError, Product};
use crate::filters;
use crate::models::Notification;
use crate::page::PageContext;
use crate::routes::{not_found, redirect_with};
use crate::state::AppState;

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

impl ProductQuery {
    fn category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn search(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// Keep products matching the category (case-insensitive) and the search
/// term (in name or description).
#[must_use]
pub fn filter_products(products: Vec<Product>, query: &ProductQuery) -> Vec<Product> {
    let category = query.category();
    let search = query.search();

    products
        .into_iter()
        .filter(|product| {
            category.is_none_or(|wanted| {
                product
                    .category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
            })
        })
        .filter(|product| {
            search.as_deref().is_none_or(|term| {
                product.name.to_lowercase().contains(term)
                    || product.description.to_lowercase().contains(term)
            })
        })
        .collect()
}

/// Distinct categories in first-seen order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in products.iter().filter_map(|p| p.category.as_deref()) {
        if !seen.iter().any(|c| c.eq_ignore_ascii_case(category)) {
            seen.push(category.to_string());
        }
    }
    seen
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
    pub categories: Vec<String>,
    pub selected_category: String,
    pub search: String,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: Product,
    pub max_quantity: u32,
}

/// Display product listing page.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
    page: PageContext,
) -> impl IntoResponse {
    let (products, page) = match state.backend().list_products().await {
        Ok(products) => (products, page),
        Err(e) => {
            tracing::warn!("Failed to load products: {e}");
            (
                Vec::new(),
                page.with_notification(Notification::error(e.user_message())),
            )
        }
    };

    ProductsIndexTemplate {
        page,
        categories: categories(&products),
        selected_category: query.category().unwrap_or_default().to_string(),
        search: query.q.clone().unwrap_or_default(),
        products: filter_products(products, &query),
    }
}

/// Display product detail page.
///
/// An unknown product is a 404. Any other backend failure goes back to the
/// product list with an error notification.
#[instrument(skip(state, session), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Response {
    match state.backend().get_product(&id).await {
        Ok(product) => ProductShowTemplate {
            page: PageContext::load(&state, &session).await,
            max_quantity: product.stock.map_or(Quantity::MAX, |s| s.min(Quantity::MAX)),
            product,
        }
        .into_response(),
        Err(BackendError::NotFound(_)) => {
            not_found(PageContext::load(&state, &session).await, "product")
        }
        Err(e) => {
            tracing::warn!("Failed to load product: {e}");
            redirect_with(&session, Notification::error(e.user_message()), "/products").await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn catalog() -> Vec<Product> {
        serde_json::from_value(json!([
            { "id": "1", "name": "Aren Latte", "price": 28000, "category": "Coffee",
              "description": "Espresso, susu, gula aren" },
            { "id": "2", "name": "Matcha Latte", "price": 30000, "category": "Non-Coffee" },
            { "id": "3", "name": "Kopi Tubruk", "price": 15000, "category": "coffee",
              "description": "Traditional ground coffee" },
            { "id": "4", "name": "Croissant", "price": 22000 }
        ]))
        .unwrap()
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_no_filter_keeps_everything() {
        let filtered = filter_products(catalog(), &ProductQuery::default());
        assert_eq!(filtered.len(), 4);
    }

    #[test]
    fn test_category_filter_ignores_case() {
        let query = ProductQuery {
            category: Some("COFFEE".to_string()),
            q: None,
        };
        assert_eq!(ids(&filter_products(catalog(), &query)), ["1", "3"]);
    }

    #[test]
    fn test_search_matches_name_and_description() {
        let query = ProductQuery {
            category: None,
            q: Some(" aren ".to_string()),
        };
        assert_eq!(ids(&filter_products(catalog(), &query)), ["1"]);

        let query = ProductQuery {
            category: None,
            q: Some("traditional".to_string()),
        };
        assert_eq!(ids(&filter_products(catalog(), &query)), ["3"]);
    }

    #[test]
    fn test_categories_deduplicate() {
        assert_eq!(categories(&catalog()), ["Coffee", "Non-Coffee"]);
    }
}
