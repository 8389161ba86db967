//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::backend::{ContentBlock, Product};
use crate::filters;
use crate::models::Notification;
use crate::page::PageContext;
use crate::routes::news::NewsView;
use crate::state::AppState;

/// Products shown in the featured strip.
const FEATURED_LIMIT: usize = 6;

/// Articles shown under "Latest news".
const NEWS_LIMIT: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub hero: Option<ContentBlock>,
    pub blocks: Vec<ContentBlock>,
    pub featured: Vec<Product>,
    pub news: Vec<NewsView>,
}

/// Featured products, or the first few when none are flagged.
fn pick_featured(products: Vec<Product>) -> Vec<Product> {
    let flagged: Vec<Product> = products.iter().filter(|p| p.is_featured).cloned().collect();
    let pool = if flagged.is_empty() { products } else { flagged };
    pool.into_iter().take(FEATURED_LIMIT).collect()
}

/// Display the home page.
///
/// Content, products and news load concurrently; any that fail render as
/// empty sections with a single error notification.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let backend = state.backend();
    let (blocks, products, news) =
        tokio::join!(backend.list_contents(), backend.list_products(), backend.list_news());

    let mut failure = None;

    let mut blocks = blocks.unwrap_or_else(|e| {
        tracing::warn!("Failed to load content blocks: {e}");
        failure.get_or_insert(e.user_message());
        Vec::new()
    });
    let products = products.unwrap_or_else(|e| {
        tracing::warn!("Failed to load products: {e}");
        failure.get_or_insert(e.user_message());
        Vec::new()
    });
    let news = news.unwrap_or_else(|e| {
        tracing::warn!("Failed to load news: {e}");
        failure.get_or_insert(e.user_message());
        Vec::new()
    });

    let hero = blocks
        .iter()
        .position(|b| b.key == "hero")
        .map(|i| blocks.remove(i));

    let page = match failure {
        Some(message) => page.with_notification(Notification::error(message)),
        None => page,
    };

    HomeTemplate {
        page,
        hero,
        blocks,
        featured: pick_featured(products),
        news: news.into_iter().take(NEWS_LIMIT).map(NewsView::from).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_flagged_products_win() {
        let products: Vec<Product> = serde_json::from_value(json!([
            { "id": "1", "name": "A", "price": 1 },
            { "id": "2", "name": "B", "price": 1, "is_featured": true }
        ]))
        .unwrap();
        let featured = pick_featured(products);
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id.as_str(), "2");
    }

    #[test]
    fn test_without_flags_first_few_are_used() {
        let products: Vec<Product> = (0..10)
            .map(|i| serde_json::from_value(json!({ "id": i.to_string(), "name": "X", "price": 1 })).unwrap())
            .collect();
        assert_eq!(pick_featured(products).len(), FEATURED_LIMIT);
    }
}
