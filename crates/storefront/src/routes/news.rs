//! News route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendError, NewsArticle};
use crate::filters;
use crate::models::Notification;
use crate::page::PageContext;
use crate::routes::{format_timestamp, not_found, redirect_with};
use crate::state::AppState;

/// News display data for templates.
#[derive(Clone)]
pub struct NewsView {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub image_url: Option<String>,
    pub published: String,
}

impl From<NewsArticle> for NewsView {
    fn from(article: NewsArticle) -> Self {
        let summary = if article.summary.is_empty() {
            excerpt(&article.body, 160)
        } else {
            article.summary
        };
        Self {
            id: article.id.into_inner(),
            title: article.title,
            summary,
            body: article.body,
            image_url: article.image_url,
            published: format_timestamp(article.published_at),
        }
    }
}

/// First `max_chars` characters of `text`, cut at a word boundary.
fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let cut = cut.rsplit_once(' ').map_or(cut.as_str(), |(head, _)| head);
    format!("{}…", cut.trim_end())
}

/// News listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "news/index.html")]
pub struct NewsIndexTemplate {
    pub page: PageContext,
    pub articles: Vec<NewsView>,
}

/// News article page template.
#[derive(Template, WebTemplate)]
#[template(path = "news/show.html")]
pub struct NewsShowTemplate {
    pub page: PageContext,
    pub article: NewsView,
}

/// Display the news listing.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    match state.backend().list_news().await {
        Ok(articles) => NewsIndexTemplate {
            page,
            articles: articles.into_iter().map(NewsView::from).collect(),
        },
        Err(e) => {
            tracing::warn!("Failed to load news: {e}");
            NewsIndexTemplate {
                page: page.with_notification(Notification::error(e.user_message())),
                articles: Vec::new(),
            }
        }
    }
}

/// Display a single article.
///
/// A missing article is a 404. Any other backend failure goes back to the
/// news list with an error notification.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    match state.backend().get_news(&id).await {
        Ok(article) => NewsShowTemplate {
            page: PageContext::load(&state, &session).await,
            article: article.into(),
        }
        .into_response(),
        Err(BackendError::NotFound(_)) => {
            not_found(PageContext::load(&state, &session).await, "article")
        }
        Err(e) => {
            tracing::warn!("Failed to load article: {e}");
            redirect_with(&session, Notification::error(e.user_message()), "/news").await
        }
    }
}
