//! Integration tests for public pages and health checks.

use brewhouse_integration_tests::{TestApp, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::spawn().await;

    let health = app.get("/health").await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "ok");

    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_home_shows_hero_featured_and_news() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("content-security-policy"));
    assert!(response.headers().contains_key("x-request-id"));

    let body = response.text().await.unwrap();
    assert!(body.contains("Kopi dari Bandung"));
    assert!(body.contains("Es Kopi Susu"));
    assert!(body.contains("New single origin"));
}

#[tokio::test]
async fn test_product_listing_filters() {
    let app = TestApp::spawn().await;

    let body = app.get("/products?category=snacks").await.text().await.unwrap();
    assert!(body.contains("Pisang Goreng"));
    assert!(!body.contains("Americano"));

    let body = app.get("/products?q=americano").await.text().await.unwrap();
    assert!(body.contains("Americano"));
    assert!(!body.contains("Es Kopi Susu"));
}

#[tokio::test]
async fn test_unknown_product_is_404() {
    let app = TestApp::spawn().await;

    let found = app.get("/products/p1").await;
    assert_eq!(found.status(), StatusCode::OK);
    assert!(found.text().await.unwrap().contains("Rp 25.000"));

    assert_eq!(app.get("/products/nope").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/news/nope").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/no/such/page").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_home_renders_when_backend_fails() {
    let app = TestApp::spawn().await;
    app.backend.fail_path("/api/contents").await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("notice--error"));
    assert!(body.contains("The shop is not responding right now."));
    assert!(body.contains("Es Kopi Susu"));
}

#[tokio::test]
async fn test_product_listing_renders_when_backend_fails() {
    let app = TestApp::spawn().await;
    app.backend.fail_path("/api/products").await;

    let response = app.get("/products").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("notice--error"));
    assert!(!body.contains("Americano"));
}

#[tokio::test]
async fn test_failed_detail_pages_return_to_listing() {
    let app = TestApp::spawn().await;
    app.backend.fail_path("/api/products/p1").await;
    app.backend.fail_path("/api/news/n1").await;

    let response = app.get("/products/p1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/products");

    let listing = app.get("/products").await;
    assert_eq!(listing.status(), StatusCode::OK);
    let body = listing.text().await.unwrap();
    assert!(body.contains("notice--error"));
    assert!(body.contains("Americano"));

    assert_eq!(location(&app.get("/news/n1").await), "/news");
    assert!(app.get("/news").await.text().await.unwrap().contains("notice--error"));
}

#[tokio::test]
async fn test_contact_embeds_map() {
    let app = TestApp::spawn().await;

    let response = app.get("/contact").await;
    let csp = response
        .headers()
        .get("content-security-policy")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(csp.contains("frame-src https://maps.example.com"));

    let body = response.text().await.unwrap();
    assert!(body.contains("https://maps.example.com/embed?q=braga"));
    assert!(body.contains("Jl. Braga 1, Bandung"));
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let app = TestApp::spawn().await;

    let response = app.get("/static/js/notification.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("data-notification"));
}
