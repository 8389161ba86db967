//! Integration tests for the session cart.

use brewhouse_integration_tests::{TestApp, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_adding_same_product_twice_increments_quantity() {
    let app = TestApp::spawn().await;

    app.add_to_cart("p1", 1).await;
    app.add_to_cart("p1", 2).await;
    assert_eq!(app.cart_count().await, 3);

    let body = app.get("/cart").await.text().await.unwrap();
    assert_eq!(body.matches("href=\"/products/p1\"").count(), 1);
    assert!(body.contains("Rp 75.000"));
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 2).await;
    app.add_to_cart("p2", 1).await;

    let response = app
        .post_form("/cart/update", &[("product_id", "p1"), ("quantity", "0")])
        .await;
    assert_eq!(location(&response), "/cart");
    assert_eq!(app.cart_count().await, 1);

    let body = app.get("/cart").await.text().await.unwrap();
    assert!(!body.contains("Es Kopi Susu"));
    assert!(body.contains("Rp 20.000"));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;
    app.add_to_cart("p2", 1).await;

    app.post_form("/cart/remove", &[("product_id", "p2")]).await;
    assert_eq!(app.cart_count().await, 1);

    app.post_form("/cart/clear", &[]).await;
    assert_eq!(app.cart_count().await, 0);
    assert!(app.get("/cart").await.text().await.unwrap().contains("Your cart is empty"));
}

#[tokio::test]
async fn test_sold_out_and_invalid_quantities_are_refused() {
    let app = TestApp::spawn().await;

    app.add_to_cart("p3", 1).await;
    assert_eq!(app.cart_count().await, 0);
    assert!(app.get("/cart").await.text().await.unwrap().contains("sold out"));

    let response = app
        .post_form("/cart/add", &[("product_id", "p1"), ("quantity", "0")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.cart_count().await, 0);
}

#[tokio::test]
async fn test_redirect_to_is_same_site_only() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/cart/add",
            &[("product_id", "p1"), ("redirect_to", "/products/p1")],
        )
        .await;
    assert_eq!(location(&response), "/products/p1");

    let response = app
        .post_form(
            "/cart/add",
            &[("product_id", "p1"), ("redirect_to", "https://evil.example")],
        )
        .await;
    assert_eq!(location(&response), "/cart");
}

#[tokio::test]
async fn test_carts_are_per_session() {
    let first = TestApp::spawn().await;
    first.add_to_cart("p1", 2).await;

    let other_browser = reqwest::Client::new();
    let body: serde_json::Value = other_browser
        .get(first.url("/cart/count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 0);
    assert_eq!(first.cart_count().await, 2);
}
