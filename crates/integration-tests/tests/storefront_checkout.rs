//! Integration tests for checkout with an uploaded payment proof.

use brewhouse_integration_tests::{TestApp, location};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn order_form(with_proof: bool) -> Form {
    let form = Form::new()
        .text("recipient_name", "Sari")
        .text("phone", "08123456789")
        .text("address", "Jl. Dago 12, Bandung")
        .text("notes", "Less sugar please")
        .text("payment_method", "bank_transfer");
    if with_proof {
        form.part(
            "payment_proof",
            Part::bytes(PNG_HEADER.to_vec())
                .file_name("transfer.png")
                .mime_str("image/png")
                .unwrap(),
        )
    } else {
        form
    }
}

#[tokio::test]
async fn test_checkout_with_empty_cart_goes_back_to_cart() {
    let app = TestApp::spawn().await;
    app.login().await;

    assert_eq!(location(&app.get("/checkout").await), "/cart");
}

#[tokio::test]
async fn test_checkout_page_shows_payment_details() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.add_to_cart("p1", 2).await;

    let response = app.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("1234567890"));
    assert!(body.contains("Brewhouse Coffee"));
    assert!(body.contains("Rp 50.000"));
    assert!(body.contains(&format!("http://{}/uploads/qris.png", app.backend.addr)));
}

#[tokio::test]
async fn test_place_order() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.add_to_cart("p1", 2).await;
    app.add_to_cart("p2", 1).await;

    let response = app
        .client
        .post(app.url("/checkout"))
        .multipart(order_form(true))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/profile");

    let order = app
        .backend
        .recorded(|r| r.orders.first().cloned())
        .await
        .unwrap();
    assert_eq!(order["recipient_name"], "Sari");
    assert_eq!(order["notes"], "Less sugar please");
    assert_eq!(order["payment_method"], "bank_transfer");
    assert_eq!(order["proof_bytes"], PNG_HEADER.len());
    assert_eq!(order["proof_content_type"], "image/png");

    let items: Value = serde_json::from_str(order["items"].as_str().unwrap()).unwrap();
    assert_eq!(items[0]["product_id"], "p1");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[1]["product_id"], "p2");
    assert_eq!(items[1]["quantity"], 1);

    assert_eq!(app.cart_count().await, 0);

    let profile = app.get("/profile").await.text().await.unwrap();
    assert!(profile.contains("Order placed!"));
    assert!(profile.contains("o1"));
    assert!(profile.contains("Awaiting verification"));
}

#[tokio::test]
async fn test_missing_proof_keeps_cart_and_form() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.add_to_cart("p1", 1).await;

    let response = app
        .client
        .post(app.url("/checkout"))
        .multipart(order_form(false))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Upload your payment proof."));
    assert!(body.contains("Jl. Dago 12, Bandung"));

    assert!(app.backend.recorded(|r| r.orders.is_empty()).await);
    assert_eq!(app.cart_count().await, 1);
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = TestApp::spawn().await;
    app.add_to_cart("p1", 1).await;

    let response = app
        .client
        .post(app.url("/checkout"))
        .multipart(order_form(true))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/auth/login");
    assert!(app.backend.recorded(|r| r.orders.is_empty()).await);
}
