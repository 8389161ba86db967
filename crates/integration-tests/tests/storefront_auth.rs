//! Integration tests for login, logout, registration and route gates.

use brewhouse_integration_tests::{PASSWORD, TestApp, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_gated_routes_redirect_anonymous_visitors() {
    let app = TestApp::spawn().await;

    assert_eq!(location(&app.get("/checkout").await), "/auth/login");
    assert_eq!(location(&app.get("/profile").await), "/auth/login");
    assert_eq!(location(&app.get("/chat").await), "/auth/login");
    assert_eq!(location(&app.get("/admin").await), "/admin/login");
    assert_eq!(location(&app.get("/admin/chat").await), "/admin/login");
}

#[tokio::test]
async fn test_gated_json_routes_answer_401() {
    let app = TestApp::spawn().await;

    let response = app.get("/chat/conversation").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_shows_welcome_once() {
    let app = TestApp::spawn().await;
    app.login().await;

    let first = app.get("/").await.text().await.unwrap();
    assert!(first.contains("Welcome back, Sari!"));

    let second = app.get("/").await.text().await.unwrap();
    assert!(!second.contains("Welcome back"));
    assert!(second.contains("href=\"/profile\""));
}

#[tokio::test]
async fn test_wrong_password_stays_on_login() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", "sari@kopi.id"), ("password", "salah")],
        )
        .await;
    assert_eq!(location(&response), "/auth/login");

    let body = app.get("/auth/login").await.text().await.unwrap();
    assert!(body.contains("Invalid email or password."));
    assert_eq!(location(&app.get("/profile").await), "/auth/login");
}

#[tokio::test]
async fn test_logout_clears_cart_and_token() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.add_to_cart("p1", 2).await;
    assert_eq!(app.get("/profile").await.status(), StatusCode::OK);

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(location(&response), "/");

    assert_eq!(app.cart_count().await, 0);
    assert_eq!(location(&app.get("/profile").await), "/auth/login");
}

#[tokio::test]
async fn test_profile_shows_claims_and_orders() {
    let app = TestApp::spawn().await;
    app.login().await;

    let body = app.get("/profile").await.text().await.unwrap();
    assert!(body.contains("u-100"));
    assert!(body.contains("sari@kopi.id"));
    assert!(body.contains("02 May 2024, 10:00"));
    assert!(body.contains("No orders yet"));
}

#[tokio::test]
async fn test_profile_renders_when_backend_fails() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.backend.fail_path("/api/users/profile").await;
    app.backend.fail_path("/api/orders/mine").await;

    let response = app.get("/profile").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("notice--error"));
    assert!(body.contains("sari@kopi.id"));
    assert!(body.contains("No orders yet"));
}

#[tokio::test]
async fn test_signed_in_user_keeps_notice_through_login_page() {
    let app = TestApp::spawn().await;
    app.login().await;

    assert_eq!(location(&app.get("/auth/login").await), "/profile");

    let body = app.get("/profile").await.text().await.unwrap();
    assert!(body.contains("Welcome back, Sari!"));
}

#[tokio::test]
async fn test_rejected_token_ends_the_session() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.backend.revoke_tokens();

    assert_eq!(location(&app.get("/profile").await), "/auth/login");

    let body = app.get("/auth/login").await.text().await.unwrap();
    assert!(body.contains("Your session has expired"));
    assert_eq!(location(&app.get("/profile").await), "/auth/login");
}

#[tokio::test]
async fn test_registration() {
    let app = TestApp::spawn().await;

    let ok = app
        .post_form(
            "/auth/register",
            &[
                ("name", "Budi"),
                ("email", "budi@kopi.id"),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await;
    assert_eq!(location(&ok), "/auth/login");
    let body = app.get("/auth/login").await.text().await.unwrap();
    assert!(body.contains("Account created"));

    let taken = app
        .post_form(
            "/auth/register",
            &[
                ("name", "Budi"),
                ("email", "taken@kopi.id"),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await;
    assert_eq!(location(&taken), "/auth/register");
    let body = app.get("/auth/register").await.text().await.unwrap();
    assert!(body.contains("Email sudah terdaftar"));

    let mismatch = app
        .post_form(
            "/auth/register",
            &[
                ("name", "Budi"),
                ("email", "budi@kopi.id"),
                ("password", PASSWORD),
                ("password_confirm", "something-else"),
            ],
        )
        .await;
    assert_eq!(location(&mismatch), "/auth/register");
}

#[tokio::test]
async fn test_user_and_admin_identities_are_independent() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.admin_login().await;

    assert_eq!(app.get("/admin").await.status(), StatusCode::OK);
    assert_eq!(app.get("/profile").await.status(), StatusCode::OK);

    app.post_form("/admin/logout", &[]).await;
    assert_eq!(location(&app.get("/admin").await), "/admin/login");
    assert_eq!(app.get("/profile").await.status(), StatusCode::OK);
}
