//! Integration tests for the batch translation endpoint.

use brewhouse_integration_tests::{Options, TestApp, UNTRANSLATABLE};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn translate(app: &TestApp, target: &str, texts: &[&str]) -> reqwest::Response {
    app.client
        .post(app.url("/api/translate"))
        .json(&json!({ "target": target, "texts": texts }))
        .send()
        .await
        .unwrap()
}

async fn translated(app: &TestApp, target: &str, texts: &[&str]) -> Vec<String> {
    let response = translate(app, target, texts).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    serde_json::from_value(body["texts"].clone()).unwrap()
}

#[tokio::test]
async fn test_unconfigured_translator_is_unavailable() {
    let app = TestApp::spawn().await;

    let response = translate(&app, "en", &["Halo"]).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_translation_preserves_order_and_whitespace() {
    let app = TestApp::spawn_with(Options { translator: true }).await;

    let texts = translated(&app, "en", &["Menu", "   ", " Kopi susu ", "Kontak"]).await;
    assert_eq!(texts, ["MENU", "   ", " KOPI SUSU ", "KONTAK"]);
}

#[tokio::test]
async fn test_translations_are_cached() {
    let app = TestApp::spawn_with(Options { translator: true }).await;

    translated(&app, "ja", &["Menu", "Kontak"]).await;
    let calls = app.backend.recorded(|r| r.translation_calls).await;
    assert_eq!(calls, 1);

    let texts = translated(&app, "ja", &["Kontak", "Menu"]).await;
    assert_eq!(texts, ["KONTAK", "MENU"]);
    assert_eq!(app.backend.recorded(|r| r.translation_calls).await, calls);

    translated(&app, "ko", &["Menu"]).await;
    assert_eq!(app.backend.recorded(|r| r.translation_calls).await, calls + 1);
}

#[tokio::test]
async fn test_unusable_reply_falls_back_to_originals() {
    let app = TestApp::spawn_with(Options { translator: true }).await;

    let texts = translated(&app, "en", &["Menu", UNTRANSLATABLE]).await;
    assert_eq!(texts, ["Menu", UNTRANSLATABLE]);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let app = TestApp::spawn_with(Options { translator: true }).await;

    let response = translate(&app, "en_US", &["Menu"]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let too_many = vec!["Menu"; 201];
    let response = translate(&app, "en", &too_many).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.backend.recorded(|r| r.translation_calls).await, 0);
}

#[tokio::test]
async fn test_translator_script_restores_page_on_failure() {
    let app = TestApp::spawn().await;

    let response = app.get("/static/js/translator.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    let script = response.text().await.unwrap();
    assert!(script.contains("if (!response.ok)"));
    assert!(script.contains("restore();\n    showError(message);"));
    assert!(script.contains("notice notice--error"));
}
