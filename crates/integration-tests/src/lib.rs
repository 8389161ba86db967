//! Integration tests for the Brewhouse storefront.
//!
//! Each test starts a [`FakeBackend`] (REST API, chat socket and a
//! translation provider on one ephemeral port) and a storefront wired to it,
//! then drives the storefront over HTTP and WebSocket like a browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p brewhouse-integration-tests
//! ```
//!
//! No external services are needed.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Multipart, Path, Request, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::cookie::{CookieStore, Jar};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use url::Url;

use brewhouse_storefront::config::{BackendConfig, ShopConfig, StorefrontConfig, TranslatorConfig};
use brewhouse_storefront::state::AppState;

/// Password the fake backend accepts for every account.
pub const PASSWORD: &str = "rahasia123";

/// Customer the fake backend logs in.
pub const USER_ID: &str = "u-100";

/// Admin the fake backend logs in.
pub const ADMIN_ID: &str = "a-1";

/// Text the fake provider refuses to translate properly.
pub const UNTRANSLATABLE: &str = "BROKEN";

// =============================================================================
// Tokens
// =============================================================================

/// Build an unsigned JWT carrying `claims`.
#[must_use]
pub fn token_for(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.fake-signature")
}

fn user_token() -> String {
    token_for(&json!({
        "id": USER_ID,
        "name": "Sari",
        "email": "sari@kopi.id",
        "role": "user",
        "iat": 1_714_557_600,
        "exp": 1_714_644_000
    }))
}

fn admin_token() -> String {
    token_for(&json!({ "id": ADMIN_ID, "name": "Barista", "role": "admin" }))
}

// =============================================================================
// Fake Backend
// =============================================================================

/// What the fake backend saw.
#[derive(Default)]
pub struct Recorded {
    /// Orders placed through `POST /api/orders`, as text fields plus proof size.
    pub orders: Vec<Value>,
    /// Join frames received on the chat socket.
    pub joins: Vec<Value>,
    /// Status changes made by admins.
    pub status_changes: Vec<(String, String)>,
    /// Batches sent to the translation provider.
    pub translation_calls: usize,
}

#[derive(Default)]
struct FakeState {
    recorded: Mutex<Recorded>,
    revoked: AtomicBool,
    failing: Mutex<Vec<String>>,
}

/// Fake shop backend plus translation provider on one port.
#[derive(Clone)]
pub struct FakeBackend {
    pub addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeBackend {
    /// Start the fake backend on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/api/products", get(products))
            .route("/api/products/{id}", get(product))
            .route("/api/contents", get(contents))
            .route("/api/news", get(news))
            .route("/api/news/{id}", get(news_article))
            .route("/api/payment-info", get(payment_info))
            .route("/api/users/register", post(register))
            .route("/api/users/login", post(user_login))
            .route("/api/users/profile", get(profile))
            .route("/api/orders/mine", get(my_orders))
            .route("/api/orders", post(create_order))
            .route("/api/admin/login", post(admin_login))
            .route("/api/admin/orders", get(admin_orders))
            .route("/api/admin/orders/{id}/status", patch(update_status))
            .route("/api/chat/conversations/user/{id}", get(user_conversation))
            .route("/api/chat/conversations/{id}", get(conversation))
            .route("/api/admin/chat/conversations", get(admin_conversations))
            .route("/socket", get(socket))
            .route("/v1beta/models/{call}", post(generate_content))
            .layer(from_fn_with_state(state.clone(), fail_switch))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Make every bearer token fail from now on.
    pub fn revoke_tokens(&self) {
        self.state.revoked.store(true, Ordering::SeqCst);
    }

    /// Make every request to `path` (e.g. `/api/products`) answer 500.
    pub async fn fail_path(&self, path: &str) {
        self.state.failing.lock().await.push(path.to_string());
    }

    /// Inspect what the backend has seen so far.
    pub async fn recorded<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        f(&*self.state.recorded.lock().await)
    }

    fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{path}", self.addr)).unwrap()
    }

    fn socket_url(&self) -> Url {
        Url::parse(&format!("ws://{}/socket", self.addr)).unwrap()
    }
}

fn authorized(state: &FakeState, headers: &HeaderMap) -> bool {
    !state.revoked.load(Ordering::SeqCst)
        && headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len())
}

async fn fail_switch(
    State(state): State<Arc<FakeState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if state.failing.lock().await.iter().any(|failing| failing == path) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Server sedang bermasalah" })),
        )
            .into_response();
    }
    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Token tidak valid" })),
    )
        .into_response()
}

fn catalog() -> Value {
    json!([
        {
            "_id": "p1",
            "name": "Es Kopi Susu",
            "description": "Espresso, fresh milk and palm sugar.",
            "price": 25000,
            "category": "Coffee",
            "stock": 10,
            "featured": true
        },
        {
            "_id": "p2",
            "name": "Americano",
            "description": "Double shot over hot water.",
            "price": "20000",
            "category": "Coffee",
            "stock": 10
        },
        {
            "_id": "p3",
            "name": "Pisang Goreng",
            "price": 15000,
            "category": "Snacks",
            "stock": 0
        }
    ])
}

async fn products() -> Json<Value> {
    Json(json!({ "data": catalog() }))
}

async fn product(Path(id): Path<String>) -> Response {
    let found = catalog()
        .as_array()
        .and_then(|items| items.iter().find(|p| p["_id"] == id.as_str()).cloned());
    match found {
        Some(product) => Json(product).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Produk tidak ditemukan" })),
        )
            .into_response(),
    }
}

async fn contents() -> Json<Value> {
    Json(json!([
        { "key": "hero", "title": "Kopi dari Bandung", "body": "Roasted every Monday." },
        { "key": "about", "title": "About us", "body": "A small shop with a big roaster." }
    ]))
}

async fn news() -> Json<Value> {
    Json(json!([{
        "_id": "n1",
        "title": "New single origin",
        "content": "Gayo beans have arrived.",
        "createdAt": "2024-05-01T10:00:00Z"
    }]))
}

async fn news_article(Path(id): Path<String>) -> Response {
    if id == "n1" {
        Json(json!({
            "_id": "n1",
            "title": "New single origin",
            "content": "Gayo beans have arrived."
        }))
        .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn payment_info() -> Json<Value> {
    Json(json!({
        "bank_name": "BCA",
        "account_number": "1234567890",
        "account_holder": "Brewhouse Coffee",
        "qris_image": "/uploads/qris.png"
    }))
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@kopi.id" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email sudah terdaftar" })),
        )
            .into_response();
    }
    StatusCode::CREATED.into_response()
}

async fn user_login(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({ "token": user_token() })).into_response()
    } else {
        unauthorized()
    }
}

async fn admin_login(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({ "data": { "accessToken": admin_token() } })).into_response()
    } else {
        unauthorized()
    }
}

async fn profile(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({
        "_id": USER_ID,
        "name": "Sari",
        "email": "sari@kopi.id",
        "phone": "08123456789"
    }))
    .into_response()
}

fn order_json(id: &str, fields: &Value) -> Value {
    json!({
        "_id": id,
        "items": [{ "product_id": "p1", "name": "Es Kopi Susu", "quantity": 2, "price": 25000 }],
        "total": 50000,
        "status": "pending",
        "payment_method": fields["payment_method"].as_str().unwrap_or("bank_transfer"),
        "payment_proof_url": "/uploads/proof.png",
        "recipient_name": fields["recipient_name"].as_str().unwrap_or_default(),
        "phone": fields["phone"].as_str().unwrap_or_default(),
        "address": fields["address"].as_str().unwrap_or_default(),
        "createdAt": "2024-05-01T10:00:00Z"
    })
}

async fn my_orders(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let recorded = state.recorded.lock().await;
    let orders: Vec<Value> = recorded
        .orders
        .iter()
        .enumerate()
        .map(|(i, fields)| order_json(&format!("o{}", i + 1), fields))
        .collect();
    Json(orders).into_response()
}

async fn admin_orders(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    my_orders(State(state), headers).await
}

async fn create_order(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let mut fields = serde_json::Map::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "payment_proof" {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap();
            fields.insert("proof_bytes".to_string(), json!(bytes.len()));
            fields.insert("proof_content_type".to_string(), json!(content_type));
        } else {
            fields.insert(name, json!(field.text().await.unwrap()));
        }
    }

    let fields = Value::Object(fields);
    let mut recorded = state.recorded.lock().await;
    recorded.orders.push(fields.clone());
    let id = format!("o{}", recorded.orders.len());
    (StatusCode::CREATED, Json(order_json(&id, &fields))).into_response()
}

async fn update_status(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let status = body["status"].as_str().unwrap_or_default().to_string();
    state
        .recorded
        .lock()
        .await
        .status_changes
        .push((id.clone(), status.clone()));
    let mut order = order_json(&id, &json!({}));
    order["status"] = json!(status);
    Json(order).into_response()
}

async fn user_conversation(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({
        "_id": "c1",
        "user_id": user_id,
        "messages": [{
            "_id": "m1",
            "conversation_id": "c1",
            "sender_id": ADMIN_ID,
            "sender_role": "admin",
            "text": "Halo, ada yang bisa dibantu?",
            "createdAt": "2024-05-01T10:00:00Z"
        }]
    }))
    .into_response()
}

async fn conversation(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if id != "c1" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Percakapan tidak ditemukan" })),
        )
            .into_response();
    }
    user_conversation(State(state), headers, Path(USER_ID.to_string())).await
}

async fn admin_conversations(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({ "data": [
        {
            "_id": "c1",
            "user_id": USER_ID,
            "user_name": "Sari",
            "last_message": "Masih buka?",
            "updatedAt": "2024-05-01T09:00:00Z",
            "unread": 2
        },
        {
            "_id": "c2",
            "user_id": "u-200",
            "last_message": "Terima kasih!",
            "updatedAt": "2024-05-02T09:00:00Z"
        }
    ]}))
    .into_response()
}

async fn socket(State(state): State<Arc<FakeState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| chat_session(socket, state))
}

/// Echo every message back as `receive_message`, the way the real backend
/// broadcasts to the conversation room.
async fn chat_session(mut socket: WebSocket, state: Arc<FakeState>) {
    let mut next_id = 0_u32;
    while let Some(Ok(frame)) = socket.recv().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(event) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };

        let reply = match event["event"].as_str() {
            Some("join") => {
                state.recorded.lock().await.joins.push(event["data"].clone());
                json!({
                    "event": "presence",
                    "data": { "userId": ADMIN_ID, "role": "admin", "online": true }
                })
            }
            Some("send_message") => {
                next_id += 1;
                let data = &event["data"];
                json!({
                    "event": "receive_message",
                    "data": {
                        "_id": format!("m-live-{next_id}"),
                        "conversation_id": data["conversation_id"].as_str().unwrap_or("c1"),
                        "sender_id": data["sender_id"],
                        "sender_role": data["sender_role"],
                        "text": data["text"]
                    }
                })
            }
            _ => continue,
        };

        if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }
}

/// Gemini-style provider that upper-cases every string, except that a batch
/// containing [`UNTRANSLATABLE`] gets an unusable reply.
async fn generate_content(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.recorded.lock().await.translation_calls += 1;

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    let payload = prompt.rsplit_once("\n\n").map_or("[]", |(_, json)| json);
    let texts: Vec<String> = serde_json::from_str(payload).unwrap_or_default();

    let reply = if texts.iter().any(|t| t == UNTRANSLATABLE) {
        "Sorry, I cannot help with that.".to_string()
    } else {
        let upper: Vec<String> = texts.iter().map(|t| t.to_uppercase()).collect();
        format!("```json\n{}\n```", serde_json::to_string(&upper).unwrap())
    };

    Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": reply }] } }]
    }))
}

// =============================================================================
// Storefront
// =============================================================================

/// Storefront options for a test.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Point the translator at the fake provider.
    pub translator: bool,
}

/// A running storefront plus the fake backend behind it.
pub struct TestApp {
    pub url: String,
    pub backend: FakeBackend,
    /// Browser-like client: keeps cookies, does not follow redirects.
    pub client: reqwest::Client,
    jar: Arc<Jar>,
}

impl TestApp {
    /// Start a storefront without a translator.
    pub async fn spawn() -> Self {
        Self::spawn_with(Options::default()).await
    }

    /// Start a storefront with the given options.
    pub async fn spawn_with(options: Options) -> Self {
        let backend = FakeBackend::start().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        let config = StorefrontConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: url.clone(),
            backend: BackendConfig {
                api_url: backend.url("/api"),
                socket_url: backend.socket_url(),
                timeout: Duration::from_secs(5),
            },
            translator: options.translator.then(|| TranslatorConfig {
                api_url: backend.url("/v1beta"),
                api_key: SecretString::from("AIzaTestKey-9fQ2xLm7Rv"),
                model: "gemini-test".to_string(),
            }),
            shop: ShopConfig {
                name: "Brewhouse Test".to_string(),
                address: Some("Jl. Braga 1, Bandung".to_string()),
                phone: None,
                map_embed_url: Some("https://maps.example.com/embed?q=braga".to_string()),
            },
            sentry_dsn: None,
            sentry_environment: None,
            log_json: false,
        };

        let state = AppState::new(config).unwrap();
        let app = brewhouse_storefront::app(state);
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            url,
            backend,
            client,
            jar,
        }
    }

    /// Absolute storefront URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    /// `Cookie` header value for the storefront, if the session has started.
    #[must_use]
    pub fn cookie_header(&self) -> Option<reqwest::header::HeaderValue> {
        self.jar.cookies(&Url::parse(&self.url).unwrap())
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Log in as the fake backend's customer.
    pub async fn login(&self) {
        let response = self
            .post_form(
                "/auth/login",
                &[("email", "sari@kopi.id"), ("password", PASSWORD)],
            )
            .await;
        assert_eq!(location(&response), "/");
    }

    /// Log in as the fake backend's admin.
    pub async fn admin_login(&self) {
        let response = self
            .post_form(
                "/admin/login",
                &[("email", "barista@kopi.id"), ("password", PASSWORD)],
            )
            .await;
        assert_eq!(location(&response), "/admin");
    }

    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) {
        let quantity = quantity.to_string();
        let response = self
            .post_form(
                "/cart/add",
                &[("product_id", product_id), ("quantity", &quantity)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    /// The cart badge count.
    pub async fn cart_count(&self) -> u64 {
        let body: Value = self.get("/cart/count").await.json().await.unwrap();
        body["count"].as_u64().unwrap()
    }
}

/// `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    assert!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
