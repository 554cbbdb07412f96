#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use fonda_api::cache::RecordCache;
use fonda_api::state::{AppState, AuthConfig, CartLocks};
use fonda_core::identity::StaticIdentityLookup;
use fonda_store::app_config::{AdminAccount, BusinessRules};
use fonda_store::{ChangeFeed, InMemoryStore, MemoryCartStore};

pub const ADMIN_EMAIL: &str = "caja@fonda.pe";
pub const ADMIN_PASSWORD: &str = "caja-2026";
pub const KNOWN_DNI: &str = "45678912";

/// State over in-memory stores with one admin account. Redis is absent, so
/// rate limiting is off.
pub fn build_test_state() -> (AppState, Arc<InMemoryStore>) {
    let feed = ChangeFeed::default();
    let store = Arc::new(InMemoryStore::new(feed.clone()));
    let password_hash = fonda_api::auth::hash_password(ADMIN_PASSWORD).unwrap();

    let state = AppState {
        products: store.clone(),
        orders: store.clone(),
        customers: store.clone(),
        carts: Arc::new(MemoryCartStore::new(Duration::from_secs(3600))),
        identity: Arc::new(StaticIdentityLookup::new().with_record(KNOWN_DNI, "ROSA QUISPE HUAMAN")),
        redis: None,
        feed,
        catalog: RecordCache::default(),
        board: RecordCache::default(),
        auth: AuthConfig {
            secret: "test-secret".to_string(),
            expiration: 3600,
            admins: vec![AdminAccount {
                email: ADMIN_EMAIL.to_string(),
                password_hash,
            }],
        },
        business_rules: BusinessRules {
            cart_ttl_seconds: 3600,
            phone_prefix: '9',
            rate_limit_per_minute: 120,
        },
        cart_locks: CartLocks::default(),
    };
    (state, store)
}

pub fn build_test_app() -> (Router, AppState, Arc<InMemoryStore>) {
    let (state, store) = build_test_state();
    (fonda_api::app(state.clone()), state, store)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn admin_token(app: &Router) -> String {
    let response = post_json(
        app,
        "/v1/auth/login",
        json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

/// Set lunch at 15.00 with one 5.00 add-on.
pub fn menu_product() -> Value {
    json!({
        "name": "Menú del día",
        "price_cents": 1500,
        "category": "menu",
        "options": {
            "entrees": ["Papa a la huancaína", "Causa limeña"],
            "beverages": ["Chicha morada"],
            "addons": [{ "name": "Huevo frito", "price_cents": 500 }]
        }
    })
}

pub fn drink_product() -> Value {
    json!({ "name": "Inca Kola", "price_cents": 400, "category": "extra", "stock": 10 })
}

/// Creates a product through the admin API and returns its id.
pub async fn create_product(app: &Router, token: &str, product: Value) -> String {
    let response = send(app, Method::POST, "/v1/admin/products", Some(token), Some(product)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

pub fn checkout_form(phone: &str, payment_method: &str, operation_code: Option<&str>) -> Value {
    json!({
        "customer_name": "Rosa Quispe",
        "phone": phone,
        "location": "Oficina 302",
        "payment_method": payment_method,
        "operation_code": operation_code,
    })
}

/// Two configured set lunches in `cart_id`, then checkout. Returns the order.
pub async fn place_order(
    app: &Router,
    menu_id: &str,
    cart_id: &str,
    phone: &str,
    payment_method: &str,
    operation_code: Option<&str>,
) -> Value {
    let selection = json!({
        "product_id": menu_id,
        "selection": { "entree": "Causa limeña", "beverage": "Chicha morada", "addons": ["Huevo frito"] }
    });
    for _ in 0..2 {
        let response = post_json(app, &format!("/v1/carts/{}/items", cart_id), selection.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = post_json(
        app,
        &format!("/v1/carts/{}/checkout", cart_id),
        checkout_form(phone, payment_method, operation_code),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}
