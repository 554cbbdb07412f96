//! Admin flows: sign-in, order triage, menu management, blacklist and the
//! change feed.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::*;
use fonda_catalog::{Category, Product};
use fonda_order::{CustomerRepository, OrderRepository, ProductRepository};
use serde_json::json;

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (app, _, _) = build_test_app();

    let response = post_json(
        &app,
        "/v1/auth/login",
        json!({ "email": ADMIN_EMAIL, "password": "nope" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/v1/auth/login",
        json!({ "email": "CAJA@fonda.pe", "password": ADMIN_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_a_valid_token() {
    let (app, _, _) = build_test_app();

    let response = get(&app, "/v1/admin/orders").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, Method::GET, "/v1/admin/orders", Some("garbage"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, Method::POST, "/v1/admin/products", None, Some(drink_product())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_board_filters_and_verifies_payment() {
    let (app, _, _) = build_test_app();
    let token = admin_token(&app).await;
    let menu_id = create_product(&app, &token, menu_product()).await;

    let verifying = place_order(&app, &menu_id, "c1", "987654321", "instant", Some("417")).await;
    place_order(&app, &menu_id, "c2", "912345678", "monthly", None).await;

    let all = body_json(send(&app, Method::GET, "/v1/admin/orders", Some(&token), None).await).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let uri = "/v1/admin/orders?payment_status=verifying";
    let filtered = body_json(send(&app, Method::GET, uri, Some(&token), None).await).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["id"], verifying["id"]);

    let id = verifying["id"].as_str().unwrap();
    let uri = format!("/v1/admin/orders/{}/verify-payment", id);
    let paid = body_json(send(&app, Method::POST, &uri, Some(&token), None).await).await;
    assert_eq!(paid["payment_status"], "paid");

    // paid is terminal
    let response = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let uri = "/v1/admin/orders?payment_status=paid";
    let filtered = body_json(send(&app, Method::GET, uri, Some(&token), None).await).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delivering_twice_writes_once() {
    let (app, state, store) = build_test_app();
    let token = admin_token(&app).await;
    let menu_id = create_product(&app, &token, menu_product()).await;
    let order = place_order(&app, &menu_id, "c1", "987654321", "instant", Some("417")).await;
    let id = order["id"].as_str().unwrap();
    let uri = format!("/v1/admin/orders/{}/deliver", id);

    let first = body_json(send(&app, Method::POST, &uri, Some(&token), None).await).await;
    assert_eq!(first["status"], "delivered");

    let second = body_json(send(&app, Method::POST, &uri, Some(&token), None).await).await;
    assert_eq!(second["status"], "delivered");
    assert_eq!(second["updated_at"], first["updated_at"]);

    let stored = store.get_order(id.parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.status.as_str(), "delivered");
    let cached = state.board.get(id).await.unwrap();
    assert_eq!(cached.status.as_str(), "delivered");
}

#[tokio::test]
async fn delivering_a_missing_order_leaves_the_board_alone() {
    let (app, _, _) = build_test_app();
    let token = admin_token(&app).await;
    let uri = format!("/v1/admin/orders/{}/deliver", uuid::Uuid::new_v4());

    let response = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_an_order_removes_it_from_the_board() {
    let (app, state, _) = build_test_app();
    let token = admin_token(&app).await;
    let menu_id = create_product(&app, &token, menu_product()).await;
    let order = place_order(&app, &menu_id, "c1", "987654321", "monthly", None).await;
    let id = order["id"].as_str().unwrap();
    let uri = format!("/v1/admin/orders/{}", id);

    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.board.get(id).await.is_none());

    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blacklisted_phone_cannot_order() {
    let (app, _, store) = build_test_app();
    let token = admin_token(&app).await;
    let drink_id = create_product(&app, &token, drink_product()).await;

    let uri = "/v1/admin/customers/987654321/block";
    let customer = body_json(send(&app, Method::POST, uri, Some(&token), None).await).await;
    assert_eq!(customer["is_blacklisted"], true);

    post_json(&app, "/v1/carts/c1/items", json!({ "product_id": drink_id })).await;
    let response = post_json(
        &app,
        "/v1/carts/c1/checkout",
        checkout_form("987654321", "instant", Some("417")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().contains("blacklist"));
    assert!(store.list_orders(&Default::default()).await.unwrap().is_empty());

    // the profile upsert on a later checkout must not lift the block
    let uri = "/v1/admin/customers/987654321/unblock";
    send(&app, Method::POST, uri, Some(&token), None).await;
    let response = post_json(
        &app,
        "/v1/carts/c1/checkout",
        checkout_form("987654321", "instant", Some("417")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let customer = store.get_customer("987654321").await.unwrap().unwrap();
    assert!(!customer.is_blacklisted);
    assert_eq!(customer.name, "Rosa Quispe");
}

#[tokio::test]
async fn debt_report_lists_outstanding_balances() {
    let (app, _, _) = build_test_app();
    let token = admin_token(&app).await;
    let menu_id = create_product(&app, &token, menu_product()).await;

    place_order(&app, &menu_id, "c1", "987654321", "monthly", None).await;
    place_order(&app, &menu_id, "c2", "987654321", "monthly", None).await;
    place_order(&app, &menu_id, "c3", "912345678", "instant", None).await;
    place_order(&app, &menu_id, "c4", "911111111", "instant", Some("417")).await;

    let report = body_json(send(&app, Method::GET, "/v1/admin/debts", Some(&token), None).await).await;
    let rows = report.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["phone"], "987654321");
    assert_eq!(rows[0]["total"], 8000);
    assert_eq!(rows[0]["outstanding_orders"], 2);
    assert_eq!(rows[1]["phone"], "912345678");
}

#[tokio::test]
async fn product_crud_reaches_the_storefront() {
    let (app, _, _) = build_test_app();
    let token = admin_token(&app).await;
    let id = create_product(&app, &token, drink_product()).await;

    let mut edited = drink_product();
    edited["price_cents"] = json!(450);
    let uri = format!("/v1/admin/products/{}", id);
    let product = body_json(send(&app, Method::PUT, &uri, Some(&token), Some(edited)).await).await;
    assert_eq!(product["price_cents"], 450);

    let menu = body_json(get(&app, "/v1/menu").await).await;
    assert_eq!(menu[0]["products"][0]["price_cents"], 450);

    let mut invalid = drink_product();
    invalid["price_cents"] = json!(-1);
    let response = send(&app, Method::PUT, &uri, Some(&token), Some(invalid)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let menu = body_json(get(&app, "/v1/menu").await).await;
    assert!(menu.as_array().unwrap().is_empty());

    let response = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn availability_toggle_hides_product() {
    let (app, _, store) = build_test_app();
    let token = admin_token(&app).await;
    let id = create_product(&app, &token, drink_product()).await;

    let uri = format!("/v1/admin/products/{}/availability", id);
    let product = body_json(
        send(&app, Method::POST, &uri, Some(&token), Some(json!({ "is_available": false }))).await,
    )
    .await;
    assert_eq!(product["is_available"], false);

    let menu = body_json(get(&app, "/v1/menu").await).await;
    assert!(menu.as_array().unwrap().is_empty());
    let response = post_json(&app, "/v1/carts/c1/items", json!({ "product_id": id })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // still listed for the admin
    let all = body_json(send(&app, Method::GET, "/v1/admin/products", Some(&token), None).await).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let stored = store.get_product(id.parse().unwrap()).await.unwrap().unwrap();
    assert!(!stored.is_available);
}

#[tokio::test]
async fn availability_toggle_on_missing_product_is_not_found() {
    let (app, _, _) = build_test_app();
    let token = admin_token(&app).await;
    let uri = format!("/v1/admin/products/{}/availability", uuid::Uuid::new_v4());

    let response = send(&app, Method::POST, &uri, Some(&token), Some(json!({ "is_available": true }))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feed_is_an_event_stream() {
    let (app, _, _) = build_test_app();
    let token = admin_token(&app).await;

    let response = send(&app, Method::GET, "/v1/admin/feed", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}

#[tokio::test]
async fn cache_sync_picks_up_writes_made_elsewhere() {
    let (state, store) = build_test_state();
    fonda_api::worker::spawn_cache_sync(state.clone());

    // let the worker subscribe and finish its first load
    tokio::time::sleep(Duration::from_millis(50)).await;

    let product = Product::new("Arroz con leche", 500, Category::Extra);
    store.create_product(&product).await.unwrap();

    let id = product.id.to_string();
    let mut cached = None;
    for _ in 0..50 {
        cached = state.catalog.get(&id).await;
        if cached.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cached.unwrap().name, "Arroz con leche");
}
