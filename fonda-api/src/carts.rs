use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use chrono::Utc;
use fonda_catalog::pricing::format_amount;
use fonda_catalog::SelectionRequest;
use fonda_order::{AuditMetadata, Cart, CartLine, CheckoutRequest, Order};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::warn;
use uuid::Uuid;

use crate::{client_ip, error::AppError, state::AppState, storefront::cached_product};

const MAX_CART_ID_LENGTH: usize = 64;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub selection: Option<SelectionRequest>,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart_id: String,
    pub lines: Vec<CartLine>,
    pub item_count: u32,
    pub total_price: i64,
    pub total_display: String,
}

impl CartView {
    fn new(cart_id: &str, cart: &Cart) -> Self {
        let totals = cart.compute_totals();
        Self {
            cart_id: cart_id.to_string(),
            lines: cart.lines().cloned().collect(),
            item_count: totals.item_count,
            total_price: totals.total_price,
            total_display: format_amount(totals.total_price),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/carts/{cart_id}", get(get_cart))
        .route("/v1/carts/{cart_id}/items", post(add_item))
        .route("/v1/carts/{cart_id}/items/{key}", delete(remove_item))
        .route("/v1/carts/{cart_id}/checkout", post(checkout))
}

fn check_cart_id(cart_id: &str) -> Result<(), AppError> {
    let valid = !cart_id.is_empty()
        && cart_id.len() <= MAX_CART_ID_LENGTH
        && cart_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::ValidationError("Invalid cart id".to_string()));
    }
    Ok(())
}

async fn load_cart(state: &AppState, cart_id: &str) -> Result<Cart, AppError> {
    check_cart_id(cart_id)?;
    state
        .carts
        .load(cart_id)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Cart load failed: {}", e)))
}

async fn save_cart(state: &AppState, cart_id: &str, cart: &Cart) -> Result<(), AppError> {
    state
        .carts
        .save(cart_id, cart)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Cart save failed: {}", e)))
}

/// GET /v1/carts/{cart_id}
async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> Result<Json<CartView>, AppError> {
    let cart = load_cart(&state, &cart_id).await?;
    Ok(Json(CartView::new(&cart_id, &cart)))
}

/// POST /v1/carts/{cart_id}/items
async fn add_item(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>, AppError> {
    check_cart_id(&cart_id)?;
    let _guard = state.cart_locks.lock(&cart_id).await;
    let mut cart = load_cart(&state, &cart_id).await?;
    let product = cached_product(&state, req.product_id).await?;

    cart.add_selection(&product, req.selection.as_ref())?;
    save_cart(&state, &cart_id, &cart).await?;

    Ok(Json(CartView::new(&cart_id, &cart)))
}

/// DELETE /v1/carts/{cart_id}/items/{key}
async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, key)): Path<(String, String)>,
) -> Result<Json<CartView>, AppError> {
    check_cart_id(&cart_id)?;
    let _guard = state.cart_locks.lock(&cart_id).await;
    let mut cart = load_cart(&state, &cart_id).await?;
    if cart.line(&key).is_some() {
        cart.remove_from_cart(&key);
        save_cart(&state, &cart_id, &cart).await?;
    }
    Ok(Json(CartView::new(&cart_id, &cart)))
}

/// POST /v1/carts/{cart_id}/checkout
async fn checkout(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    check_cart_id(&cart_id)?;
    // an add landing between submit and clear would be lost with the cart
    let _guard = state.cart_locks.lock(&cart_id).await;
    let cart = load_cart(&state, &cart_id).await?;

    let audit = AuditMetadata {
        submitted_at: Utc::now(),
        ip_address: client_ip(&headers, connect_info.map(|Extension(ConnectInfo(addr))| addr)),
        user_agent: user_agent.map(|TypedHeader(ua)| ua.as_str().to_string()),
    };

    let order = state.checkout_service().submit(&cart, &req, Some(audit)).await?;

    if let Err(e) = state.carts.clear(&cart_id).await {
        warn!("Order {} placed but cart {} was not cleared: {}", order.id, cart_id, e);
    }
    state.board.upsert(&order).await;

    Ok((StatusCode::CREATED, Json(order)))
}
