use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use fonda_catalog::{Category, OptionSet, Product};
use fonda_core::{attempt_mutation, MutationError, SessionContext};
use fonda_order::{Customer, DebtSummary, Order, OrderFilter, OrderStatus, PaymentStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, feed, middleware::admin_auth_middleware, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: Category,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub options: Option<OptionSet>,
}

fn default_available() -> bool {
    true
}

impl ProductInput {
    fn apply_to(self, product: &mut Product) {
        product.name = self.name.trim().to_string();
        product.description = self.description.filter(|d| !d.trim().is_empty());
        product.price_cents = self.price_cents;
        product.category = self.category;
        product.is_available = self.is_available;
        product.stock = self.stock;
        product.options = self.options;
        product.updated_at = Utc::now();
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/orders", get(list_orders))
        .route("/v1/admin/orders/{id}", axum::routing::delete(delete_order))
        .route("/v1/admin/orders/{id}/verify-payment", post(verify_payment))
        .route("/v1/admin/orders/{id}/deliver", post(mark_delivered))
        .route("/v1/admin/products", get(list_products).post(create_product))
        .route("/v1/admin/products/{id}", axum::routing::put(update_product).delete(delete_product))
        .route("/v1/admin/products/{id}/availability", post(set_availability))
        .route("/v1/admin/customers/{phone}/block", post(block_customer))
        .route("/v1/admin/customers/{phone}/unblock", post(unblock_customer))
        .route("/v1/admin/debts", get(debt_report))
        .route("/v1/admin/feed", get(feed::stream_changes))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Order Triage
// ============================================================================

/// GET /v1/admin/orders
async fn list_orders(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    session.require_admin()?;
    let filter = OrderFilter {
        phone: query.phone,
        status: query.status,
        payment_statuses: query.payment_status.into_iter().collect(),
    };

    let mut orders: Vec<Order> = state
        .board
        .snapshot()
        .await
        .into_iter()
        .filter(|o| filter.matches(o))
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(orders))
}

/// POST /v1/admin/orders/{id}/verify-payment
async fn verify_payment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.order_manager().verify_payment(&session, id).await?;
    state.board.upsert(&order).await;
    Ok(Json(order))
}

/// POST /v1/admin/orders/{id}/deliver
///
/// The board shows the order as delivered right away and goes back to the
/// previous copy if the write fails.
async fn mark_delivered(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let key = id.to_string();
    let board = &state.board;
    let previous = board.get(&key).await;
    let manager = state.order_manager();

    let order = attempt_mutation(
        board.patch(&key, |o| {
            o.mark_delivered();
        }),
        manager.mark_delivered(&session, id),
        async move {
            if let Some(previous) = previous {
                board.restore(previous).await;
            }
        },
    )
    .await
    .map_err(MutationError::into_inner)?;

    board.upsert(&order).await;
    Ok(Json(order))
}

/// DELETE /v1/admin/orders/{id}
async fn delete_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.order_manager().delete_order(&session, id).await?;
    state.board.remove(&id.to_string()).await;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Menu Management
// ============================================================================

/// GET /v1/admin/products: every product, offered or not.
async fn list_products(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Product>>, AppError> {
    session.require_admin()?;
    let products = state.products.list_products().await.map_err(AppError::backend)?;
    Ok(Json(products))
}

/// POST /v1/admin/products
async fn create_product(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let admin = session.require_admin()?;
    let mut product = Product::new(input.name.clone(), input.price_cents, input.category);
    input.apply_to(&mut product);
    product.validate()?;

    state.products.create_product(&product).await.map_err(AppError::backend)?;
    state.catalog.upsert(&product).await;

    tracing::info!("Product {} created by {}", product.id, admin.email);
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /v1/admin/products/{id}
async fn update_product(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    session.require_admin()?;
    let mut product = state
        .products
        .get_product(id)
        .await
        .map_err(AppError::backend)?
        .ok_or_else(|| AppError::NotFoundError(format!("Product not found: {}", id)))?;
    input.apply_to(&mut product);
    product.validate()?;

    if !state.products.update_product(&product).await.map_err(AppError::backend)? {
        return Err(AppError::NotFoundError(format!("Product not found: {}", id)));
    }
    state.catalog.upsert(&product).await;
    Ok(Json(product))
}

/// DELETE /v1/admin/products/{id}
async fn delete_product(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session.require_admin()?;
    if !state.products.delete_product(id).await.map_err(AppError::backend)? {
        return Err(AppError::NotFoundError(format!("Product not found: {}", id)));
    }
    state.catalog.remove(&id.to_string()).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/admin/products/{id}/availability
///
/// The storefront catalog flips first; a failed write puts the previous copy
/// back.
async fn set_availability(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<Product>, AppError> {
    session.require_admin()?;
    let key = id.to_string();
    let catalog = &state.catalog;
    let products = &state.products;
    let previous = catalog.get(&key).await;

    attempt_mutation(
        catalog.patch(&key, |p| p.set_availability(req.is_available)),
        async {
            match products.set_availability(id, req.is_available).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(AppError::NotFoundError(format!("Product not found: {}", id))),
                Err(e) => Err(AppError::backend(e)),
            }
        },
        async move {
            if let Some(previous) = previous {
                catalog.restore(previous).await;
            }
        },
    )
    .await
    .map_err(MutationError::into_inner)?;

    let product = products
        .get_product(id)
        .await
        .map_err(AppError::backend)?
        .ok_or_else(|| AppError::NotFoundError(format!("Product not found: {}", id)))?;
    catalog.upsert(&product).await;
    Ok(Json(product))
}

// ============================================================================
// Customers and Debt
// ============================================================================

/// POST /v1/admin/customers/{phone}/block
async fn block_customer(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(phone): Path<String>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(state.order_manager().set_blacklisted(&session, &phone, true).await?))
}

/// POST /v1/admin/customers/{phone}/unblock
async fn unblock_customer(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(phone): Path<String>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(state.order_manager().set_blacklisted(&session, &phone, false).await?))
}

/// GET /v1/admin/debts
async fn debt_report(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<DebtSummary>>, AppError> {
    Ok(Json(state.order_manager().debt_report(&session).await?))
}
