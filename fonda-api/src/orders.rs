use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use fonda_order::{CustomerHistory, DebtPayment, Order};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PayDebtRequest {
    pub operation_code: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/customers/{phone}/orders", get(get_history))
        .route("/v1/customers/{phone}/pay-debt", post(pay_debt))
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.order_manager().get_order(id).await?))
}

/// GET /v1/customers/{phone}/orders
async fn get_history(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<CustomerHistory>, AppError> {
    Ok(Json(state.order_manager().customer_history(&phone).await?))
}

/// POST /v1/customers/{phone}/pay-debt
async fn pay_debt(
    State(state): State<AppState>,
    Path(phone): Path<String>,
    Json(req): Json<PayDebtRequest>,
) -> Result<Json<DebtPayment>, AppError> {
    Ok(Json(
        state
            .order_manager()
            .pay_debt(&phone, &req.operation_code)
            .await?,
    ))
}
