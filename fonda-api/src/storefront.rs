use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use fonda_catalog::{build_menu, Category, MenuSection, Product, SelectionFlow};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub category: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/menu", get(get_menu))
        .route("/v1/products/{id}/selection", get(get_selection_flow))
}

/// Catalog entry the storefront can act on, from the local cache.
pub(crate) async fn cached_product(state: &AppState, id: Uuid) -> Result<Product, AppError> {
    state
        .catalog
        .get(&id.to_string())
        .await
        .ok_or_else(|| AppError::NotFoundError(format!("Product not found: {}", id)))
}

/// GET /v1/menu?category=
async fn get_menu(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Vec<MenuSection>>, AppError> {
    let filter = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(raw) => Some(raw.parse::<Category>()?),
        None => None,
    };
    let products = state.catalog.snapshot().await;
    Ok(Json(build_menu(&products, filter)))
}

/// GET /v1/products/{id}/selection
async fn get_selection_flow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SelectionFlow>, AppError> {
    let product = cached_product(&state, id).await?;
    Ok(Json(product.selection_flow()))
}
