use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use fonda_core::identity::IdentityRecord;
use fonda_core::validation::validate_dni;
use fonda_core::CoreError;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/identity/{dni}", get(lookup))
}

/// GET /v1/identity/{dni}: legal name to prefill the checkout form.
async fn lookup(
    State(state): State<AppState>,
    Path(dni): Path<String>,
) -> Result<Json<IdentityRecord>, AppError> {
    validate_dni(&dni)?;
    let record = state
        .identity
        .lookup(&dni)
        .await
        .map_err(|e| CoreError::IdentityError(e.to_string()))?;

    record
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("No identity found for that DNI".to_string()))
}
