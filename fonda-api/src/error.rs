use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fonda_catalog::{PricingError, ProductError};
use fonda_core::CoreError;
use fonda_order::{CartError, CheckoutError, OrderError};
use serde_json::json;

const RETRY_MESSAGE: &str = "Something went wrong, please try again";

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UnprocessableError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UnprocessableError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::InternalServerError(msg) => internal(msg),
            AppError::Anyhow(err) => classify(&err),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

impl AppError {
    /// Repository errors are boxed trait objects and do not go through `?`.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

fn internal(detail: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal Server Error: {}", detail);
    (StatusCode::INTERNAL_SERVER_ERROR, RETRY_MESSAGE.to_string())
}

/// Status and client-facing message for domain errors carried through `?`.
fn classify(err: &anyhow::Error) -> (StatusCode, String) {
    if let Some(e) = err.downcast_ref::<CheckoutError>() {
        return checkout_status(e);
    }
    if let Some(e) = err.downcast_ref::<OrderError>() {
        return order_status(e);
    }
    if let Some(e) = err.downcast_ref::<CoreError>() {
        return core_status(e);
    }
    if let Some(e) = err.downcast_ref::<CartError>() {
        return match e {
            CartError::NotOffered(_) => (StatusCode::CONFLICT, e.to_string()),
            CartError::ConfigurationRequired(_) | CartError::Pricing(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
        };
    }
    if let Some(e) = err.downcast_ref::<PricingError>() {
        return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }
    if let Some(e) = err.downcast_ref::<ProductError>() {
        return match e {
            ProductError::UnknownCategory(_) | ProductError::Invalid(_) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
        };
    }
    internal(err)
}

fn core_status(e: &CoreError) -> (StatusCode, String) {
    match e {
        CoreError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        CoreError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        CoreError::IdentityError(_) => {
            tracing::warn!("{}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Identity lookup unavailable".to_string())
        }
    }
}

fn order_status(e: &OrderError) -> (StatusCode, String) {
    match e {
        OrderError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        OrderError::InvalidTransition { .. } => (StatusCode::CONFLICT, e.to_string()),
        OrderError::EmptyOrder | OrderError::TotalMismatch { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        OrderError::NoOutstandingDebt(_) => (StatusCode::CONFLICT, e.to_string()),
        OrderError::Core(core) => core_status(core),
        OrderError::Corrupt(_) | OrderError::Backend(_) => internal(e),
    }
}

fn checkout_status(e: &CheckoutError) -> (StatusCode, String) {
    match e {
        CheckoutError::Validation(core) => core_status(core),
        CheckoutError::EmptyCart => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        // never reveal the blacklist itself
        CheckoutError::Blacklisted => (
            StatusCode::FORBIDDEN,
            "We could not take your order. Please contact the restaurant.".to_string(),
        ),
        CheckoutError::Order(order) => order_status(order),
        CheckoutError::Persistence(_) | CheckoutError::Backend(_) => internal(e),
    }
}
