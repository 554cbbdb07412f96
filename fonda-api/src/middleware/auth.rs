use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::{TimeZone, Utc};
use fonda_core::{AdminSession, SessionContext};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl AdminClaims {
    pub fn session(&self) -> Option<AdminSession> {
        let expires_at = Utc.timestamp_opt(self.exp as i64, 0).single()?;
        Some(AdminSession {
            email: self.sub.clone(),
            expires_at,
        })
    }
}

/// Turns a valid admin bearer token into a `SessionContext` request extension.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    if token_data.claims.role != ADMIN_ROLE {
        return Err(StatusCode::FORBIDDEN);
    }

    // the account may have been removed from config since the token was issued
    if !state.auth.admins.iter().any(|a| a.email == token_data.claims.sub) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let session = token_data.claims.session().ok_or(StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(SessionContext::admin(session));

    Ok(next.run(req).await)
}
