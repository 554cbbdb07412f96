use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminSession {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Who is calling. Handed explicitly to the operations that need it instead of
/// being read from ambient request state.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    admin: Option<AdminSession>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { admin: None }
    }

    pub fn admin(session: AdminSession) -> Self {
        Self {
            admin: Some(session),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.admin
            .as_ref()
            .map(|s| s.expires_at > Utc::now())
            .unwrap_or(false)
    }

    pub fn require_admin(&self) -> CoreResult<&AdminSession> {
        match &self.admin {
            Some(session) if session.expires_at > Utc::now() => Ok(session),
            Some(_) => Err(CoreError::Unauthorized("admin session expired".to_string())),
            None => Err(CoreError::Unauthorized("admin session required".to_string())),
        }
    }
}
