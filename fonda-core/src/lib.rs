pub mod identity;
pub mod mutation;
pub mod session;
pub mod validation;

pub use mutation::{attempt_mutation, MutationError};
pub use session::{AdminSession, SessionContext};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Identity lookup failed: {0}")]
    IdentityError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
