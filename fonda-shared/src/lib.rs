pub mod models;
pub mod pii;

pub use models::events::{ChangeEvent, ChangeEventType, ChangeTable};
pub use pii::Masked;
