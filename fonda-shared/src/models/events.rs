use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record collections that publish change notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Orders,
    Products,
    Customers,
}

impl ChangeTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTable::Orders => "orders",
            ChangeTable::Products => "products",
            ChangeTable::Customers => "customers",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEventType {
    Insert,
    Update,
    Delete,
}

/// A single push notification from the data store.
///
/// `new` carries the full row after an insert or update, `old` the row (or at
/// least its id) before an update or delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub event_type: ChangeEventType,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
    #[serde(default = "Utc::now")]
    pub emitted_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn insert(table: ChangeTable, new: Value) -> Self {
        Self {
            table,
            event_type: ChangeEventType::Insert,
            new: Some(new),
            old: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn update(table: ChangeTable, old: Option<Value>, new: Value) -> Self {
        Self {
            table,
            event_type: ChangeEventType::Update,
            new: Some(new),
            old,
            emitted_at: Utc::now(),
        }
    }

    pub fn delete(table: ChangeTable, old: Value) -> Self {
        Self {
            table,
            event_type: ChangeEventType::Delete,
            new: None,
            old: Some(old),
            emitted_at: Utc::now(),
        }
    }
}
