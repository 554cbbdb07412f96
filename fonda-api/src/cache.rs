use fonda_order::{apply_change_event, Record};
use fonda_shared::ChangeEvent;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Local copy of a table, merged from change events and from our own writes.
///
/// Both sources go through the same reducer, so a write acknowledged here
/// and the push notification for it can arrive in either order.
pub struct RecordCache<R> {
    records: Arc<RwLock<Vec<R>>>,
}

impl<R> Clone for RecordCache<R> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<R> Default for RecordCache<R> {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<R: Record + Send + Sync> RecordCache<R> {
    pub async fn snapshot(&self) -> Vec<R> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<R> {
        self.records.read().await.iter().find(|r| r.record_id() == id).cloned()
    }

    /// Full refetch result
    pub async fn replace(&self, records: Vec<R>) {
        *self.records.write().await = records;
    }

    pub async fn apply(&self, event: &ChangeEvent) {
        let mut records = self.records.write().await;
        let current = std::mem::take(&mut *records);
        *records = apply_change_event(current, event);
    }

    /// Merge a record we just wrote.
    pub async fn upsert(&self, record: &R) {
        match serde_json::to_value(record) {
            Ok(value) => self.apply(&ChangeEvent::update(R::TABLE, None, value)).await,
            Err(e) => tracing::warn!("Could not cache {} {}: {}", R::TABLE.as_str(), record.record_id(), e),
        }
    }

    pub async fn remove(&self, id: &str) {
        self.records.write().await.retain(|r| r.record_id() != id);
    }

    /// Edit a cached record in place. No-op when it is not cached.
    pub async fn patch(&self, id: &str, edit: impl FnOnce(&mut R)) {
        if let Some(record) = self.records.write().await.iter_mut().find(|r| r.record_id() == id) {
            edit(record);
        }
    }

    /// Put back a copy taken before an optimistic patch, regardless of
    /// timestamps.
    pub async fn restore(&self, previous: R) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.record_id() == previous.record_id()) {
            Some(slot) => *slot = previous,
            None => records.push(previous),
        }
    }
}
