use chrono::{DateTime, Utc};
use fonda_catalog::Product;
use fonda_shared::{ChangeEvent, ChangeEventType, ChangeTable};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::models::{Customer, Order};

/// A row that can be kept in a local collection and merged from change events.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const TABLE: ChangeTable;
    /// Name of the primary-key field in the row payload.
    const ID_FIELD: &'static str;

    fn record_id(&self) -> String;

    fn updated_at(&self) -> DateTime<Utc>;
}

impl Record for Product {
    const TABLE: ChangeTable = ChangeTable::Products;
    const ID_FIELD: &'static str = "id";

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for Order {
    const TABLE: ChangeTable = ChangeTable::Orders;
    const ID_FIELD: &'static str = "id";

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for Customer {
    const TABLE: ChangeTable = ChangeTable::Customers;
    const ID_FIELD: &'static str = "phone";

    fn record_id(&self) -> String {
        self.phone.clone()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn payload_id<R: Record>(payload: &Value) -> Option<String> {
    match payload.get(R::ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Overlay `patch` onto `base` field by field.
fn overlay(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (k, v) in patch {
                base.insert(k.clone(), v.clone());
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// Merge one change event into a local collection.
///
/// Inserts and updates are upserts keyed by record id; fields present in the
/// event overwrite the local copy. An event whose row is older than the local
/// copy is ignored, so a late push for a write we already applied is
/// harmless. Deletes remove by id. Events for other tables, or with payloads
/// that do not decode, leave the collection unchanged.
pub fn apply_change_event<R: Record>(mut state: Vec<R>, event: &ChangeEvent) -> Vec<R> {
    if event.table != R::TABLE {
        return state;
    }

    match event.event_type {
        ChangeEventType::Insert | ChangeEventType::Update => {
            let Some(new) = event.new.as_ref() else {
                return state;
            };
            let Some(id) = payload_id::<R>(new) else {
                tracing::warn!("Change event on {} without {}", R::TABLE.as_str(), R::ID_FIELD);
                return state;
            };

            let position = state.iter().position(|r| r.record_id() == id);
            let mut merged = match position.and_then(|i| serde_json::to_value(&state[i]).ok()) {
                Some(existing) => existing,
                None => Value::Object(Default::default()),
            };
            overlay(&mut merged, new);

            let incoming: R = match serde_json::from_value(merged) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Undecodable {} change for {}: {}", R::TABLE.as_str(), id, e);
                    return state;
                }
            };

            match position {
                Some(i) if state[i].updated_at() > incoming.updated_at() => {}
                Some(i) => state[i] = incoming,
                None => state.push(incoming),
            }
        }
        ChangeEventType::Delete => {
            let id = event
                .old
                .as_ref()
                .and_then(payload_id::<R>)
                .or_else(|| event.new.as_ref().and_then(payload_id::<R>));
            if let Some(id) = id {
                state.retain(|r| r.record_id() != id);
            }
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fonda_catalog::Category;
    use serde_json::json;

    fn product(name: &str) -> Product {
        Product::new(name, 1000, Category::Extra)
    }

    #[test]
    fn test_insert_then_duplicate_insert_is_idempotent() {
        let p = product("Agua");
        let event = ChangeEvent::insert(ChangeTable::Products, serde_json::to_value(&p).unwrap());

        let state = apply_change_event(Vec::<Product>::new(), &event);
        let state = apply_change_event(state, &event);
        assert_eq!(state, vec![p]);
    }

    #[test]
    fn test_partial_update_overlays_fields() {
        let mut p = product("Agua");
        p.updated_at = Utc::now() - Duration::minutes(5);
        let later = Utc::now();
        let event = ChangeEvent::update(
            ChangeTable::Products,
            None,
            json!({"id": p.id, "is_available": false, "updated_at": later}),
        );

        let state = apply_change_event(vec![p.clone()], &event);
        assert_eq!(state.len(), 1);
        assert!(!state[0].is_available);
        assert_eq!(state[0].name, "Agua");
    }

    #[test]
    fn test_stale_update_is_ignored() {
        let p = product("Agua");
        let mut stale = p.clone();
        stale.name = "Agua vieja".to_string();
        stale.updated_at = p.updated_at - Duration::seconds(30);
        let event = ChangeEvent::update(
            ChangeTable::Products,
            None,
            serde_json::to_value(&stale).unwrap(),
        );

        let state = apply_change_event(vec![p.clone()], &event);
        assert_eq!(state[0].name, "Agua");
    }

    #[test]
    fn test_delete_by_old_id() {
        let a = product("A");
        let b = product("B");
        let event = ChangeEvent::delete(ChangeTable::Products, json!({"id": a.id}));

        let state = apply_change_event(vec![a, b.clone()], &event);
        assert_eq!(state, vec![b]);

        // deleting again changes nothing
        let state = apply_change_event(state, &event);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_other_tables_and_garbage_ignored() {
        let p = product("A");
        let other = ChangeEvent::insert(ChangeTable::Orders, json!({"id": "x"}));
        let garbage = ChangeEvent::insert(ChangeTable::Products, json!({"id": "not-a-uuid"}));

        let state = apply_change_event(vec![p.clone()], &other);
        let state = apply_change_event(state, &garbage);
        assert_eq!(state, vec![p]);
    }
}
