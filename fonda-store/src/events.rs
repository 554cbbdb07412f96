use fonda_catalog::Product;
use fonda_order::{Customer, CustomerRepository, Order, OrderRepository, ProductRepository, Record};
use fonda_shared::{ChangeEvent, ChangeEventType, ChangeTable};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{StoreCustomerRepository, StoreOrderRepository, StoreProductRepository};

/// Channel the `notify_table_change` trigger publishes on.
pub const CHANGE_CHANNEL: &str = "table_changes";

const DEFAULT_CAPACITY: usize = 256;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fan-out of row changes to every subscriber (SSE clients, cache sync).
///
/// Subscribers that fall behind see `RecvError::Lagged` and are expected to
/// refetch instead of trusting their local copy.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// No subscribers is not an error; the event is dropped.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Relay Postgres notifications from the change trigger into the feed.
    ///
    /// Notifications carry the row key only. Inserted and updated rows are
    /// read back before publishing, so subscribers always get a full row.
    pub async fn listen_postgres(&self, pool: &PgPool) -> Result<JoinHandle<()>, sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        info!("Listening for row changes on '{}'", CHANGE_CHANNEL);

        let rows = RowSource::new(pool);
        let feed = self.clone();
        Ok(tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        let key = match serde_json::from_str::<RowKey>(notification.payload()) {
                            Ok(key) => key,
                            Err(e) => {
                                warn!("Ignoring malformed change notification: {}", e);
                                continue;
                            }
                        };
                        match rows.resolve(&key).await {
                            Ok(Some(event)) => feed.publish(event),
                            // deleted before we read it; its DELETE follows
                            Ok(None) => debug!("{} row {} is gone", key.table.as_str(), key.id),
                            Err(e) => warn!("Failed to read changed {} row {}: {}", key.table.as_str(), key.id, e),
                        }
                    }
                    // PgListener reconnects on its own; a hard error here
                    // means the pool itself is gone.
                    Err(e) => {
                        error!("Change listener stopped: {}", e);
                        break;
                    }
                }
            }
        }))
    }
}

/// Payload of the change trigger.
#[derive(Debug, Deserialize)]
struct RowKey {
    table: ChangeTable,
    event_type: ChangeEventType,
    id: String,
}

/// Name of the key field for rows of `table`.
fn key_field(table: ChangeTable) -> &'static str {
    match table {
        ChangeTable::Products => Product::ID_FIELD,
        ChangeTable::Orders => Order::ID_FIELD,
        ChangeTable::Customers => Customer::ID_FIELD,
    }
}

/// Event for a changed row given its key and, unless deleted, its current
/// contents.
fn row_event(key: &RowKey, row: Option<Value>) -> Option<ChangeEvent> {
    match (key.event_type, row) {
        (ChangeEventType::Delete, _) => Some(ChangeEvent::delete(
            key.table,
            json!({ (key_field(key.table)): key.id }),
        )),
        (ChangeEventType::Insert, Some(row)) => Some(ChangeEvent::insert(key.table, row)),
        (ChangeEventType::Update, Some(row)) => Some(ChangeEvent::update(key.table, None, row)),
        (_, None) => None,
    }
}

struct RowSource {
    products: StoreProductRepository,
    orders: StoreOrderRepository,
    customers: StoreCustomerRepository,
}

impl RowSource {
    fn new(pool: &PgPool) -> Self {
        Self {
            products: StoreProductRepository::new(pool.clone()),
            orders: StoreOrderRepository::new(pool.clone()),
            customers: StoreCustomerRepository::new(pool.clone()),
        }
    }

    async fn resolve(&self, key: &RowKey) -> Result<Option<ChangeEvent>, BoxError> {
        if key.event_type == ChangeEventType::Delete {
            return Ok(row_event(key, None));
        }
        let row = match key.table {
            ChangeTable::Products => to_json(self.products.get_product(key.id.parse()?).await?)?,
            ChangeTable::Orders => to_json(self.orders.get_order(key.id.parse()?).await?)?,
            ChangeTable::Customers => to_json(self.customers.get_customer(&key.id).await?)?,
        };
        Ok(row_event(key, row))
    }
}

fn to_json<R: Record>(row: Option<R>) -> Result<Option<Value>, serde_json::Error> {
    row.as_ref().map(serde_json::to_value).transpose()
}
