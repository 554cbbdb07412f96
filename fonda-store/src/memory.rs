//! Process-local implementations of every store collaborator.
//!
//! Used when no database URL is configured and by the API tests. Every write
//! publishes the same change event the Postgres trigger would.

use async_trait::async_trait;
use fonda_catalog::Product;
use fonda_order::{
    Cart, CartStore, Customer, CustomerProfile, CustomerRepository, Order, OrderFilter,
    OrderRepository, ProductRepository,
};
use fonda_shared::{ChangeEvent, ChangeTable};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::events::ChangeFeed;

type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Default)]
pub struct InMemoryStore {
    products: RwLock<HashMap<Uuid, Product>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    customers: RwLock<HashMap<String, Customer>>,
    feed: ChangeFeed,
}

fn to_json<T: Serialize>(value: &T) -> StoreResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

impl InMemoryStore {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            feed,
            ..Default::default()
        }
    }

    fn publish_upsert<T: Serialize>(&self, table: ChangeTable, old: Option<&T>, new: &T) -> StoreResult<()> {
        let event = match old {
            Some(old) => ChangeEvent::update(table, Some(to_json(old)?), to_json(new)?),
            None => ChangeEvent::insert(table, to_json(new)?),
        };
        self.feed.publish(event);
        Ok(())
    }

    fn publish_delete<T: Serialize>(&self, table: ChangeTable, old: &T) -> StoreResult<()> {
        self.feed.publish(ChangeEvent::delete(table, to_json(old)?));
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn create_product(&self, product: &Product) -> StoreResult<()> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(format!("product {} already exists", product.id).into());
        }
        products.insert(product.id, product.clone());
        self.publish_upsert(ChangeTable::Products, None, product)
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let mut products = self.products.write().await;
        let Some(existing) = products.get_mut(&product.id) else {
            return Ok(false);
        };
        let old = std::mem::replace(existing, product.clone());
        self.publish_upsert(ChangeTable::Products, Some(&old), product)?;
        Ok(true)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        match self.products.write().await.remove(&id) {
            Some(old) => {
                self.publish_delete(ChangeTable::Products, &old)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_availability(&self, id: Uuid, is_available: bool) -> StoreResult<bool> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Ok(false);
        };
        let old = product.clone();
        product.set_availability(is_available);
        let new = product.clone();
        self.publish_upsert(ChangeTable::Products, Some(&old), &new)?;
        Ok(true)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(format!("order {} already exists", order.id).into());
        }
        orders.insert(order.id, order.clone());
        self.publish_upsert(ChangeTable::Orders, None, order)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_order(&self, order: &Order) -> StoreResult<()> {
        self.update_orders(std::slice::from_ref(order)).await
    }

    async fn update_orders(&self, batch: &[Order]) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        if let Some(missing) = batch.iter().find(|o| !orders.contains_key(&o.id)) {
            return Err(format!("order {} not found", missing.id).into());
        }
        let mut replaced = Vec::with_capacity(batch.len());
        for order in batch {
            if let Some(old) = orders.insert(order.id, order.clone()) {
                replaced.push(old);
            }
        }
        for (old, new) in replaced.iter().zip(batch) {
            self.publish_upsert(ChangeTable::Orders, Some(old), new)?;
        }
        Ok(())
    }

    async fn delete_order(&self, id: Uuid) -> StoreResult<bool> {
        match self.orders.write().await.remove(&id) {
            Some(old) => {
                self.publish_delete(ChangeTable::Orders, &old)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CustomerRepository for InMemoryStore {
    async fn get_customer(&self, phone: &str) -> StoreResult<Option<Customer>> {
        Ok(self.customers.read().await.get(phone).cloned())
    }

    async fn upsert_customer(&self, profile: &CustomerProfile) -> StoreResult<Customer> {
        let mut customers = self.customers.write().await;
        let old = customers.get(&profile.phone).cloned();
        let customer = customers
            .entry(profile.phone.clone())
            .and_modify(|c| c.apply_profile(profile))
            .or_insert_with(|| Customer::from_profile(profile))
            .clone();
        self.publish_upsert(ChangeTable::Customers, old.as_ref(), &customer)?;
        Ok(customer)
    }

    async fn set_blacklisted(&self, phone: &str, blacklisted: bool) -> StoreResult<Customer> {
        let mut customers = self.customers.write().await;
        let old = customers.get(phone).cloned();
        let customer = customers.entry(phone.to_string()).or_insert_with(|| {
            Customer::from_profile(&CustomerProfile {
                phone: phone.to_string(),
                name: String::new(),
                location: String::new(),
                dni: None,
            })
        });
        customer.is_blacklisted = blacklisted;
        customer.updated_at = chrono::Utc::now();
        let customer = customer.clone();
        self.publish_upsert(ChangeTable::Customers, old.as_ref(), &customer)?;
        Ok(customer)
    }
}

/// Carts kept in process memory, dropped once `ttl` passes without a save.
pub struct MemoryCartStore {
    carts: RwLock<HashMap<String, StoredCart>>,
    ttl: Duration,
}

struct StoredCart {
    cart: Cart,
    saved_at: Instant,
}

impl MemoryCartStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            carts: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Drop every expired cart, returning how many went.
    pub async fn purge_expired(&self) -> usize {
        let mut carts = self.carts.write().await;
        let before = carts.len();
        carts.retain(|_, stored| stored.saved_at.elapsed() < self.ttl);
        before - carts.len()
    }

    /// Purge on a timer until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let removed = store.purge_expired().await;
                if removed > 0 {
                    debug!("Dropped {} expired carts", removed);
                }
            }
        })
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn load(&self, cart_id: &str) -> StoreResult<Cart> {
        let carts = self.carts.read().await;
        match carts.get(cart_id) {
            Some(stored) if stored.saved_at.elapsed() < self.ttl => Ok(stored.cart.clone()),
            _ => Ok(Cart::new()),
        }
    }

    async fn save(&self, cart_id: &str, cart: &Cart) -> StoreResult<()> {
        let stored = StoredCart {
            cart: cart.clone(),
            saved_at: Instant::now(),
        };
        self.carts.write().await.insert(cart_id.to_string(), stored);
        Ok(())
    }

    async fn clear(&self, cart_id: &str) -> StoreResult<()> {
        self.carts.write().await.remove(cart_id);
        Ok(())
    }
}
