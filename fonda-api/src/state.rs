use fonda_catalog::Product;
use fonda_core::identity::IdentityLookup;
use fonda_order::{
    CartStore, CheckoutService, CustomerRepository, Order, OrderManager, OrderRepository,
    ProductRepository,
};
use fonda_store::app_config::{AdminAccount, BusinessRules};
use fonda_store::{ChangeFeed, RedisClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::cache::RecordCache;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub admins: Vec<AdminAccount>,
}

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub carts: Arc<dyn CartStore>,
    pub identity: Arc<dyn IdentityLookup>,
    /// Rate limiting is skipped without Redis.
    pub redis: Option<Arc<RedisClient>>,
    pub feed: ChangeFeed,
    /// Storefront catalog
    pub catalog: RecordCache<Product>,
    /// Admin order board
    pub board: RecordCache<Order>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub cart_locks: CartLocks,
}

/// One async lock per cart id, held across a cart's load-modify-save.
///
/// Serializes edits within this process only. Two API instances sharing a
/// Redis cart store can still interleave, and the later save wins.
#[derive(Clone, Default)]
pub struct CartLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl CartLocks {
    pub async fn lock(&self, cart_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(cart_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

impl AppState {
    pub fn order_manager(&self) -> OrderManager {
        OrderManager::new(
            self.orders.clone(),
            self.customers.clone(),
            self.business_rules.phone_prefix,
        )
    }

    pub fn checkout_service(&self) -> CheckoutService {
        CheckoutService::new(
            self.orders.clone(),
            self.customers.clone(),
            self.business_rules.phone_prefix,
        )
    }
}
