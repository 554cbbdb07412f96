use async_trait::async_trait;
use fonda_catalog::Product;
use uuid::Uuid;

use crate::models::{Customer, CustomerProfile, Order, OrderStatus, PaymentStatus};

/// Narrowing applied to order listings. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub phone: Option<String>,
    pub status: Option<OrderStatus>,
    /// Any of these payment statuses.
    pub payment_statuses: Vec<PaymentStatus>,
}

impl OrderFilter {
    pub fn by_phone(phone: &str) -> Self {
        Self {
            phone: Some(phone.to_string()),
            ..Default::default()
        }
    }

    pub fn outstanding(mut self) -> Self {
        self.payment_statuses = PaymentStatus::OUTSTANDING.to_vec();
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.phone.as_deref().map_or(true, |p| p == order.phone)
            && self.status.map_or(true, |s| s == order.status)
            && (self.payment_statuses.is_empty()
                || self.payment_statuses.contains(&order.payment_status))
    }
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    /// Newest first.
    async fn list_orders(
        &self,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_order(&self, order: &Order) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// All-or-nothing update of several orders.
    async fn update_orders(&self, orders: &[Order]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns false when no such order existed.
    async fn delete_order(&self, id: Uuid) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for customer profiles
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn get_customer(
        &self,
        phone: &str,
    ) -> Result<Option<Customer>, Box<dyn std::error::Error + Send + Sync>>;

    /// Create or refresh the profile. Must leave the blacklist flag as stored.
    async fn upsert_customer(
        &self,
        profile: &CustomerProfile,
    ) -> Result<Customer, Box<dyn std::error::Error + Send + Sync>>;

    /// Creates a bare record when the phone has never ordered.
    async fn set_blacklisted(
        &self,
        phone: &str,
        blacklisted: bool,
    ) -> Result<Customer, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for product catalog access
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>>;

    async fn create_product(&self, product: &Product) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns false when no such product existed.
    async fn update_product(&self, product: &Product) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn delete_product(&self, id: Uuid) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn set_availability(
        &self,
        id: Uuid,
        is_available: bool,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
