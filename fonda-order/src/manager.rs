use fonda_core::validation::{validate_operation_code, validate_phone};
use fonda_core::{CoreError, SessionContext};
use fonda_shared::Masked;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::finance::{debt_report, debt_total, DebtSummary};
use crate::models::{Customer, Order};
use crate::repository::{CustomerRepository, OrderFilter, OrderRepository};

/// A phone's order history with its current debt.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerHistory {
    pub phone: String,
    pub orders: Vec<Order>,
    pub debt_total: i64,
}

/// Result of a batch debt payment.
#[derive(Debug, Clone, Serialize)]
pub struct DebtPayment {
    pub settled_order_ids: Vec<Uuid>,
    pub amount: i64,
}

/// Drives order state transitions against the repositories.
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    customers: Arc<dyn CustomerRepository>,
    phone_prefix: char,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        customers: Arc<dyn CustomerRepository>,
        phone_prefix: char,
    ) -> Self {
        Self {
            orders,
            customers,
            phone_prefix,
        }
    }

    /// Public status lookup
    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .get_order(order_id)
            .await
            .map_err(|e| OrderError::Backend(e.to_string()))?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// Orders and debt for a phone, newest first.
    pub async fn customer_history(&self, phone: &str) -> Result<CustomerHistory, OrderError> {
        validate_phone(phone, self.phone_prefix)?;
        let orders = self
            .orders
            .list_orders(&OrderFilter::by_phone(phone))
            .await
            .map_err(|e| OrderError::Backend(e.to_string()))?;
        let debt_total = debt_total(&orders, phone);
        Ok(CustomerHistory {
            phone: phone.to_string(),
            orders,
            debt_total,
        })
    }

    /// Customer pays every outstanding order at once with one operation code.
    pub async fn pay_debt(&self, phone: &str, operation_code: &str) -> Result<DebtPayment, OrderError> {
        validate_phone(phone, self.phone_prefix)?;
        validate_operation_code(operation_code)?;
        let code = operation_code.trim();

        let mut outstanding = self
            .orders
            .list_orders(&OrderFilter::by_phone(phone).outstanding())
            .await
            .map_err(|e| OrderError::Backend(e.to_string()))?;

        let amount = debt_total(&outstanding, phone);
        outstanding.retain_mut(|order| order.settle_debt(code));
        if outstanding.is_empty() {
            return Err(OrderError::NoOutstandingDebt(phone.to_string()));
        }

        self.orders
            .update_orders(&outstanding)
            .await
            .map_err(|e| {
                tracing::error!("Debt payment for {} failed: {}", Masked(phone), e);
                OrderError::Backend(e.to_string())
            })?;

        info!(
            "Debt payment for {}: {} orders now verifying",
            Masked(phone),
            outstanding.len()
        );

        Ok(DebtPayment {
            settled_order_ids: outstanding.iter().map(|o| o.id).collect(),
            amount,
        })
    }

    /// Admin listing for the orders tab
    pub async fn list_orders(
        &self,
        session: &SessionContext,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, OrderError> {
        session.require_admin()?;
        self.orders
            .list_orders(filter)
            .await
            .map_err(|e| OrderError::Backend(e.to_string()))
    }

    /// Transition: Verifying | Unpaid → Paid
    pub async fn verify_payment(&self, session: &SessionContext, order_id: Uuid) -> Result<Order, OrderError> {
        let admin = session.require_admin()?;
        let mut order = self.get_order(order_id).await?;
        order.verify_payment()?;
        self.save(&order).await?;
        info!("Payment verified for order {} by {}", order_id, admin.email);
        Ok(order)
    }

    /// Transition: Pending → Delivered. Repeating it on a delivered order
    /// succeeds without writing.
    pub async fn mark_delivered(&self, session: &SessionContext, order_id: Uuid) -> Result<Order, OrderError> {
        let admin = session.require_admin()?;
        let mut order = self.get_order(order_id).await?;
        if order.mark_delivered() {
            self.save(&order).await?;
            info!("Order {} delivered ({})", order_id, admin.email);
        }
        Ok(order)
    }

    pub async fn delete_order(&self, session: &SessionContext, order_id: Uuid) -> Result<(), OrderError> {
        let admin = session.require_admin()?;
        let deleted = self
            .orders
            .delete_order(order_id)
            .await
            .map_err(|e| OrderError::Backend(e.to_string()))?;
        if !deleted {
            return Err(OrderError::NotFound(order_id.to_string()));
        }
        info!("Order {} deleted by {}", order_id, admin.email);
        Ok(())
    }

    /// Block or unblock future submissions from a phone.
    pub async fn set_blacklisted(
        &self,
        session: &SessionContext,
        phone: &str,
        blacklisted: bool,
    ) -> Result<Customer, OrderError> {
        let admin = session.require_admin()?;
        validate_phone(phone, self.phone_prefix)?;
        let customer = self
            .customers
            .set_blacklisted(phone, blacklisted)
            .await
            .map_err(|e| OrderError::Backend(e.to_string()))?;
        info!(
            "Customer {} blacklisted={} by {}",
            Masked(phone),
            blacklisted,
            admin.email
        );
        Ok(customer)
    }

    /// Outstanding balances across all customers
    pub async fn debt_report(&self, session: &SessionContext) -> Result<Vec<DebtSummary>, OrderError> {
        session.require_admin()?;
        let orders = self
            .orders
            .list_orders(&OrderFilter::default().outstanding())
            .await
            .map_err(|e| OrderError::Backend(e.to_string()))?;
        Ok(debt_report(&orders))
    }

    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        self.orders.update_order(order).await.map_err(|e| {
            tracing::error!("Failed to update order {}: {}", order.id, e);
            OrderError::Backend(e.to_string())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Order total {actual} does not match its lines ({expected})")]
    TotalMismatch { expected: i64, actual: i64 },

    #[error("No outstanding debt for {}", Masked(.0.as_str()))]
    NoOutstandingDebt(String),

    #[error("Stored order is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Order storage failed: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::OrderPayload;
    use crate::models::{CustomerProfile, OrderLine, OrderStatus, PaymentMethod, PaymentStatus};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use fonda_core::AdminSession;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    #[derive(Default)]
    struct FakeOrders {
        rows: Mutex<Vec<Order>>,
        writes: Mutex<usize>,
    }

    #[async_trait]
    impl OrderRepository for FakeOrders {
        async fn insert_order(&self, order: &Order) -> Result<(), BoxError> {
            self.rows.lock().unwrap().push(order.clone());
            Ok(())
        }
        async fn get_order(&self, id: Uuid) -> Result<Option<Order>, BoxError> {
            Ok(self.rows.lock().unwrap().iter().find(|o| o.id == id).cloned())
        }
        async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, BoxError> {
            Ok(self.rows.lock().unwrap().iter().filter(|o| filter.matches(o)).cloned().collect())
        }
        async fn update_order(&self, order: &Order) -> Result<(), BoxError> {
            *self.writes.lock().unwrap() += 1;
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|o| o.id == order.id) {
                *row = order.clone();
            }
            Ok(())
        }
        async fn update_orders(&self, orders: &[Order]) -> Result<(), BoxError> {
            for order in orders {
                self.update_order(order).await?;
            }
            Ok(())
        }
        async fn delete_order(&self, id: Uuid) -> Result<bool, BoxError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|o| o.id != id);
            Ok(rows.len() != before)
        }
    }

    #[derive(Default)]
    struct FakeCustomers {
        rows: Mutex<HashMap<String, Customer>>,
    }

    #[async_trait]
    impl CustomerRepository for FakeCustomers {
        async fn get_customer(&self, phone: &str) -> Result<Option<Customer>, BoxError> {
            Ok(self.rows.lock().unwrap().get(phone).cloned())
        }
        async fn upsert_customer(&self, profile: &CustomerProfile) -> Result<Customer, BoxError> {
            let mut rows = self.rows.lock().unwrap();
            let customer = rows
                .entry(profile.phone.clone())
                .and_modify(|c| c.apply_profile(profile))
                .or_insert_with(|| Customer::from_profile(profile));
            Ok(customer.clone())
        }
        async fn set_blacklisted(&self, phone: &str, blacklisted: bool) -> Result<Customer, BoxError> {
            let mut rows = self.rows.lock().unwrap();
            let customer = rows.entry(phone.to_string()).or_insert_with(|| {
                Customer::from_profile(&CustomerProfile {
                    phone: phone.to_string(),
                    name: String::new(),
                    location: String::new(),
                    dni: None,
                })
            });
            customer.is_blacklisted = blacklisted;
            Ok(customer.clone())
        }
    }

    fn admin() -> SessionContext {
        SessionContext::admin(AdminSession {
            email: "caja@fonda.pe".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    fn order(phone: &str, total: i64, method: PaymentMethod) -> Order {
        let profile = CustomerProfile {
            phone: phone.to_string(),
            name: "Ana".to_string(),
            location: "Piso 2".to_string(),
            dni: None,
        };
        let payload = OrderPayload {
            lines: vec![OrderLine {
                product_id: None,
                name: "Menú".to_string(),
                quantity: 1,
                unit_price: total,
                options: None,
            }],
            total,
        };
        Order::submit(&profile, payload, method, None, None).unwrap()
    }

    async fn manager_with(orders: Vec<Order>) -> (OrderManager, Arc<FakeOrders>) {
        let repo = Arc::new(FakeOrders::default());
        for o in &orders {
            repo.insert_order(o).await.unwrap();
        }
        let manager = OrderManager::new(repo.clone(), Arc::new(FakeCustomers::default()), '9');
        (manager, repo)
    }

    #[tokio::test]
    async fn test_mark_delivered_twice_writes_once() {
        let o = order("987654321", 1500, PaymentMethod::Instant);
        let (manager, repo) = manager_with(vec![o.clone()]).await;

        let first = manager.mark_delivered(&admin(), o.id).await.unwrap();
        let second = manager.mark_delivered(&admin(), o.id).await.unwrap();

        assert_eq!(first.status, OrderStatus::Delivered);
        assert_eq!(second.status, OrderStatus::Delivered);
        assert_eq!(*repo.writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_admin_actions_require_session() {
        let o = order("987654321", 1500, PaymentMethod::Instant);
        let (manager, _) = manager_with(vec![o.clone()]).await;

        let result = manager.verify_payment(&SessionContext::anonymous(), o.id).await;
        assert!(matches!(result, Err(OrderError::Core(CoreError::Unauthorized(_)))));
        assert_eq!(
            manager.get_order(o.id).await.unwrap().payment_status,
            PaymentStatus::Unpaid
        );
    }

    #[tokio::test]
    async fn test_pay_debt_moves_outstanding_orders_to_verifying() {
        let phone = "987654321";
        let mut paid = order(phone, 400, PaymentMethod::Instant);
        paid.verify_payment().unwrap();
        let orders = vec![
            order(phone, 1500, PaymentMethod::Monthly),
            order(phone, 700, PaymentMethod::Instant),
            paid,
            order("912345678", 900, PaymentMethod::Monthly),
        ];
        let (manager, _) = manager_with(orders).await;

        let payment = manager.pay_debt(phone, "417").await.unwrap();
        assert_eq!(payment.settled_order_ids.len(), 2);
        assert_eq!(payment.amount, 2200);

        let history = manager.customer_history(phone).await.unwrap();
        assert_eq!(history.debt_total, 0);
        let verifying: Vec<&Order> = history
            .orders
            .iter()
            .filter(|o| o.payment_status == PaymentStatus::Verifying)
            .collect();
        assert_eq!(verifying.len(), 2);
        assert!(verifying.iter().all(|o| o.payment_method == PaymentMethod::Instant
            && o.operation_code.as_deref() == Some("417")));

        // the other customer is untouched
        assert_eq!(manager.customer_history("912345678").await.unwrap().debt_total, 900);
    }

    #[tokio::test]
    async fn test_pay_debt_without_debt_fails() {
        let (manager, _) = manager_with(vec![]).await;
        assert!(matches!(
            manager.pay_debt("987654321", "417").await,
            Err(OrderError::NoOutstandingDebt(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_block() {
        let o = order("987654321", 1500, PaymentMethod::Instant);
        let (manager, _) = manager_with(vec![o.clone()]).await;

        manager.delete_order(&admin(), o.id).await.unwrap();
        assert!(matches!(manager.get_order(o.id).await, Err(OrderError::NotFound(_))));
        assert!(matches!(
            manager.delete_order(&admin(), o.id).await,
            Err(OrderError::NotFound(_))
        ));

        let customer = manager.set_blacklisted(&admin(), "987654321", true).await.unwrap();
        assert!(customer.is_blacklisted);
    }

    #[tokio::test]
    async fn test_debt_report_requires_admin() {
        let (manager, _) = manager_with(vec![order("987654321", 1500, PaymentMethod::Monthly)]).await;
        assert!(manager.debt_report(&SessionContext::anonymous()).await.is_err());
        let report = manager.debt_report(&admin()).await.unwrap();
        assert_eq!(report[0].total, 1500);
    }
}
