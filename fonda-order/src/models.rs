use chrono::{DateTime, Utc};
use fonda_catalog::OptionSelection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::cart::OrderPayload;
use crate::manager::OrderError;

/// Fulfillment status. `Delivered` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(OrderError::Corrupt(format!("unknown status {}", other))),
        }
    }
}

/// Payment status in the lifecycle
///
/// `Unpaid -> Verifying -> Paid`, with `OnAccount` entered at submission for
/// monthly-account orders. `Paid` is the only terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Verifying,
    Paid,
    OnAccount,
}

impl PaymentStatus {
    /// Statuses that count towards a customer's debt.
    pub const OUTSTANDING: [PaymentStatus; 2] = [PaymentStatus::OnAccount, PaymentStatus::Unpaid];

    pub fn is_outstanding(&self) -> bool {
        Self::OUTSTANDING.contains(self)
    }

    /// Status an order starts in.
    pub fn initial(method: PaymentMethod, operation_code: Option<&str>) -> Self {
        match method {
            PaymentMethod::Monthly => PaymentStatus::OnAccount,
            PaymentMethod::Instant if operation_code.is_some() => PaymentStatus::Verifying,
            PaymentMethod::Instant => PaymentStatus::Unpaid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Verifying => "verifying",
            PaymentStatus::Paid => "paid",
            PaymentStatus::OnAccount => "on_account",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "verifying" => Ok(PaymentStatus::Verifying),
            "paid" => Ok(PaymentStatus::Paid),
            "on_account" => Ok(PaymentStatus::OnAccount),
            other => Err(OrderError::Corrupt(format!("unknown payment status {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Immediate mobile transfer, confirmed by an operation code.
    Instant,
    /// Deferred to the monthly account.
    Monthly,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Instant => "instant",
            PaymentMethod::Monthly => "monthly",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instant" => Ok(PaymentMethod::Instant),
            "monthly" => Ok(PaymentMethod::Monthly),
            other => Err(OrderError::Corrupt(format!("unknown payment method {}", other))),
        }
    }
}

/// Frozen copy of a cart line inside an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
    #[serde(default)]
    pub options: Option<OptionSelection>,
}

impl OrderLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Where a submission came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditMetadata {
    pub submitted_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Customer details captured by the checkout form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerProfile {
    pub phone: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub dni: Option<String>,
}

/// Stored customer, keyed by phone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub phone: String,
    pub name: String,
    pub location: String,
    pub dni: Option<String>,
    pub is_blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn from_profile(profile: &CustomerProfile) -> Self {
        let now = Utc::now();
        Self {
            phone: profile.phone.clone(),
            name: profile.name.clone(),
            location: profile.location.clone(),
            dni: profile.dni.clone(),
            is_blacklisted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the profile with the latest submission. The blacklist flag
    /// is never touched here, and a known DNI is kept when none is given.
    pub fn apply_profile(&mut self, profile: &CustomerProfile) {
        self.name = profile.name.clone();
        self.location = profile.location.clone();
        if profile.dni.is_some() {
            self.dni = profile.dni.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// A submitted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub location: String,
    pub items: Vec<OrderLine>,
    pub total_amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub is_monthly_account: bool,
    pub operation_code: Option<String>,
    #[serde(default)]
    pub audit: Option<AuditMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new pending order from a cart snapshot.
    ///
    /// Fails when the snapshot is empty or its total does not match its lines.
    pub fn submit(
        profile: &CustomerProfile,
        payload: OrderPayload,
        payment_method: PaymentMethod,
        operation_code: Option<String>,
        audit: Option<AuditMetadata>,
    ) -> Result<Self, OrderError> {
        if payload.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let computed: i64 = payload.lines.iter().map(OrderLine::line_total).sum();
        if computed != payload.total {
            return Err(OrderError::TotalMismatch {
                expected: computed,
                actual: payload.total,
            });
        }

        // A monthly order is settled later through the debt flow, so any code
        // sent along with it is not kept.
        let operation_code = match payment_method {
            PaymentMethod::Instant => operation_code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            PaymentMethod::Monthly => None,
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            customer_name: profile.name.clone(),
            phone: profile.phone.clone(),
            location: profile.location.clone(),
            items: payload.lines,
            total_amount: payload.total,
            payment_method,
            payment_status: PaymentStatus::initial(payment_method, operation_code.as_deref()),
            status: OrderStatus::Pending,
            is_monthly_account: payment_method == PaymentMethod::Monthly,
            operation_code,
            audit,
            created_at: now,
            updated_at: now,
        })
    }

    /// Transition: Verifying | Unpaid → Paid (admin only)
    pub fn verify_payment(&mut self) -> Result<(), OrderError> {
        if !matches!(
            self.payment_status,
            PaymentStatus::Verifying | PaymentStatus::Unpaid
        ) {
            return Err(OrderError::InvalidTransition {
                from: self.payment_status.as_str().to_string(),
                to: PaymentStatus::Paid.as_str().to_string(),
            });
        }
        self.payment_status = PaymentStatus::Paid;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition: Pending → Delivered. Returns false when the order was
    /// already delivered.
    pub fn mark_delivered(&mut self) -> bool {
        if self.status == OrderStatus::Delivered {
            return false;
        }
        self.status = OrderStatus::Delivered;
        self.updated_at = Utc::now();
        true
    }

    /// Transition: OnAccount | Unpaid → Verifying, switching to instant
    /// payment with the given code. Returns false for orders with no debt.
    pub fn settle_debt(&mut self, operation_code: &str) -> bool {
        if !self.payment_status.is_outstanding() {
            return false;
        }
        self.payment_status = PaymentStatus::Verifying;
        self.payment_method = PaymentMethod::Instant;
        self.operation_code = Some(operation_code.to_string());
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CustomerProfile {
        CustomerProfile {
            phone: "987654321".to_string(),
            name: "Rosa Quispe".to_string(),
            location: "Oficina 302".to_string(),
            dni: None,
        }
    }

    fn payload() -> OrderPayload {
        OrderPayload {
            lines: vec![OrderLine {
                product_id: None,
                name: "Menú".to_string(),
                quantity: 2,
                unit_price: 1250,
                options: None,
            }],
            total: 2500,
        }
    }

    #[test]
    fn test_monthly_order_goes_on_account() {
        let order = Order::submit(&profile(), payload(), PaymentMethod::Monthly, None, None).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::OnAccount);
        assert!(order.is_monthly_account);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_instant_order_with_code_is_verifying() {
        let order = Order::submit(
            &profile(),
            payload(),
            PaymentMethod::Instant,
            Some("417".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Verifying);
        assert_eq!(order.operation_code.as_deref(), Some("417"));
        assert!(!order.is_monthly_account);
    }

    #[test]
    fn test_instant_order_without_code_is_unpaid() {
        let order =
            Order::submit(&profile(), payload(), PaymentMethod::Instant, Some(" ".to_string()), None)
                .unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert!(order.operation_code.is_none());
    }

    #[test]
    fn test_submit_rejects_bad_payloads() {
        let empty = OrderPayload {
            lines: vec![],
            total: 0,
        };
        assert!(matches!(
            Order::submit(&profile(), empty, PaymentMethod::Instant, None, None),
            Err(OrderError::EmptyOrder)
        ));

        let mut skewed = payload();
        skewed.total = 100;
        assert!(matches!(
            Order::submit(&profile(), skewed, PaymentMethod::Instant, None, None),
            Err(OrderError::TotalMismatch { .. })
        ));
    }

    #[test]
    fn test_payment_verification_rules() {
        let mut order = Order::submit(&profile(), payload(), PaymentMethod::Instant, None, None).unwrap();
        order.verify_payment().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        // Paid is terminal
        assert!(order.verify_payment().is_err());

        let mut monthly = Order::submit(&profile(), payload(), PaymentMethod::Monthly, None, None).unwrap();
        assert!(matches!(
            monthly.verify_payment(),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_mark_delivered_is_idempotent() {
        let mut order = Order::submit(&profile(), payload(), PaymentMethod::Instant, None, None).unwrap();
        assert!(order.mark_delivered());
        assert!(!order.mark_delivered());
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_settle_debt_only_touches_outstanding() {
        let mut monthly = Order::submit(&profile(), payload(), PaymentMethod::Monthly, None, None).unwrap();
        assert!(monthly.settle_debt("9001"));
        assert_eq!(monthly.payment_status, PaymentStatus::Verifying);
        assert_eq!(monthly.payment_method, PaymentMethod::Instant);
        assert_eq!(monthly.operation_code.as_deref(), Some("9001"));
        assert!(!monthly.settle_debt("9002"));
    }

    #[test]
    fn test_customer_profile_keeps_blacklist() {
        let mut customer = Customer::from_profile(&profile());
        customer.is_blacklisted = true;
        customer.dni = Some("12345678".to_string());

        let mut newer = profile();
        newer.location = "Caja 2".to_string();
        customer.apply_profile(&newer);

        assert!(customer.is_blacklisted);
        assert_eq!(customer.location, "Caja 2");
        assert_eq!(customer.dni.as_deref(), Some("12345678"));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(PaymentStatus::OnAccount).unwrap(),
            serde_json::json!("on_account")
        );
        assert_eq!("on_account".parse::<PaymentStatus>().unwrap(), PaymentStatus::OnAccount);
        assert_eq!("monthly".parse::<PaymentMethod>().unwrap(), PaymentMethod::Monthly);
    }
}
