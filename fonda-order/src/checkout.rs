use fonda_core::validation::{require_field, validate_dni, validate_operation_code, validate_phone};
use fonda_core::CoreError;
use fonda_shared::Masked;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cart::Cart;
use crate::manager::OrderError;
use crate::models::{AuditMetadata, CustomerProfile, Order, PaymentMethod};
use crate::repository::{CustomerRepository, OrderRepository};

/// Checkout form as submitted by the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub phone: String,
    pub location: String,
    #[serde(default)]
    pub dni: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub operation_code: Option<String>,
}

impl CheckoutRequest {
    /// Validates the form and returns the trimmed customer profile.
    pub fn validate(&self, phone_prefix: char) -> Result<CustomerProfile, CoreError> {
        let name = require_field("name", &self.customer_name)?;
        let phone = self.phone.trim();
        validate_phone(phone, phone_prefix)?;
        let location = require_field("location", &self.location)?;

        let dni = match self.dni.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(dni) => {
                validate_dni(dni)?;
                Some(dni.to_string())
            }
            None => None,
        };

        if self.payment_method == PaymentMethod::Instant {
            if let Some(code) = self.operation_code.as_deref().filter(|c| !c.trim().is_empty()) {
                validate_operation_code(code)?;
            }
        }

        Ok(CustomerProfile {
            phone: phone.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            dni,
        })
    }
}

/// Turns a cart into a stored order.
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    customers: Arc<dyn CustomerRepository>,
    phone_prefix: char,
}

impl CheckoutService {
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

    /// Submit the cart as a new order.
    ///
    /// A blacklisted phone is rejected before anything is written, and so is
    /// any failure to read the customer record. The profile upsert is best
    /// effort; only the order insert can fail the submission after that.
    pub async fn submit(
        &self,
        cart: &Cart,
        request: &CheckoutRequest,
        audit: Option<AuditMetadata>,
    ) -> Result<Order, CheckoutError> {
        let profile = request.validate(self.phone_prefix)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let existing = self.customers.get_customer(&profile.phone).await.map_err(|e| {
            error!("Customer lookup failed for {}: {}", Masked(&profile.phone), e);
            CheckoutError::Backend(e.to_string())
        })?;
        if existing.is_some_and(|c| c.is_blacklisted) {
            warn!("Rejected order from blacklisted {}", Masked(&profile.phone));
            return Err(CheckoutError::Blacklisted);
        }

        let order = Order::submit(
            &profile,
            cart.to_order_payload(),
            request.payment_method,
            request.operation_code.clone(),
            audit,
        )?;

        if let Err(e) = self.customers.upsert_customer(&profile).await {
            warn!("Customer upsert failed for {}: {}", Masked(&profile.phone), e);
        }

        self.orders.insert_order(&order).await.map_err(|e| {
            error!("Failed to insert order {}: {}", order.id, e);
            CheckoutError::Persistence(e.to_string())
        })?;

        info!(
            "Order {} submitted by {} ({}, {})",
            order.id,
            Masked(&profile.phone),
            order.payment_method.as_str(),
            order.payment_status
        );
        Ok(order)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Customer is not allowed to place orders")]
    Blacklisted,

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Order could not be saved: {0}")]
    Persistence(String),

    #[error("Customer lookup failed: {0}")]
    Backend(String),
}
