//! Cart pricing, order lifecycle and debt tracking.
//!
//! All amounts are integer cents.

pub mod cart;
pub mod changes;
pub mod checkout;
pub mod finance;
pub mod manager;
pub mod models;
pub mod repository;

pub use cart::{Cart, CartError, CartLine, CartStore, CartTotals, OrderPayload};
pub use changes::{apply_change_event, Record};
pub use checkout::{CheckoutError, CheckoutRequest, CheckoutService};
pub use finance::{debt_report, debt_total, DebtSummary};
pub use manager::{CustomerHistory, DebtPayment, OrderError, OrderManager};
pub use models::{
    AuditMetadata, Customer, CustomerProfile, Order, OrderLine, OrderStatus, PaymentMethod,
    PaymentStatus,
};
pub use repository::{CustomerRepository, OrderFilter, OrderRepository, ProductRepository};
