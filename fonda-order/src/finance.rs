use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Order;

/// Outstanding balance of one phone number
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DebtSummary {
    pub phone: String,
    pub customer_name: String,
    pub outstanding_orders: usize,
    pub total: i64,
}

/// Sum of unsettled order totals (on account or unpaid) for `phone`.
///
/// Always computed from the orders passed in, never from a stored counter.
pub fn debt_total(orders: &[Order], phone: &str) -> i64 {
    orders
        .iter()
        .filter(|o| o.phone == phone && o.payment_status.is_outstanding())
        .map(|o| o.total_amount)
        .sum()
}

/// Every phone with outstanding debt, largest balance first.
///
/// The name shown is the one on the most recent outstanding order.
pub fn debt_report(orders: &[Order]) -> Vec<DebtSummary> {
    let mut by_phone: BTreeMap<&str, (DebtSummary, chrono::DateTime<chrono::Utc>)> = BTreeMap::new();

    for order in orders.iter().filter(|o| o.payment_status.is_outstanding()) {
        let entry = by_phone.entry(order.phone.as_str()).or_insert_with(|| {
            (
                DebtSummary {
                    phone: order.phone.clone(),
                    customer_name: order.customer_name.clone(),
                    outstanding_orders: 0,
                    total: 0,
                },
                order.created_at,
            )
        });
        entry.0.outstanding_orders += 1;
        entry.0.total += order.total_amount;
        if order.created_at > entry.1 {
            entry.0.customer_name = order.customer_name.clone();
            entry.1 = order.created_at;
        }
    }

    let mut report: Vec<DebtSummary> = by_phone.into_values().map(|(summary, _)| summary).collect();
    report.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.phone.cmp(&b.phone)));
    report
}
