use async_trait::async_trait;
use fonda_catalog::pricing::{effective_unit_price, resolve_selection};
use fonda_catalog::{is_offered, Category, OptionSelection, PricingError, Product, SelectionRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::OrderLine;

/// One distinct (product, option selection) entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub key: String,
    pub product_id: Uuid,
    pub name: String,
    pub category: Category,
    pub quantity: u32,
    /// Base price plus add-ons, fixed when the line was created.
    pub unit_price: i64,
    pub options: Option<OptionSelection>,
}

impl CartLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartTotals {
    pub item_count: u32,
    pub total_price: i64,
}

/// Submission snapshot of a cart. Owns copies of everything it needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPayload {
    pub lines: Vec<OrderLine>,
    pub total: i64,
}

/// Shopping cart keyed by line identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    lines: BTreeMap<String, CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Product id alone when nothing was chosen, otherwise product id followed
    /// by the canonical form of the selection.
    pub fn line_key(product_id: Uuid, options: Option<&OptionSelection>) -> String {
        match options {
            Some(selection) if !selection.is_empty() => {
                format!("{}{}", product_id, selection.canonical_key())
            }
            _ => product_id.to_string(),
        }
    }

    /// Add one unit. Identical selections stack on the existing line.
    pub fn add_to_cart(&mut self, product: &Product, options: Option<OptionSelection>) -> &CartLine {
        let options = options.filter(|o| !o.is_empty());
        let key = Self::line_key(product.id, options.as_ref());

        let line = self.lines.entry(key.clone()).or_insert_with(|| CartLine {
            key,
            product_id: product.id,
            name: product.name.clone(),
            category: product.category,
            quantity: 0,
            unit_price: effective_unit_price(product, options.as_ref()),
            options,
        });
        line.quantity += 1;
        line
    }

    /// Storefront entry point: checks the product is offered, enforces the
    /// options step for configurable categories and prices add-ons from the
    /// catalog before adding.
    pub fn add_selection(
        &mut self,
        product: &Product,
        request: Option<&SelectionRequest>,
    ) -> Result<&CartLine, CartError> {
        if !is_offered(product) {
            return Err(CartError::NotOffered(product.name.clone()));
        }

        let selection = match request {
            Some(request) => Some(resolve_selection(product, request)?),
            None if product.category.requires_options() => {
                return Err(CartError::ConfigurationRequired(product.name.clone()));
            }
            None => None,
        };

        Ok(self.add_to_cart(product, selection))
    }

    /// Remove one unit; the line goes away with its last unit. Returns the
    /// quantity left on the line (0 when removed or never present).
    pub fn remove_from_cart(&mut self, key: &str) -> u32 {
        let Some(line) = self.lines.get_mut(key) else {
            return 0;
        };
        line.quantity = line.quantity.saturating_sub(1);
        let left = line.quantity;
        if left == 0 {
            self.lines.remove(key);
        }
        left
    }

    /// Units of a product across every selection of it.
    pub fn get_quantity(&self, product_id: Uuid) -> u32 {
        self.lines
            .values()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    pub fn compute_totals(&self) -> CartTotals {
        self.lines.values().fold(
            CartTotals {
                item_count: 0,
                total_price: 0,
            },
            |acc, line| CartTotals {
                item_count: acc.item_count + line.quantity,
                total_price: acc.total_price + line.line_total(),
            },
        )
    }

    pub fn to_order_payload(&self) -> OrderPayload {
        let lines: Vec<OrderLine> = self
            .lines
            .values()
            .map(|line| OrderLine {
                product_id: Some(line.product_id),
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                options: line.options.clone(),
            })
            .collect();
        let total = lines.iter().map(OrderLine::line_total).sum();
        OrderPayload { lines, total }
    }

    pub fn line(&self, key: &str) -> Option<&CartLine> {
        self.lines.get(key)
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Where carts live between requests, keyed by an opaque cart id.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns an empty cart when none is stored under `cart_id`.
    async fn load(&self, cart_id: &str) -> Result<Cart, Box<dyn std::error::Error + Send + Sync>>;

    async fn save(
        &self,
        cart_id: &str,
        cart: &Cart,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn clear(&self, cart_id: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Product not offered: {0}")]
    NotOffered(String),

    #[error("Options must be chosen before adding {0}")]
    ConfigurationRequired(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}
