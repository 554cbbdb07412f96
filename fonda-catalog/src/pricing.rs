use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::product::Product;

/// A priced extra that can be stacked on a configurable product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddOn {
    pub name: String,
    pub price_cents: i64,
}

impl AddOn {
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            name: name.into(),
            price_cents,
        }
    }
}

/// Choices a product offers: included entrées and beverages, priced add-ons.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionSet {
    #[serde(default)]
    pub entrees: Vec<String>,
    #[serde(default)]
    pub beverages: Vec<String>,
    #[serde(default)]
    pub addons: Vec<AddOn>,
}

/// What the customer asked for, by name. Prices are never taken from here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionRequest {
    #[serde(default)]
    pub entree: Option<String>,
    #[serde(default)]
    pub beverage: Option<String>,
    #[serde(default)]
    pub addons: Vec<String>,
}

/// Resolved option values stored on a cart line and frozen into the order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionSelection {
    #[serde(default)]
    pub entree: Option<String>,
    #[serde(default)]
    pub beverage: Option<String>,
    #[serde(default)]
    pub addons: Vec<AddOn>,
}

impl OptionSelection {
    pub fn is_empty(&self) -> bool {
        self.entree.is_none() && self.beverage.is_none() && self.addons.is_empty()
    }

    pub fn addons_total(&self) -> i64 {
        self.addons.iter().map(|a| a.price_cents).sum()
    }

    /// Stable textual form used in cart-line keys.
    ///
    /// Object keys are sorted at every level so two equal selections always
    /// produce the same string. Add-on order is kept as chosen.
    pub fn canonical_key(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        canonical_json(&value)
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        Value::String(k.clone()),
                        canonical_json(&map[k.as_str()])
                    )
                })
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl OptionSet {
    /// Turn a by-name request into a priced selection, rejecting anything the
    /// product does not offer.
    pub fn resolve(&self, request: &SelectionRequest) -> Result<OptionSelection, PricingError> {
        let entree = match non_blank(&request.entree) {
            Some(name) => Some(
                self.entrees
                    .iter()
                    .find(|e| e.as_str() == name)
                    .cloned()
                    .ok_or_else(|| PricingError::UnknownEntree(name.to_string()))?,
            ),
            None => None,
        };

        let beverage = match non_blank(&request.beverage) {
            Some(name) => Some(
                self.beverages
                    .iter()
                    .find(|b| b.as_str() == name)
                    .cloned()
                    .ok_or_else(|| PricingError::UnknownBeverage(name.to_string()))?,
            ),
            None => None,
        };

        let addons = request
            .addons
            .iter()
            .map(|name| {
                self.addons
                    .iter()
                    .find(|a| a.name == name.trim())
                    .cloned()
                    .ok_or_else(|| PricingError::UnknownAddOn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OptionSelection {
            entree,
            beverage,
            addons,
        })
    }
}

/// Resolve a selection request against a product's option set.
pub fn resolve_selection(
    product: &Product,
    request: &SelectionRequest,
) -> Result<OptionSelection, PricingError> {
    match &product.options {
        Some(options) => options.resolve(request),
        None => {
            let blank = non_blank(&request.entree).is_none()
                && non_blank(&request.beverage).is_none()
                && request.addons.is_empty();
            if blank {
                Ok(OptionSelection::default())
            } else {
                Err(PricingError::OptionsNotOffered(product.name.clone()))
            }
        }
    }
}

/// Base price plus every chosen add-on.
pub fn effective_unit_price(product: &Product, selection: Option<&OptionSelection>) -> i64 {
    product.price_cents + selection.map(OptionSelection::addons_total).unwrap_or(0)
}

/// `4000` -> `"40.00"`
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Unknown entrée: {0}")]
    UnknownEntree(String),

    #[error("Unknown beverage: {0}")]
    UnknownBeverage(String),

    #[error("Unknown add-on: {0}")]
    UnknownAddOn(String),

    #[error("Product has no configurable options: {0}")]
    OptionsNotOffered(String),
}
