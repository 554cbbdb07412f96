use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::inventory::is_offered;
use crate::pricing::OptionSet;

/// Menu categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Set lunch: entrée and beverage included
    Menu,
    Diet,
    Plato,
    /// Free-standing item (drinks, sides)
    Extra,
}

impl Category {
    /// Storefront display order.
    pub const ALL: [Category; 4] = [
        Category::Menu,
        Category::Diet,
        Category::Plato,
        Category::Extra,
    ];

    /// Configurable categories always go through the options step before a
    /// line can be added, even when the option set has defaults.
    pub fn requires_options(&self) -> bool {
        !matches!(self, Category::Extra)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Menu => "menu",
            Category::Diet => "diet",
            Category::Plato => "plato",
            Category::Extra => "extra",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "menu" => Ok(Category::Menu),
            "diet" => Ok(Category::Diet),
            "plato" => Ok(Category::Plato),
            "extra" => Ok(Category::Extra),
            other => Err(ProductError::UnknownCategory(other.to_string())),
        }
    }
}

/// Core product structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: Category,
    pub is_available: bool,
    /// `None` means stock is not tracked.
    pub stock: Option<i32>,
    pub options: Option<OptionSet>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, price_cents: i64, category: Category) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price_cents,
            category,
            is_available: true,
            stock: None,
            options: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_options(mut self, options: OptionSet) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_stock(mut self, stock: i32) -> Self {
        self.stock = Some(stock);
        self
    }

    /// What the storefront must do when the customer taps this product.
    pub fn selection_flow(&self) -> SelectionFlow {
        if !is_offered(self) {
            return SelectionFlow::NotOffered;
        }
        if self.category.requires_options() {
            SelectionFlow::ConfigureOptions(self.options.clone().unwrap_or_default())
        } else {
            SelectionFlow::AddDirectly
        }
    }

    pub fn set_availability(&mut self, is_available: bool) {
        self.is_available = is_available;
        self.updated_at = Utc::now();
    }

    /// Check the admin-editable fields before a create or update is written.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::Invalid("name is required".to_string()));
        }
        if self.price_cents < 0 {
            return Err(ProductError::Invalid("price cannot be negative".to_string()));
        }
        if matches!(self.stock, Some(s) if s < 0) {
            return Err(ProductError::Invalid("stock cannot be negative".to_string()));
        }
        if let Some(options) = &self.options {
            if options.addons.iter().any(|a| a.price_cents < 0) {
                return Err(ProductError::Invalid(
                    "add-on prices cannot be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of tapping a product in the storefront.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "flow", content = "options", rename_all = "snake_case")]
pub enum SelectionFlow {
    AddDirectly,
    ConfigureOptions(OptionSet),
    NotOffered,
}

/// Product-related errors
#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid product: {0}")]
    Invalid(String),
}
