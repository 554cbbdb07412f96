pub mod inventory;
pub mod pricing;
pub mod product;

pub use inventory::{build_menu, is_offered, MenuSection};
pub use pricing::{AddOn, OptionSelection, OptionSet, PricingError, SelectionRequest};
pub use product::{Category, Product, ProductError, SelectionFlow};
