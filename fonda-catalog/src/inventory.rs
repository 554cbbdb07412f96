use serde::Serialize;

use crate::product::{Category, Product};

/// A product can be picked only when the admin has it switched on and its
/// stock, when tracked, is not exactly zero.
pub fn is_offered(product: &Product) -> bool {
    product.is_available && product.stock != Some(0)
}

/// One storefront section.
#[derive(Debug, Clone, Serialize)]
pub struct MenuSection {
    pub category: Category,
    pub products: Vec<Product>,
}

/// Group the offered products by category for the storefront, optionally
/// narrowed to one category. Sections follow [`Category::ALL`], products are
/// sorted by name, and empty sections are dropped.
pub fn build_menu(products: &[Product], filter: Option<Category>) -> Vec<MenuSection> {
    Category::ALL
        .iter()
        .filter(|c| filter.map_or(true, |f| f == **c))
        .filter_map(|category| {
            let mut items: Vec<Product> = products
                .iter()
                .filter(|p| p.category == *category && is_offered(p))
                .cloned()
                .collect();
            if items.is_empty() {
                return None;
            }
            items.sort_by(|a, b| a.name.cmp(&b.name));
            Some(MenuSection {
                category: *category,
                products: items,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        let mut hidden = Product::new("Tallarines", 1400, Category::Plato);
        hidden.set_availability(false);
        vec![
            Product::new("Menú ejecutivo", 1500, Category::Menu),
            Product::new("Ají de gallina", 1600, Category::Plato),
            hidden,
            Product::new("Arroz chaufa", 1500, Category::Plato),
            Product::new("Inca Kola", 400, Category::Extra).with_stock(0),
            Product::new("Ensalada", 1200, Category::Diet).with_stock(3),
        ]
    }

    #[test]
    fn test_availability_rules() {
        let product = Product::new("Agua", 200, Category::Extra);
        assert!(is_offered(&product));
        assert!(is_offered(&product.clone().with_stock(2)));
        assert!(!is_offered(&product.clone().with_stock(0)));

        let mut off = product;
        off.set_availability(false);
        assert!(!is_offered(&off));
    }

    #[test]
    fn test_menu_groups_and_filters() {
        let menu = build_menu(&catalog(), None);
        let categories: Vec<Category> = menu.iter().map(|s| s.category).collect();
        assert_eq!(categories, vec![Category::Menu, Category::Diet, Category::Plato]);

        let platos = &menu[2].products;
        let names: Vec<&str> = platos.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ají de gallina", "Arroz chaufa"]);
    }

    #[test]
    fn test_menu_category_filter() {
        let menu = build_menu(&catalog(), Some(Category::Diet));
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].products[0].name, "Ensalada");

        assert!(build_menu(&catalog(), Some(Category::Extra)).is_empty());
    }
}
