use async_trait::async_trait;
use fonda_catalog::{Category, OptionSet, Product};
use fonda_order::ProductRepository;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreProductRepository {
    pool: PgPool,
}

impl StoreProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price_cents: i64,
    category: String,
    is_available: bool,
    stock: Option<i32>,
    options: Option<Value>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category: Category = row.category.parse()?;
        let options = row
            .options
            .map(serde_json::from_value::<OptionSet>)
            .transpose()?;

        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            category,
            is_available: row.is_available,
            stock: row.stock,
            options,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, category, is_available, stock, options, created_at, updated_at";

fn options_json(product: &Product) -> Result<Option<Value>, serde_json::Error> {
    product.options.as_ref().map(serde_json::to_value).transpose()
}

#[async_trait]
impl ProductRepository for StoreProductRepository {
    async fn list_products(&self) -> Result<Vec<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products ORDER BY category, name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn create_product(&self, product: &Product) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, category, is_available, stock, options, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.category.as_str())
        .bind(product.is_available)
        .bind(product.stock)
        .bind(options_json(product)?)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price_cents = $4, category = $5,
                is_available = $6, stock = $7, options = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.category.as_str())
        .bind(product.is_available)
        .bind(product.stock)
        .bind(options_json(product)?)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_availability(
        &self,
        id: Uuid,
        is_available: bool,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query("UPDATE products SET is_available = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(is_available)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
