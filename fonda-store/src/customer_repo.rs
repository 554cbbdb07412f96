use async_trait::async_trait;
use fonda_order::{Customer, CustomerProfile, CustomerRepository};
use sqlx::PgPool;

pub struct StoreCustomerRepository {
    pool: PgPool,
}

impl StoreCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    phone: String,
    name: String,
    location: String,
    dni: Option<String>,
    is_blacklisted: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            phone: row.phone,
            name: row.name,
            location: row.location,
            dni: row.dni,
            is_blacklisted: row.is_blacklisted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const RETURNING: &str = "RETURNING phone, name, location, dni, is_blacklisted, created_at, updated_at";

#[async_trait]
impl CustomerRepository for StoreCustomerRepository {
    async fn get_customer(
        &self,
        phone: &str,
    ) -> Result<Option<Customer>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT phone, name, location, dni, is_blacklisted, created_at, updated_at FROM customers WHERE phone = $1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    async fn upsert_customer(
        &self,
        profile: &CustomerProfile,
    ) -> Result<Customer, Box<dyn std::error::Error + Send + Sync>> {
        // is_blacklisted is left out of the update set on purpose
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            INSERT INTO customers (phone, name, location, dni)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (phone) DO UPDATE
            SET name = EXCLUDED.name,
                location = EXCLUDED.location,
                dni = COALESCE(EXCLUDED.dni, customers.dni),
                updated_at = NOW()
            {}
            "#,
            RETURNING
        ))
        .bind(&profile.phone)
        .bind(&profile.name)
        .bind(&profile.location)
        .bind(&profile.dni)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn set_blacklisted(
        &self,
        phone: &str,
        blacklisted: bool,
    ) -> Result<Customer, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            INSERT INTO customers (phone, is_blacklisted)
            VALUES ($1, $2)
            ON CONFLICT (phone) DO UPDATE
            SET is_blacklisted = EXCLUDED.is_blacklisted, updated_at = NOW()
            {}
            "#,
            RETURNING
        ))
        .bind(phone)
        .bind(blacklisted)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
