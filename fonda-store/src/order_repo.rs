use async_trait::async_trait;
use fonda_order::{AuditMetadata, Order, OrderFilter, OrderLine, OrderRepository};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_name: String,
    phone: String,
    location: String,
    items: Value,
    total_amount: i64,
    payment_method: String,
    payment_status: String,
    status: String,
    is_monthly_account: bool,
    operation_code: Option<String>,
    audit: Option<Value>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let items: Vec<OrderLine> = serde_json::from_value(row.items)?;
        let audit = row
            .audit
            .map(serde_json::from_value::<AuditMetadata>)
            .transpose()?;

        Ok(Order {
            id: row.id,
            customer_name: row.customer_name,
            phone: row.phone,
            location: row.location,
            items,
            total_amount: row.total_amount,
            payment_method: row.payment_method.parse()?,
            payment_status: row.payment_status.parse()?,
            status: row.status.parse()?,
            is_monthly_account: row.is_monthly_account,
            operation_code: row.operation_code,
            audit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, customer_name, phone, location, items, total_amount, payment_method, \
     payment_status, status, is_monthly_account, operation_code, audit, created_at, updated_at";

const UPDATE_ORDER: &str = r#"
    UPDATE orders
    SET customer_name = $2, location = $3, items = $4, total_amount = $5,
        payment_method = $6, payment_status = $7, status = $8,
        is_monthly_account = $9, operation_code = $10, updated_at = $11
    WHERE id = $1
"#;

fn update_query(order: &Order) -> Result<Query<'_, Postgres, PgArguments>, serde_json::Error> {
    Ok(sqlx::query(UPDATE_ORDER)
        .bind(order.id)
        .bind(&order.customer_name)
        .bind(&order.location)
        .bind(serde_json::to_value(&order.items)?)
        .bind(order.total_amount)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(order.is_monthly_account)
        .bind(&order.operation_code)
        .bind(order.updated_at))
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn insert_order(&self, order: &Order) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let audit = order.audit.as_ref().map(serde_json::to_value).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_name, phone, location, items, total_amount, payment_method,
                                payment_status, status, is_monthly_account, operation_code, audit, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id)
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(&order.location)
        .bind(serde_json::to_value(&order.items)?)
        .bind(order.total_amount)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(order.is_monthly_account)
        .bind(&order.operation_code)
        .bind(audit)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM orders WHERE TRUE", ORDER_COLUMNS));

        if let Some(phone) = &filter.phone {
            query.push(" AND phone = ").push_bind(phone.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if !filter.payment_statuses.is_empty() {
            let statuses: Vec<String> = filter
                .payment_statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();
            query.push(" AND payment_status = ANY(").push_bind(statuses).push(")");
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query.build_query_as::<OrderRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_order(&self, order: &Order) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if update_query(order)?.execute(&self.pool).await?.rows_affected() == 0 {
            return Err(format!("order {} not found", order.id).into());
        }
        Ok(())
    }

    async fn update_orders(&self, orders: &[Order]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;
        for order in orders {
            if update_query(order)?.execute(&mut *tx).await?.rows_affected() == 0 {
                // dropping the transaction rolls it back
                return Err(format!("order {} not found", order.id).into());
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
