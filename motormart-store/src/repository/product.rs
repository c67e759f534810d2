//! Product Repository

use async_trait::async_trait;
use motormart_core::domain::product::{Choice, Product};
use uuid::Uuid;

use super::PgStore;
use crate::error::{Result, StoreError};

/// Read access to listed products
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Find a product by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>>;
}

#[async_trait]
impl ProductStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, owner_id, name, brand, choice, amount, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Product::try_from).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    brand: String,
    choice: String,
    amount: f64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self> {
        let choice = row.choice.parse::<Choice>().map_err(StoreError::Corrupt)?;

        Ok(Product {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            brand: row.brand,
            choice,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}
