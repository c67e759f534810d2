//! Cart Repository

use async_trait::async_trait;
use motormart_core::domain::cart::CartItem;
use uuid::Uuid;

use super::PgStore;
use crate::error::Result;

/// Read access to cart entries
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Find the cart entry holding `product_id` for `user_id`
    async fn find_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<CartItem>>;
}

#[async_trait]
impl CartStore for PgStore {
    async fn find_item(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, product_id, quantity, created_at
            FROM carts
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| r.into()))
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        CartItem {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}
