//! Order confirmation
//!
//! Moves a Pending order to Confirmed inside a majority read/write
//! transaction. Re-running on a confirmed order is a no-op that still
//! reports success; orders that left Pending any other way are refused.

use std::sync::Arc;

use async_trait::async_trait;
use motormart_core::domain::order::{Order, OrderStatus};
use motormart_core::outcome::{Accepted, ORDER_CREATED, Outcome, Rejection, Reply, to_reply};
use motormart_store::{OrderStore, OrderTransaction, StoreError, TxOptions};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::JobHandler;
use crate::context::JobContext;

const TX_COMPLETED: &str = "Transaction Completed!";
const TX_ERROR: &str = "Transaction Error!";

/// How an open confirmation transaction must end
enum Decision {
    Commit(Order),
    Abort(Rejection),
}

pub struct OrderConfirmation {
    orders: Arc<dyn OrderStore>,
}

impl OrderConfirmation {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Confirm the order identified by `order_id`
    pub async fn confirm(&self, order_id: &str, ctx: &JobContext) -> Outcome<Order> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(Rejection::MissingOrderId);
        }
        let Ok(id) = Uuid::parse_str(order_id) else {
            debug!("Payload {:?} is not an order id", order_id);
            return Err(Rejection::OrderNotFound);
        };

        let mut tx = match self.orders.begin(TxOptions::MAJORITY).await {
            Ok(tx) => tx,
            Err(e) => return Err(transaction_error(ctx, id, e)),
        };
        ctx.progress(10);
        ctx.progress(25);

        match decide(tx.as_mut(), id, ctx).await {
            Ok(Decision::Commit(order)) => {
                if let Err(e) = tx.commit().await {
                    return Err(transaction_error(ctx, id, e));
                }
                ctx.progress(100);
                ctx.log_info(TX_COMPLETED);
                info!("Order {} confirmed", id);
                Ok(Accepted::created(ORDER_CREATED, order))
            }
            Ok(Decision::Abort(rejection)) => {
                ctx.log_warning(rejection.to_string());
                if let Err(e) = tx.abort().await {
                    warn!("Failed to abort transaction for order {}: {}", id, e);
                }
                Err(rejection)
            }
            Err(e) => {
                if let Err(abort_err) = tx.abort().await {
                    warn!("Failed to abort transaction for order {}: {}", id, abort_err);
                }
                Err(transaction_error(ctx, id, e))
            }
        }
    }
}

async fn decide(
    tx: &mut dyn OrderTransaction,
    id: Uuid,
    ctx: &JobContext,
) -> Result<Decision, StoreError> {
    let Some(mut order) = tx.find_for_update(id).await? else {
        return Ok(Decision::Abort(Rejection::OrderNotFound));
    };
    ctx.progress(50);

    match order.status {
        OrderStatus::Confirmed => {
            debug!("Order {} already confirmed", id);
            Ok(Decision::Commit(order))
        }
        OrderStatus::Pending => {
            if !tx
                .update_status(id, OrderStatus::Pending, OrderStatus::Confirmed)
                .await?
            {
                return Ok(Decision::Abort(Rejection::NotPending { status: None }));
            }
            order.status = OrderStatus::Confirmed;
            ctx.progress(75);
            Ok(Decision::Commit(order))
        }
        status => Ok(Decision::Abort(Rejection::NotPending {
            status: Some(status),
        })),
    }
}

fn transaction_error(ctx: &JobContext, id: Uuid, err: StoreError) -> Rejection {
    ctx.log_error(TX_ERROR);
    warn!("Confirmation transaction for order {} failed: {}", id, err);
    Rejection::TransactionFailed(err.to_string())
}

/// Order id carried by a confirmation payload; `null` counts as absent
fn order_id(data: &JsonValue) -> String {
    match data {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl JobHandler for OrderConfirmation {
    async fn handle(&self, ctx: Arc<JobContext>) -> anyhow::Result<Reply> {
        let order_id = order_id(ctx.data());
        Ok(to_reply(self.confirm(&order_id, &ctx).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use motormart_core::domain::job::{Job, JobOptions};
    use motormart_core::domain::product::Choice;
    use motormart_store::{JobQueue, MemoryJobQueue, MemoryStore};

    async fn context(payload: JsonValue) -> Arc<JobContext> {
        let queue = MemoryJobQueue::new();
        let job: Job = queue
            .enqueue("orderQueue", payload, JobOptions::default())
            .await
            .unwrap();
        JobContext::new(&job)
    }

    async fn seeded(status: OrderStatus) -> (MemoryStore, Order) {
        let store = MemoryStore::new();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            status,
            choice: Choice::Sell,
            total_amount: 300.0,
            rental: None,
            created_at: Utc::now(),
        };
        store.insert(&order).await.unwrap();
        (store, order)
    }

    async fn stored_status(store: &MemoryStore, id: Uuid) -> OrderStatus {
        store.find_by_id(id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_confirms_pending_order() {
        let (store, order) = seeded(OrderStatus::Pending).await;
        let service = OrderConfirmation::new(Arc::new(store.clone()));
        let ctx = context(serde_json::json!(order.id.to_string())).await;

        let reply = service.handle(ctx.clone()).await.unwrap();

        assert_eq!(reply.status, 201);
        assert_eq!(reply.message, "Order created successfully!");
        assert_eq!(reply.data.unwrap()["status"], "Confirmed");
        assert_eq!(stored_status(&store, order.id).await, OrderStatus::Confirmed);
        assert_eq!(ctx.current_progress(), 100);
        let logs = ctx.drain_logs();
        assert_eq!(logs.last().unwrap().message, "Transaction Completed!");
    }

    #[tokio::test]
    async fn test_confirming_twice_is_idempotent() {
        let (store, order) = seeded(OrderStatus::Pending).await;
        let service = OrderConfirmation::new(Arc::new(store.clone()));
        let ctx = context(serde_json::json!(order.id.to_string())).await;

        service.confirm(&order.id.to_string(), &ctx).await.unwrap();
        let writes = store.write_count();
        let second = service.confirm(&order.id.to_string(), &ctx).await.unwrap();

        assert_eq!(second.status, 201);
        assert_eq!(second.data.status, OrderStatus::Confirmed);
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_unknown_order_writes_nothing() {
        let (store, _) = seeded(OrderStatus::Pending).await;
        let service = OrderConfirmation::new(Arc::new(store.clone()));
        let ctx = context(serde_json::json!(null)).await;
        let writes = store.write_count();

        let unknown = service.confirm(&Uuid::new_v4().to_string(), &ctx).await;
        assert_eq!(unknown.unwrap_err(), Rejection::OrderNotFound);

        let malformed = service.confirm("not-an-id", &ctx).await;
        assert_eq!(malformed.unwrap_err(), Rejection::OrderNotFound);

        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_missing_order_id() {
        let (store, _) = seeded(OrderStatus::Pending).await;
        let service = OrderConfirmation::new(Arc::new(store));

        for payload in [serde_json::json!(null), serde_json::json!("  ")] {
            let reply = service.handle(context(payload).await).await.unwrap();
            assert_eq!(reply.status, 404);
            assert_eq!(reply.message, "OrderId not found!");
        }
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_order_pending() {
        let (store, order) = seeded(OrderStatus::Pending).await;
        let service = OrderConfirmation::new(Arc::new(store.clone()));
        let ctx = context(serde_json::json!(order.id.to_string())).await;
        store.fail_next_commit();

        let reply = service.handle(ctx.clone()).await.unwrap();

        assert_eq!(reply.status, 500);
        assert_eq!(reply.message, "Transaction failed!");
        assert!(reply.data.is_some());
        assert_eq!(stored_status(&store, order.id).await, OrderStatus::Pending);
        assert!(ctx.current_progress() < 100);
        let logs = ctx.drain_logs();
        assert_eq!(logs.last().unwrap().message, "Transaction Error!");
    }

    #[tokio::test]
    async fn test_unavailable_store_is_transaction_failure() {
        let (store, order) = seeded(OrderStatus::Pending).await;
        let service = OrderConfirmation::new(Arc::new(store.clone()));
        let ctx = context(serde_json::json!(order.id.to_string())).await;
        store.set_unavailable(true);

        let rejection = service
            .confirm(&order.id.to_string(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(rejection, Rejection::TransactionFailed(_)));
    }

    #[tokio::test]
    async fn test_cancelled_order_is_not_confirmed() {
        for status in [
            OrderStatus::Cancelled,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let (store, order) = seeded(status).await;
            let service = OrderConfirmation::new(Arc::new(store.clone()));
            let ctx = context(serde_json::json!(order.id.to_string())).await;

            let reply = service.handle(ctx).await.unwrap();

            assert_eq!(reply.status, 409);
            assert_eq!(reply.message, "Order is no longer pending!");
            assert_eq!(stored_status(&store, order.id).await, status);
        }
    }
}
