//! Order Service
//!
//! Validates and persists order submissions, then hands confirmation off to
//! the order queue without waiting for it.

use std::sync::Arc;

use motormart_core::domain::order::{Order, OrderStatus};
use motormart_core::dto::order::OrderRequest;
use motormart_core::outcome::{Accepted, ORDER_CREATED, ORDERS_LISTED, Outcome, Rejection};
use motormart_core::pricing;
use motormart_store::{CartStore, OrderStore, ProductStore, Queue, StoreError};
use uuid::Uuid;

pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    carts: Arc<dyn CartStore>,
    queue: Queue,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
        carts: Arc<dyn CartStore>,
        queue: Queue,
    ) -> Self {
        Self {
            orders,
            products,
            carts,
            queue,
        }
    }

    /// Create a Pending order for a product in the user's cart and enqueue its confirmation
    pub async fn submit(
        &self,
        user_id: Option<Uuid>,
        product_id: Option<Uuid>,
        request: OrderRequest,
    ) -> Outcome<Order> {
        let (Some(user_id), Some(product_id)) = (user_id, product_id) else {
            return Err(Rejection::MissingReference);
        };

        let product = self
            .products
            .find_by_id(product_id)
            .await
            .map_err(internal)?
            .ok_or(Rejection::ProductNotFound)?;

        let cart_item = self
            .carts
            .find_item(user_id, product_id)
            .await
            .map_err(internal)?
            .ok_or(Rejection::NotInCart)?;

        let existing = self
            .orders
            .find_by_user_and_product(user_id, product_id)
            .await
            .map_err(internal)?;
        if existing.is_some() {
            return Err(Rejection::AlreadyOrdered);
        }

        let quote = pricing::quote(&product, &request)?;

        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            cart_id: cart_item.id,
            status: request.status.unwrap_or(OrderStatus::Pending),
            choice: product.choice,
            total_amount: quote.total_amount,
            rental: quote.rental,
            created_at: chrono::Utc::now(),
        };

        self.orders.insert(&order).await.map_err(|e| {
            if e.is_conflict() {
                Rejection::AlreadyOrdered
            } else {
                internal(e)
            }
        })?;

        let job = self
            .queue
            .add(serde_json::Value::String(order.id.to_string()))
            .await
            .map_err(internal)?;

        tracing::info!(
            "Order {} created for user {} (confirmation job {})",
            order.id,
            user_id,
            job.id
        );

        Ok(Accepted::created(ORDER_CREATED, order))
    }

    /// Get one order
    pub async fn get(&self, id: Uuid) -> Outcome<Order> {
        let order = self
            .orders
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or(Rejection::OrderNotFound)?;

        Ok(Accepted::ok("Order found", order))
    }

    /// List a user's orders; an account without orders is a 404
    pub async fn list(&self, user_id: Option<Uuid>) -> Outcome<Vec<Order>> {
        let user_id = user_id.ok_or(Rejection::UnknownUser)?;
        let orders = self.orders.list_by_user(user_id).await.map_err(internal)?;
        if orders.is_empty() {
            return Err(Rejection::NoOrders);
        }

        Ok(Accepted::ok(ORDERS_LISTED, orders))
    }
}

fn internal(err: StoreError) -> Rejection {
    tracing::error!("Order storage error: {}", err);
    Rejection::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use motormart_core::domain::cart::CartItem;
    use motormart_core::domain::job::JobStatus;
    use motormart_core::domain::product::{Choice, Product};
    use motormart_store::{JobQueue, MemoryJobQueue, MemoryStore};

    struct Fixture {
        store: MemoryStore,
        jobs: MemoryJobQueue,
        service: OrderService,
        user_id: Uuid,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let jobs = MemoryJobQueue::new();
        let queue = Queue::new("orderQueue", Arc::new(jobs.clone()));
        let service = OrderService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            queue,
        );

        Fixture {
            store,
            jobs,
            service,
            user_id: Uuid::new_v4(),
        }
    }

    impl Fixture {
        async fn listed(&self, choice: Choice, amount: f64, in_cart: bool) -> Uuid {
            let product = Product {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                name: "Model T".to_string(),
                brand: "Ford".to_string(),
                choice,
                amount,
                created_at: chrono::Utc::now(),
            };
            let product_id = product.id;
            self.store.insert_product(product).await;

            if in_cart {
                self.store
                    .insert_cart_item(CartItem {
                        id: Uuid::new_v4(),
                        user_id: self.user_id,
                        product_id,
                        quantity: 1,
                        created_at: chrono::Utc::now(),
                    })
                    .await;
            }
            product_id
        }

        async fn order_count(&self) -> usize {
            self.store.list_by_user(self.user_id).await.unwrap().len()
        }
    }

    fn rent(initial: &str, end: &str) -> OrderRequest {
        OrderRequest {
            initial_time: Some(initial.to_string()),
            end_time: Some(end.to_string()),
            status: None,
        }
    }

    #[tokio::test]
    async fn test_rent_submission_scenario() {
        let f = fixture();
        let product_id = f.listed(Choice::Rent, 100.0, true).await;

        let accepted = f
            .service
            .submit(
                Some(f.user_id),
                Some(product_id),
                rent("2023-07-07T14:00:00Z", "2023-07-07T16:30:00Z"),
            )
            .await
            .unwrap();

        assert_eq!(accepted.status, 201);
        assert_eq!(accepted.message, "Order created successfully!");
        let order = accepted.data;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 300.0);
        let rental = order.rental.unwrap();
        assert_eq!(
            (rental.initial_time, rental.end_time, rental.rent_time),
            (14, 17, 3)
        );

        let jobs = f.jobs.list("orderQueue", None).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Waiting);
        assert_eq!(jobs[0].payload, serde_json::json!(order.id.to_string()));
        assert_eq!(f.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_sell_submission_uses_product_amount() {
        let f = fixture();
        let product_id = f.listed(Choice::Sell, 25_000.0, true).await;

        let order = f
            .service
            .submit(Some(f.user_id), Some(product_id), OrderRequest::default())
            .await
            .unwrap()
            .data;

        assert_eq!(order.total_amount, 25_000.0);
        assert!(order.rental.is_none());
        assert_eq!(order.choice, Choice::Sell);
    }

    #[tokio::test]
    async fn test_submitted_status_overrides_pending() {
        let f = fixture();
        let product_id = f.listed(Choice::Sell, 10.0, true).await;
        let request = OrderRequest {
            status: Some(OrderStatus::Confirmed),
            ..OrderRequest::default()
        };

        let order = f
            .service
            .submit(Some(f.user_id), Some(product_id), request)
            .await
            .unwrap()
            .data;

        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_conflict() {
        let f = fixture();
        let product_id = f.listed(Choice::Sell, 10.0, true).await;

        f.service
            .submit(Some(f.user_id), Some(product_id), OrderRequest::default())
            .await
            .unwrap();
        let second = f
            .service
            .submit(Some(f.user_id), Some(product_id), OrderRequest::default())
            .await;

        assert_eq!(second.unwrap_err(), Rejection::AlreadyOrdered);
        assert_eq!(f.order_count().await, 1);
        assert_eq!(f.jobs.list("orderQueue", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_references_are_rejected() {
        let f = fixture();
        let product_id = f.listed(Choice::Sell, 10.0, true).await;

        let cases = [
            (None, Some(product_id), Rejection::MissingReference),
            (Some(f.user_id), None, Rejection::MissingReference),
            (Some(f.user_id), Some(Uuid::new_v4()), Rejection::ProductNotFound),
        ];
        for (user_id, product_id, expected) in cases {
            let result = f
                .service
                .submit(user_id, product_id, OrderRequest::default())
                .await;
            assert_eq!(result.unwrap_err(), expected);
        }

        let not_in_cart = f.listed(Choice::Sell, 10.0, false).await;
        let result = f
            .service
            .submit(Some(f.user_id), Some(not_in_cart), OrderRequest::default())
            .await;
        assert_eq!(result.unwrap_err(), Rejection::NotInCart);

        assert_eq!(f.order_count().await, 0);
        assert!(f.jobs.list("orderQueue", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rent_window_creates_nothing() {
        let f = fixture();
        let product_id = f.listed(Choice::Rent, 100.0, true).await;

        let inverted = f
            .service
            .submit(
                Some(f.user_id),
                Some(product_id),
                rent("2023-07-07T16:00:00Z", "2023-07-07T14:00:00Z"),
            )
            .await;
        assert_eq!(inverted.unwrap_err(), Rejection::InvalidTimeRange);

        let missing = f
            .service
            .submit(Some(f.user_id), Some(product_id), OrderRequest::default())
            .await;
        assert_eq!(missing.unwrap_err(), Rejection::InvalidTimestamp);

        assert_eq!(f.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_create_order_error() {
        let f = fixture();
        let product_id = f.listed(Choice::Sell, 10.0, true).await;
        f.store.set_unavailable(true);

        let rejection = f
            .service
            .submit(Some(f.user_id), Some(product_id), OrderRequest::default())
            .await
            .unwrap_err();

        assert_eq!(rejection.status(), 500);
        assert_eq!(rejection.to_string(), "Create Order Error");
    }

    #[tokio::test]
    async fn test_enqueue_failure_is_create_order_error() {
        let f = fixture();
        let product_id = f.listed(Choice::Sell, 10.0, true).await;
        f.jobs.reject_enqueues(true);

        let rejection = f
            .service
            .submit(Some(f.user_id), Some(product_id), OrderRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(rejection, Rejection::Internal(_)));
    }

    #[tokio::test]
    async fn test_get_and_list_orders() {
        let f = fixture();
        let product_id = f.listed(Choice::Sell, 10.0, true).await;
        let order = f
            .service
            .submit(Some(f.user_id), Some(product_id), OrderRequest::default())
            .await
            .unwrap()
            .data;

        let found = f.service.get(order.id).await.unwrap();
        assert_eq!(found.status, 200);
        assert_eq!(found.data.id, order.id);

        assert_eq!(
            f.service.get(Uuid::new_v4()).await.unwrap_err(),
            Rejection::OrderNotFound
        );

        let listed = f.service.list(Some(f.user_id)).await.unwrap();
        assert_eq!(listed.status, 200);
        assert_eq!(listed.message, "List of Orders!");
        assert_eq!(listed.data.len(), 1);
    }

    #[tokio::test]
    async fn test_list_without_user_or_orders() {
        let f = fixture();

        let no_user = f.service.list(None).await.unwrap_err();
        assert_eq!(no_user, Rejection::UnknownUser);
        assert_eq!(no_user.status(), 404);
        assert_eq!(no_user.to_string(), "User do not exist!");

        let empty = f.service.list(Some(f.user_id)).await.unwrap_err();
        assert_eq!(empty, Rejection::NoOrders);
        assert_eq!(empty.status(), 404);
        assert_eq!(empty.to_string(), "No order exist in this account!");
    }
}
