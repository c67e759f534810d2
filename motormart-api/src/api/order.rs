//! Order API Handlers
//!
//! Submission and read endpoints. Bodies carry the outcome message next to
//! the order, and the HTTP status is the outcome's status.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use motormart_core::domain::order::Order;
use motormart_core::dto::order::{OrderList, OrderRequest, OrderResponse};
use motormart_core::outcome::{Outcome, Rejection};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

pub const USER_ID_HEADER: &str = "x-user-id";

/// POST /order/{product_id}
/// Submit an order for a product in the caller's cart
pub async fn submit_order(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let request = parse_request(&body)?;
    let user_id = user_id(&headers);
    let product_id = Uuid::parse_str(product_id.trim()).ok();

    tracing::info!(
        "Submitting order: user={:?}, product={:?}",
        user_id,
        product_id
    );

    let outcome = state.orders.submit(user_id, product_id, request).await;
    if let Err(rejection) = &outcome {
        tracing::debug!("Order submission rejected: {}", rejection);
    }

    Ok(order_response(outcome))
}

/// GET /order/{id}
/// Get an order by ID; an id that is not a UUID is an unknown order
pub async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    tracing::debug!("Getting order: {}", id);

    let outcome = match Uuid::parse_str(id.trim()) {
        Ok(id) => state.orders.get(id).await,
        Err(_) => Err(Rejection::OrderNotFound),
    };
    order_response(outcome)
}

/// GET /order
/// List orders of the calling user
pub async fn list_orders(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = user_id(&headers);
    tracing::debug!("Listing orders for user: {:?}", user_id);

    match state.orders.list(user_id).await {
        Ok(accepted) => (
            status_code(accepted.status),
            Json(OrderList {
                message: accepted.message,
                data: accepted.data,
            }),
        )
            .into_response(),
        Err(rejection) => (
            status_code(rejection.status()),
            Json(OrderList {
                message: rejection.to_string(),
                data: Vec::new(),
            }),
        )
            .into_response(),
    }
}

fn user_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

/// An empty body is an empty request
fn parse_request(body: &[u8]) -> ApiResult<OrderRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(OrderRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order body: {}", e)))
}

fn order_response(outcome: Outcome<Order>) -> Response {
    let (status, body) = match outcome {
        Ok(accepted) => (
            accepted.status,
            OrderResponse {
                message: accepted.message,
                order: Some(accepted.data),
            },
        ),
        Err(rejection) => (rejection.status(), rejected(&rejection)),
    };

    (status_code(status), Json(body)).into_response()
}

fn rejected(rejection: &Rejection) -> OrderResponse {
    OrderResponse {
        message: rejection.to_string(),
        order: None,
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::HeaderValue;
    use motormart_store::{MemoryJobQueue, MemoryStore, Queue};

    use crate::service::{JobService, OrderService};

    fn state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        let jobs = Arc::new(MemoryJobQueue::new());
        AppState {
            orders: Arc::new(OrderService::new(
                store.clone(),
                store.clone(),
                store,
                Queue::new("orderQueue", jobs.clone()),
            )),
            jobs: Arc::new(JobService::new(jobs)),
        }
    }

    async fn body(response: Response) -> OrderResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_order_with_malformed_id_is_not_found() {
        let response = get_order(State(state()), Path("not-a-uuid".to_string())).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body(response).await;
        assert_eq!(body.message, "Order not found!");
        assert!(body.order.is_none());
    }

    #[tokio::test]
    async fn test_get_order_with_unknown_id_is_not_found() {
        let response = get_order(State(state()), Path(Uuid::new_v4().to_string())).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await.message, "Order not found!");
    }

    #[test]
    fn test_user_id_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        assert_eq!(user_id(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(user_id(&headers), None);

        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(user_id(&headers), Some(id));
    }

    #[test]
    fn test_empty_body_is_default_request() {
        assert_eq!(parse_request(b"").unwrap(), OrderRequest::default());
        assert_eq!(parse_request(b"  \n").unwrap(), OrderRequest::default());
        assert!(matches!(
            parse_request(b"{not json"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_rejection_maps_to_http_status() {
        let response = order_response(Err(Rejection::AlreadyOrdered));
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = order_response(Err(Rejection::InvalidTimeRange));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
