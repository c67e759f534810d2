//! Order DTOs

use serde::{Deserialize, Serialize};

use crate::domain::order::{Order, OrderStatus};

/// Body of an order submission
///
/// Timestamps are RFC 3339 strings and only matter for rental products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub initial_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Initial status; defaults to `Pending`
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Response body for single-order endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

/// Response body for order listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderList {
    pub message: String,
    #[serde(default)]
    pub data: Vec<Order>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_camel_case_fields() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"initialTime":"2023-07-07T14:00:00Z","endTime":"2023-07-07T16:30:00Z","status":"Pending"}"#,
        )
        .unwrap();

        assert_eq!(req.initial_time.as_deref(), Some("2023-07-07T14:00:00Z"));
        assert_eq!(req.end_time.as_deref(), Some("2023-07-07T16:30:00Z"));
        assert_eq!(req.status, Some(OrderStatus::Pending));
    }

    #[test]
    fn test_request_fields_are_optional() {
        let req: OrderRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, OrderRequest::default());
    }
}
