//! Typed service outcomes
//!
//! Every operation of the order pipeline resolves to an [`Outcome`]: either an
//! [`Accepted`] value carrying a typed payload, or a [`Rejection`] naming the
//! reason. [`Reply`] is the untyped `{status, message, data}` wire form used in
//! HTTP bodies and as the stored result of a job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::OrderStatus;

/// Result of a pipeline operation
pub type Outcome<T> = Result<Accepted<T>, Rejection>;

pub const ORDER_CREATED: &str = "Order created successfully!";
pub const ORDERS_LISTED: &str = "List of Orders!";

/// A successful outcome with its status code and payload
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

impl<T> Accepted<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 201,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> Accepted<T> {
    /// Converts into the wire form, serializing the payload
    pub fn into_reply(self) -> Reply {
        Reply {
            status: self.status,
            message: self.message,
            data: serde_json::to_value(&self.data).ok(),
        }
    }
}

/// Why an operation did not succeed
///
/// The display text of each variant is the exact message callers receive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("User or Product do not exist!")]
    MissingReference,

    #[error("User do not exist!")]
    UnknownUser,

    #[error("Product not found!")]
    ProductNotFound,

    #[error("Product not found in user cart!")]
    NotInCart,

    #[error("Product has already been ordered!")]
    AlreadyOrdered,

    #[error("Initial time must be before end time!")]
    InvalidTimeRange,

    #[error("Initial and end time must be valid timestamps!")]
    InvalidTimestamp,

    #[error("OrderId not found!")]
    MissingOrderId,

    #[error("Order not found!")]
    OrderNotFound,

    #[error("No order exist in this account!")]
    NoOrders,

    #[error("Order is no longer pending!")]
    NotPending { status: Option<OrderStatus> },

    /// The confirmation transaction was aborted
    #[error("Transaction failed!")]
    TransactionFailed(String),

    /// Storage was unavailable while creating an order
    #[error("Create Order Error")]
    Internal(String),
}

impl Rejection {
    /// HTTP-style status code of this rejection
    pub fn status(&self) -> u16 {
        match self {
            Rejection::InvalidTimeRange | Rejection::InvalidTimestamp => 400,
            Rejection::MissingReference
            | Rejection::UnknownUser
            | Rejection::NoOrders
            | Rejection::ProductNotFound
            | Rejection::NotInCart
            | Rejection::MissingOrderId
            | Rejection::OrderNotFound => 404,
            Rejection::AlreadyOrdered | Rejection::NotPending { .. } => 409,
            Rejection::TransactionFailed(_) | Rejection::Internal(_) => 500,
        }
    }

    /// Recognized business outcome rather than an infrastructure failure
    pub fn is_business(&self) -> bool {
        self.status() < 500
    }

    fn detail(&self) -> Option<serde_json::Value> {
        match self {
            Rejection::TransactionFailed(detail) | Rejection::Internal(detail) => {
                Some(serde_json::Value::String(detail.clone()))
            }
            Rejection::NotPending {
                status: Some(status),
            } => Some(serde_json::json!({ "status": status })),
            _ => None,
        }
    }
}

/// `{status, message, data?}` wire form of an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

impl From<Rejection> for Reply {
    fn from(rejection: Rejection) -> Self {
        Reply {
            status: rejection.status(),
            message: rejection.to_string(),
            data: rejection.detail(),
        }
    }
}

/// Converts any outcome into its wire form
pub fn to_reply<T: Serialize>(outcome: Outcome<T>) -> Reply {
    match outcome {
        Ok(accepted) => accepted.into_reply(),
        Err(rejection) => rejection.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(Rejection::MissingReference.status(), 404);
        assert_eq!(Rejection::ProductNotFound.status(), 404);
        assert_eq!(Rejection::NotInCart.status(), 404);
        assert_eq!(Rejection::AlreadyOrdered.status(), 409);
        assert_eq!(Rejection::InvalidTimeRange.status(), 400);
        assert_eq!(Rejection::MissingOrderId.status(), 404);
        assert_eq!(Rejection::OrderNotFound.status(), 404);
        assert_eq!(Rejection::NotPending { status: None }.status(), 409);
        assert_eq!(Rejection::TransactionFailed("x".into()).status(), 500);
        assert_eq!(Rejection::Internal("x".into()).status(), 500);
    }

    #[test]
    fn test_rejection_messages_are_exact() {
        assert_eq!(
            Rejection::MissingReference.to_string(),
            "User or Product do not exist!"
        );
        assert_eq!(
            Rejection::AlreadyOrdered.to_string(),
            "Product has already been ordered!"
        );
        assert_eq!(Rejection::MissingOrderId.to_string(), "OrderId not found!");
        assert_eq!(Rejection::OrderNotFound.to_string(), "Order not found!");
        assert_eq!(Rejection::UnknownUser.to_string(), "User do not exist!");
        assert_eq!(
            Rejection::NoOrders.to_string(),
            "No order exist in this account!"
        );
    }

    #[test]
    fn test_business_vs_infrastructure() {
        assert!(Rejection::OrderNotFound.is_business());
        assert!(!Rejection::TransactionFailed("commit".into()).is_business());
    }

    #[test]
    fn test_transaction_failure_reply_carries_detail() {
        let reply: Reply = Rejection::TransactionFailed("connection reset".into()).into();
        assert_eq!(reply.status, 500);
        assert_eq!(reply.message, "Transaction failed!");
        assert_eq!(reply.data, Some(serde_json::json!("connection reset")));
        assert!(reply.is_server_error());
    }

    #[test]
    fn test_accepted_into_reply() {
        let reply = to_reply(Ok(Accepted::created(ORDER_CREATED, vec![1, 2])));
        assert_eq!(reply.status, 201);
        assert!(reply.is_success());
        assert_eq!(reply.data, Some(serde_json::json!([1, 2])));

        let reply = to_reply::<()>(Err(Rejection::OrderNotFound));
        assert!(reply.is_client_error());
        assert_eq!(reply.data, None);
    }
}
