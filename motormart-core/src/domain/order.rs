//! Order domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::Choice;

/// A single rental or purchase of a listed vehicle
///
/// Created `Pending` by the submission service and flipped to `Confirmed`
/// exactly once by the confirmation worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub cart_id: Uuid,
    pub status: OrderStatus,
    pub choice: Choice,
    pub total_amount: f64,
    #[serde(flatten)]
    pub rental: Option<RentalWindow>,
    pub created_at: DateTime<Utc>,
}

/// Hour-of-day window of a rental order
///
/// `rent_time` is always `end_time - initial_time` and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalWindow {
    pub initial_time: i32,
    pub end_time: i32,
    pub rent_time: i32,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Confirmed" => Ok(OrderStatus::Confirmed),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("Lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_sell_order_serializes_without_rental_fields() {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            choice: Choice::Sell,
            total_amount: 1500.0,
            rental: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["choice"], "sell");
        assert_eq!(json["totalAmount"], 1500.0);
        assert!(json.get("rentTime").is_none());
    }

    #[test]
    fn test_rent_order_flattens_rental_window() {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            choice: Choice::Rent,
            total_amount: 300.0,
            rental: Some(RentalWindow {
                initial_time: 14,
                end_time: 17,
                rent_time: 3,
            }),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["initialTime"], 14);
        assert_eq!(json["endTime"], 17);
        assert_eq!(json["rentTime"], 3);
    }
}
