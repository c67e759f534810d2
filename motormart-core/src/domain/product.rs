//! Product domain types
//!
//! Products (listed vehicles) are managed outside the order pipeline; the
//! pipeline only reads them to price an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vehicle listed for sale or rent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    /// Vendor who listed the vehicle
    pub owner_id: Uuid,
    pub name: String,
    pub brand: String,
    pub choice: Choice,
    /// Sale price, or hourly rate for rentals
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// Whether a product is sold outright or rented by the hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Sell,
    Rent,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Sell => "sell",
            Choice::Rent => "rent",
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sell" => Ok(Choice::Sell),
            "rent" => Ok(Choice::Rent),
            other => Err(format!("unknown product choice: {}", other)),
        }
    }
}
