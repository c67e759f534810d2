//! Order pricing
//!
//! Sell orders cost the product amount. Rent orders cost the hourly amount times
//! the number of whole hours between the start and end hour of day, where each
//! timestamp is rounded up to the next hour when it has minutes past the hour.

use chrono::{DateTime, Timelike, Utc};

use crate::domain::order::RentalWindow;
use crate::domain::product::{Choice, Product};
use crate::dto::order::OrderRequest;
use crate::outcome::Rejection;

/// Price of an order and, for rentals, its hour window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub total_amount: f64,
    pub rental: Option<RentalWindow>,
}

/// Computes the total for ordering `product` with the submitted request
pub fn quote(product: &Product, request: &OrderRequest) -> Result<Quote, Rejection> {
    match product.choice {
        Choice::Sell => Ok(Quote {
            total_amount: product.amount,
            rental: None,
        }),
        Choice::Rent => {
            let initial_time = hour_of_day(parse_timestamp(request.initial_time.as_deref())?);
            let end_time = hour_of_day(parse_timestamp(request.end_time.as_deref())?);

            if initial_time >= end_time {
                return Err(Rejection::InvalidTimeRange);
            }

            let rent_time = end_time - initial_time;
            Ok(Quote {
                total_amount: f64::from(rent_time) * product.amount,
                rental: Some(RentalWindow {
                    initial_time,
                    end_time,
                    rent_time,
                }),
            })
        }
    }
}

/// Hour of day rounded up: `ceil(hours + minutes / 60)`
///
/// Seconds are ignored, so 16:30 gives 17 and 23:01 gives 24.
pub fn hour_of_day(timestamp: DateTime<Utc>) -> i32 {
    let hour = timestamp.hour() as i32;
    if timestamp.minute() > 0 { hour + 1 } else { hour }
}

fn parse_timestamp(raw: Option<&str>) -> Result<DateTime<Utc>, Rejection> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let raw = raw.ok_or(Rejection::InvalidTimestamp)?;

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| Rejection::InvalidTimestamp)
}
