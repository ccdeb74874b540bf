//! Order aggregate as assembled by the entity strategies

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type OrderId = i64;
pub type OrderLineId = i64;
pub type MemberId = i64;
pub type DeliveryId = i64;
pub type ItemId = i64;

/// Order status, persisted as its upper-case name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Ordered,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Ordered => "ORDERED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ORDERED" => Ok(OrderStatus::Ordered),
            "CANCELED" | "CANCELLED" => Ok(OrderStatus::Canceled),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// Embedded address value, copied into every projection that carries it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

impl Address {
    pub fn new(city: impl Into<String>, street: impl Into<String>, zipcode: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            street: street.into(),
            zipcode: zipcode.into(),
        }
    }
}

/// An order with its member and delivery already resolved.
///
/// The order owns its lines; a line only keeps the order id as a lookup key,
/// so there is no back-pointer to follow when serializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub member_id: MemberId,
    pub member_name: String,
    pub delivery_id: DeliveryId,
    pub address: Address,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Sum of all line totals
    pub fn total_price(&self) -> i64 {
        self.lines.iter().map(OrderLine::total_price).sum()
    }
}

/// One order item joined with its item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub item_name: String,
    /// Unit price at the time the order was placed
    pub order_price: i32,
    pub count: i32,
}

impl OrderLine {
    pub fn total_price(&self) -> i64 {
        i64::from(self.order_price) * i64::from(self.count)
    }
}
