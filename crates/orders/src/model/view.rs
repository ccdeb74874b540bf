//! Views handed to the transport layer

use super::order::{Address, Order, OrderId, OrderLine, OrderStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One order as returned by `list_orders`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: OrderId,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
    pub lines: Vec<OrderLineView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub item_name: String,
    pub unit_price: i32,
    pub quantity: i32,
}

impl OrderView {
    /// Convert an assembled order; lines are left empty unless requested
    pub fn from_order(order: &Order, include_lines: bool) -> Self {
        Self {
            order_id: order.id,
            member_name: order.member_name.clone(),
            order_date: order.order_date,
            status: order.status,
            address: order.address.clone(),
            lines: if include_lines {
                order.lines.iter().map(OrderLineView::from).collect()
            } else {
                Vec::new()
            },
        }
    }
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            item_name: line.item_name.clone(),
            unit_price: line.order_price,
            quantity: line.count,
        }
    }
}
