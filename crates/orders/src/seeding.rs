//! Seed data
//!
//! Table-shaped records for the in-memory store plus the two-order sample
//! shop used by demos and tests.

use crate::model::{
    Address, DeliveryId, ItemId, MemberId, OrderId, OrderLineId, OrderStatus,
};
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRecord {
    pub id: MemberId,
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: String,
    pub price: i32,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub id: DeliveryId,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub member_id: MemberId,
    pub delivery_id: DeliveryId,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemRecord {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub order_price: i32,
    pub count: i32,
}

/// A snapshot of the shop tables. Ids are assigned per table in insertion
/// order, so persistence order and id order agree.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub members: Vec<MemberRecord>,
    pub items: Vec<ItemRecord>,
    pub deliveries: Vec<DeliveryRecord>,
    pub orders: Vec<OrderRecord>,
    pub order_items: Vec<OrderItemRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&mut self, name: &str, address: Address) -> MemberId {
        let id = self.members.len() as MemberId + 1;
        self.members.push(MemberRecord {
            id,
            name: name.to_string(),
            address,
        });
        id
    }

    pub fn add_book(&mut self, name: &str, price: i32, stock_quantity: i32) -> ItemId {
        let id = self.items.len() as ItemId + 1;
        self.items.push(ItemRecord {
            id,
            name: name.to_string(),
            price,
            stock_quantity,
        });
        id
    }

    /// Place an order shipped to the member's address. Each line is
    /// `(item, order price, count)`.
    pub fn add_order(
        &mut self,
        member_id: MemberId,
        order_date: NaiveDateTime,
        status: OrderStatus,
        lines: &[(ItemId, i32, i32)],
    ) -> OrderId {
        let address = self
            .members
            .iter()
            .find(|m| m.id == member_id)
            .map(|m| m.address.clone())
            .unwrap_or_else(|| Address::new("", "", ""));

        let delivery_id = self.deliveries.len() as DeliveryId + 1;
        self.deliveries.push(DeliveryRecord {
            id: delivery_id,
            address,
        });

        let order_id = self.orders.len() as OrderId + 1;
        self.orders.push(OrderRecord {
            id: order_id,
            member_id,
            delivery_id,
            order_date,
            status,
        });

        for &(item_id, order_price, count) in lines {
            let id = self.order_items.len() as OrderLineId + 1;
            self.order_items.push(OrderItemRecord {
                id,
                order_id,
                item_id,
                order_price,
                count,
            });
        }

        order_id
    }

    pub fn member(&self, id: MemberId) -> Option<&MemberRecord> {
        lookup(&self.members, id, |m| m.id)
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemRecord> {
        lookup(&self.items, id, |i| i.id)
    }

    pub fn delivery(&self, id: DeliveryId) -> Option<&DeliveryRecord> {
        lookup(&self.deliveries, id, |d| d.id)
    }
}

/// Ids are assigned from 1 in insertion order; fall back to a scan when
/// records were edited by hand
fn lookup<T>(records: &[T], id: i64, id_of: impl Fn(&T) -> i64) -> Option<&T> {
    usize::try_from(id - 1)
        .ok()
        .and_then(|index| records.get(index))
        .filter(|record| id_of(record) == id)
        .or_else(|| records.iter().find(|record| id_of(record) == id))
}

/// Two orders: userA buys JPA1/JPA2 books, userB buys SPRING1/SPRING2 books
pub fn sample_dataset() -> Dataset {
    let mut data = Dataset::new();

    let user_a = data.add_member("userA", Address::new("Seoul", "1", "111111"));
    let jpa1 = data.add_book("JPA1 BOOK", 10000, 100);
    let jpa2 = data.add_book("JPA2 BOOK", 20000, 100);
    data.add_order(
        user_a,
        seed_timestamp(1),
        OrderStatus::Ordered,
        &[(jpa1, 10000, 1), (jpa2, 20000, 2)],
    );

    let user_b = data.add_member("userB", Address::new("Jinju", "2", "222222"));
    let spring1 = data.add_book("SPRING1 BOOK", 20000, 200);
    let spring2 = data.add_book("SPRING2 BOOK", 40000, 400);
    data.add_order(
        user_b,
        seed_timestamp(2),
        OrderStatus::Ordered,
        &[(spring1, 20000, 3), (spring2, 40000, 4)],
    );

    data
}

/// A larger shop for pagination and batching scenarios: `orders` orders
/// spread over three members, order `n` carrying `n % 4` lines.
pub fn bulk_dataset(orders: usize) -> Dataset {
    let mut data = Dataset::new();
    let members: Vec<MemberId> = ["userA", "userB", "admin"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            data.add_member(name, Address::new("Seoul", &(i + 1).to_string(), "100000"))
        })
        .collect();
    let books: Vec<ItemId> = (1..=5)
        .map(|n| data.add_book(&format!("BOOK {}", n), 1000 * n, 1000))
        .collect();

    for n in 1..=orders {
        let lines: Vec<(ItemId, i32, i32)> = (0..n % 4)
            .map(|k| {
                let item = books[(n + k) % books.len()];
                (item, 1000 * (k as i32 + 1), k as i32 + 1)
            })
            .collect();
        let status = if n % 5 == 0 {
            OrderStatus::Canceled
        } else {
            OrderStatus::Ordered
        };
        data.add_order(
            members[n % members.len()],
            seed_timestamp(n as u32),
            status,
            &lines,
        );
    }

    data
}

fn seed_timestamp(day_offset: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.checked_add_days(chrono::Days::new(u64::from(day_offset))))
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .unwrap_or_default()
}
