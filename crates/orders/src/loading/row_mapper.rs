//! Row decoding and parent/child regrouping
//!
//! Fan-out queries return one row per line with the order columns repeated.
//! [`Regrouper`] folds such rows back into one parent per distinct order id,
//! in first-seen order, keeping every distinct line exactly once. Feeding it
//! the same rows twice yields the same result as feeding them once.

use crate::backends::{DatabaseRow, DatabaseRowExt};
use crate::error::{OrmError, OrmResult};
use crate::model::{
    Address, DeliveryId, ItemId, MemberId, Order, OrderId, OrderLine, OrderLineId, OrderStatus, OrderView,
};
use crate::query::{columns, HeaderProjection};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Decode a typed record from a result row
pub trait FromDatabaseRow: Sized {
    fn from_row(row: &dyn DatabaseRow) -> OrmResult<Self>;
}

/// Decode every row, failing on the first undecodable one
pub fn decode_rows<T: FromDatabaseRow>(rows: &[Box<dyn DatabaseRow>]) -> OrmResult<Vec<T>> {
    rows.iter().map(|row| T::from_row(row.as_ref())).collect()
}

/// A row that carries one parent and at most one child
pub trait ParentChildRow {
    type ParentKey: Hash + Eq + Clone;
    type ChildKey: Hash + Eq + Clone;
    type Parent;
    type Child;

    fn parent_key(&self) -> Self::ParentKey;

    /// `None` when an outer join produced no child for this parent
    fn child_key(&self) -> Option<Self::ChildKey>;

    fn to_parent(&self) -> Self::Parent;

    fn to_child(&self) -> Option<Self::Child>;
}

/// Incremental parent/child regrouping
pub struct Regrouper<R: ParentChildRow> {
    index: HashMap<R::ParentKey, usize>,
    seen_children: HashSet<(R::ParentKey, R::ChildKey)>,
    groups: Vec<(R::Parent, Vec<R::Child>)>,
}

impl<R: ParentChildRow> Default for Regrouper<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ParentChildRow> Regrouper<R> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            seen_children: HashSet::new(),
            groups: Vec::new(),
        }
    }

    pub fn push(&mut self, row: &R) {
        let parent_key = row.parent_key();
        let slot = match self.index.get(&parent_key) {
            Some(slot) => *slot,
            None => {
                self.groups.push((row.to_parent(), Vec::new()));
                let slot = self.groups.len() - 1;
                self.index.insert(parent_key.clone(), slot);
                slot
            }
        };

        if let Some(child_key) = row.child_key() {
            if self.seen_children.insert((parent_key, child_key)) {
                if let Some(child) = row.to_child() {
                    self.groups[slot].1.push(child);
                }
            }
        }
    }

    pub fn parent_count(&self) -> usize {
        self.groups.len()
    }

    /// Parents in first-seen order, each with its distinct children
    pub fn finish(self) -> Vec<(R::Parent, Vec<R::Child>)> {
        self.groups
    }
}

/// Regroup a whole row set
pub fn regroup<R, I>(rows: I) -> Vec<(R::Parent, Vec<R::Child>)>
where
    R: ParentChildRow,
    I: IntoIterator<Item = R>,
{
    let mut regrouper = Regrouper::new();
    for row in rows {
        regrouper.push(&row);
    }
    regrouper.finish()
}

/// Order columns shared by header and fan-out rows
#[derive(Debug, Clone, PartialEq)]
pub struct OrderHeaderRow {
    pub order_id: OrderId,
    /// Present in entity projections only
    pub member_id: Option<MemberId>,
    /// Present in entity projections only
    pub delivery_id: Option<DeliveryId>,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
}

impl OrderHeaderRow {
    pub fn from_row(row: &dyn DatabaseRow, projection: HeaderProjection) -> OrmResult<Self> {
        let (member_id, delivery_id) = match projection {
            HeaderProjection::Entity => (
                Some(row.get::<MemberId>(columns::MEMBER_ID)?),
                Some(row.get::<DeliveryId>(columns::DELIVERY_ID)?),
            ),
            HeaderProjection::Dto => (None, None),
        };

        let status: String = row.get(columns::STATUS)?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(OrmError::Serialization)?;

        Ok(Self {
            order_id: row.get(columns::ORDER_ID)?,
            member_id,
            delivery_id,
            member_name: row.get(columns::MEMBER_NAME)?,
            order_date: row.get(columns::ORDER_DATE)?,
            status,
            address: Address {
                city: row.get(columns::CITY)?,
                street: row.get(columns::STREET)?,
                zipcode: row.get(columns::ZIPCODE)?,
            },
        })
    }

    /// Build an order entity without lines
    pub fn to_order(&self) -> OrmResult<Order> {
        let missing = |column: &str| OrmError::ColumnNotFound(column.to_string());
        Ok(Order {
            id: self.order_id,
            member_id: self.member_id.ok_or_else(|| missing(columns::MEMBER_ID))?,
            member_name: self.member_name.clone(),
            delivery_id: self.delivery_id.ok_or_else(|| missing(columns::DELIVERY_ID))?,
            address: self.address.clone(),
            order_date: self.order_date,
            status: self.status,
            lines: Vec::new(),
        })
    }

    /// Build a view without lines
    pub fn to_view(&self) -> OrderView {
        OrderView {
            order_id: self.order_id,
            member_name: self.member_name.clone(),
            order_date: self.order_date,
            status: self.status,
            address: self.address.clone(),
            lines: Vec::new(),
        }
    }
}

impl FromDatabaseRow for OrderLine {
    fn from_row(row: &dyn DatabaseRow) -> OrmResult<Self> {
        Ok(OrderLine {
            id: row.get(columns::ORDER_ITEM_ID)?,
            order_id: row.get(columns::ORDER_ID)?,
            item_id: row.get(columns::ITEM_ID)?,
            item_name: row.get(columns::ITEM_NAME)?,
            order_price: row.get(columns::ORDER_PRICE)?,
            count: row.get(columns::COUNT)?,
        })
    }
}

/// One row of the fetch-join query: an order entity and at most one line
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJoinRow {
    pub header: OrderHeaderRow,
    pub line: Option<OrderLine>,
}

impl FromDatabaseRow for FetchJoinRow {
    fn from_row(row: &dyn DatabaseRow) -> OrmResult<Self> {
        let header = OrderHeaderRow::from_row(row, HeaderProjection::Entity)?;
        let line = match line_key(row)? {
            Some((id, item_id)) => Some(OrderLine {
                id,
                order_id: header.order_id,
                item_id,
                item_name: row.get(columns::ITEM_NAME)?,
                order_price: row.get(columns::ORDER_PRICE)?,
                count: row.get(columns::COUNT)?,
            }),
            None => None,
        };
        Ok(Self { header, line })
    }
}

/// Line and item ids of a left-joined row. A line whose item is missing is
/// skipped, matching the inner join of the line queries.
pub(crate) fn line_key(row: &dyn DatabaseRow) -> OrmResult<Option<(OrderLineId, ItemId)>> {
    let line_id = row.try_get::<OrderLineId>(columns::ORDER_ITEM_ID)?;
    let item_id = row.try_get::<ItemId>(columns::ITEM_ID)?;
    Ok(line_id.zip(item_id))
}

impl ParentChildRow for FetchJoinRow {
    type ParentKey = OrderId;
    type ChildKey = OrderLineId;
    type Parent = OrderHeaderRow;
    type Child = OrderLine;

    fn parent_key(&self) -> OrderId {
        self.header.order_id
    }

    fn child_key(&self) -> Option<OrderLineId> {
        self.line.as_ref().map(|line| line.id)
    }

    fn to_parent(&self) -> OrderHeaderRow {
        self.header.clone()
    }

    fn to_child(&self) -> Option<OrderLine> {
        self.line.clone()
    }
}

/// Decode order entities from header rows, lines left empty
pub fn map_order_headers(rows: &[Box<dyn DatabaseRow>]) -> OrmResult<Vec<Order>> {
    rows.iter()
        .map(|row| OrderHeaderRow::from_row(row.as_ref(), HeaderProjection::Entity)?.to_order())
        .collect()
}

/// Decode views from DTO header rows, lines left empty
pub fn map_view_headers(rows: &[Box<dyn DatabaseRow>]) -> OrmResult<Vec<OrderView>> {
    rows.iter()
        .map(|row| Ok(OrderHeaderRow::from_row(row.as_ref(), HeaderProjection::Dto)?.to_view()))
        .collect()
}

/// Deduplicate fetch-join rows into order entities with their lines
pub fn map_fetch_join(rows: &[Box<dyn DatabaseRow>]) -> OrmResult<Vec<Order>> {
    let mut regrouper = Regrouper::<FetchJoinRow>::new();
    for row in rows {
        regrouper.push(&FetchJoinRow::from_row(row.as_ref())?);
    }

    tracing::trace!(
        rows = rows.len(),
        orders = regrouper.parent_count(),
        "deduplicated fetch join rows"
    );

    regrouper
        .finish()
        .into_iter()
        .map(|(header, lines)| {
            let mut order = header.to_order()?;
            order.lines = lines;
            Ok(order)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{DatabaseValue, ValueRow};

    fn date() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn joined_row(order_id: i64, line: Option<(i64, &str, i32, i32)>) -> Box<dyn DatabaseRow> {
        let row = ValueRow::new()
            .with(columns::ORDER_ID, order_id)
            .with(columns::MEMBER_ID, 10 + order_id)
            .with(columns::DELIVERY_ID, 20 + order_id)
            .with(columns::MEMBER_NAME, format!("user{}", order_id))
            .with(columns::ORDER_DATE, date())
            .with(columns::STATUS, "ORDERED")
            .with(columns::CITY, "Seoul")
            .with(columns::STREET, "1")
            .with(columns::ZIPCODE, "1111");
        let row = match line {
            Some((id, name, price, count)) => row
                .with(columns::ORDER_ITEM_ID, id)
                .with(columns::ITEM_ID, id + 100)
                .with(columns::ITEM_NAME, name)
                .with(columns::ORDER_PRICE, price)
                .with(columns::COUNT, count),
            None => row
                .with(columns::ORDER_ITEM_ID, DatabaseValue::Null)
                .with(columns::ITEM_ID, DatabaseValue::Null)
                .with(columns::ITEM_NAME, DatabaseValue::Null)
                .with(columns::ORDER_PRICE, DatabaseValue::Null)
                .with(columns::COUNT, DatabaseValue::Null),
        };
        Box::new(row)
    }

    #[test]
    fn test_fetch_join_rows_are_deduplicated() {
        let rows = vec![
            joined_row(4, Some((1, "JPA1 BOOK", 10000, 1))),
            joined_row(4, Some((2, "JPA2 BOOK", 20000, 2))),
            joined_row(11, Some((3, "SPRING1 BOOK", 20000, 3))),
            joined_row(11, Some((4, "SPRING2 BOOK", 40000, 4))),
        ];

        let orders = map_fetch_join(&rows).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, 4);
        assert_eq!(orders[0].member_id, 14);
        assert_eq!(orders[0].lines.len(), 2);
        assert_eq!(orders[1].lines[1].item_name, "SPRING2 BOOK");
        assert_eq!(orders[1].total_price(), 220000);
    }

    #[test]
    fn test_dedup_is_idempotent_over_duplicated_rows() {
        let once = vec![
            joined_row(1, Some((1, "A", 1, 1))),
            joined_row(1, Some((2, "B", 1, 1))),
            joined_row(2, None),
        ];
        let twice: Vec<Box<dyn DatabaseRow>> = vec![
            joined_row(1, Some((1, "A", 1, 1))),
            joined_row(1, Some((2, "B", 1, 1))),
            joined_row(2, None),
            joined_row(1, Some((1, "A", 1, 1))),
            joined_row(1, Some((2, "B", 1, 1))),
            joined_row(2, None),
        ];

        assert_eq!(map_fetch_join(&once).unwrap(), map_fetch_join(&twice).unwrap());
    }

    #[test]
    fn test_order_without_lines_survives_outer_join() {
        let orders = map_fetch_join(&[joined_row(9, None)]).unwrap();
        assert_eq!(orders.len(), 1);
        assert!(orders[0].lines.is_empty());
    }

    #[test]
    fn test_first_seen_parent_order_is_kept() {
        let rows = vec![
            joined_row(5, Some((7, "A", 1, 1))),
            joined_row(3, Some((8, "B", 1, 1))),
            joined_row(5, Some((9, "C", 1, 1))),
        ];
        let ids: Vec<OrderId> = map_fetch_join(&rows).unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![5, 3]);
    }

    #[test]
    fn test_dto_header_cannot_become_entity() {
        let row = joined_row(1, None);
        let header = OrderHeaderRow::from_row(row.as_ref(), HeaderProjection::Dto).unwrap();
        assert_eq!(header.member_id, None);
        assert!(matches!(header.to_order(), Err(OrmError::ColumnNotFound(_))));
        assert_eq!(header.to_view().member_name, "user1");
    }

    #[test]
    fn test_bad_status_is_serialization_error() {
        let row: Box<dyn DatabaseRow> = Box::new(
            ValueRow::new()
                .with(columns::ORDER_ID, 1i64)
                .with(columns::MEMBER_NAME, "userA")
                .with(columns::ORDER_DATE, date())
                .with(columns::STATUS, "SHIPPED")
                .with(columns::CITY, "Seoul")
                .with(columns::STREET, "1")
                .with(columns::ZIPCODE, "1111"),
        );
        assert!(matches!(
            map_view_headers(&[row]),
            Err(OrmError::Serialization(_))
        ));
    }

    #[test]
    fn test_line_rows_decode() {
        let rows: Vec<Box<dyn DatabaseRow>> = vec![Box::new(
            ValueRow::new()
                .with(columns::ORDER_ITEM_ID, 3i64)
                .with(columns::ORDER_ID, 2i64)
                .with(columns::ITEM_ID, 30i64)
                .with(columns::ITEM_NAME, "SPRING1 BOOK")
                .with(columns::ORDER_PRICE, 20000)
                .with(columns::COUNT, 3),
        )];
        let lines: Vec<OrderLine> = decode_rows(&rows).unwrap();
        assert_eq!(lines[0].order_id, 2);
        assert_eq!(lines[0].total_price(), 60000);
    }
}
