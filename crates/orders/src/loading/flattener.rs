//! Flat projection regrouping
//!
//! The flat query returns one row per line with every order column repeated.
//! Rows are folded into views with the same [`Regrouper`] the fetch join
//! uses; the raw row count is checked against the ceiling first so a
//! truncated result set is never regrouped.

use super::row_mapper::{line_key, FromDatabaseRow, OrderHeaderRow, ParentChildRow, Regrouper};
use crate::backends::{DatabaseRow, DatabaseRowExt};
use crate::error::{OrmError, OrmResult};
use crate::model::{OrderId, OrderLineId, OrderLineView, OrderView, Page};
use crate::query::{columns, HeaderProjection};

/// One row of the flat projection
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub header: OrderHeaderRow,
    pub line: Option<(OrderLineId, OrderLineView)>,
}

impl FromDatabaseRow for FlatRow {
    fn from_row(row: &dyn DatabaseRow) -> OrmResult<Self> {
        let header = OrderHeaderRow::from_row(row, HeaderProjection::Dto)?;
        let line = match line_key(row)? {
            Some((id, _)) => Some((
                id,
                OrderLineView {
                    item_name: row.get(columns::ITEM_NAME)?,
                    unit_price: row.get(columns::ORDER_PRICE)?,
                    quantity: row.get(columns::COUNT)?,
                },
            )),
            None => None,
        };
        Ok(Self { header, line })
    }
}

impl ParentChildRow for FlatRow {
    type ParentKey = OrderId;
    type ChildKey = OrderLineId;
    type Parent = OrderView;
    type Child = OrderLineView;

    fn parent_key(&self) -> OrderId {
        self.header.order_id
    }

    fn child_key(&self) -> Option<OrderLineId> {
        self.line.as_ref().map(|(id, _)| *id)
    }

    fn to_parent(&self) -> OrderView {
        self.header.to_view()
    }

    fn to_child(&self) -> Option<OrderLineView> {
        self.line.as_ref().map(|(_, view)| view.clone())
    }
}

/// Fail when the flat query returned more than `ceiling` rows
pub fn check_row_ceiling(row_count: usize, ceiling: usize) -> OrmResult<()> {
    if row_count > ceiling {
        tracing::warn!(rows = row_count, ceiling, "flat projection exceeded its row ceiling");
        return Err(OrmError::RowCeilingExceeded { ceiling });
    }
    Ok(())
}

/// Regroup flat rows into views, orders in first-seen order
pub fn regroup_flat(rows: &[Box<dyn DatabaseRow>]) -> OrmResult<Vec<OrderView>> {
    let mut regrouper = Regrouper::<FlatRow>::new();
    for row in rows {
        regrouper.push(&FlatRow::from_row(row.as_ref())?);
    }

    tracing::trace!(
        rows = rows.len(),
        orders = regrouper.parent_count(),
        "regrouped flat rows"
    );

    Ok(regrouper
        .finish()
        .into_iter()
        .map(|(mut view, lines)| {
            view.lines = lines;
            view
        })
        .collect())
}

/// Apply a page to regrouped orders
pub fn paginate_parents(views: Vec<OrderView>, page: Option<&Page>) -> Vec<OrderView> {
    match page {
        Some(page) => page.apply(views),
        None => views,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{DatabaseValue, ValueRow};
    use chrono::NaiveDateTime;

    fn date() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn flat_row(order_id: i64, member: &str, line: Option<(i64, &str, i32, i32)>) -> Box<dyn DatabaseRow> {
        let row = ValueRow::new()
            .with(columns::ORDER_ID, order_id)
            .with(columns::MEMBER_NAME, member)
            .with(columns::ORDER_DATE, date())
            .with(columns::STATUS, "ORDERED")
            .with(columns::CITY, "Seoul")
            .with(columns::STREET, "1")
            .with(columns::ZIPCODE, "111111");
        Box::new(match line {
            Some((id, name, price, count)) => row
                .with(columns::ORDER_ITEM_ID, id)
                .with(columns::ITEM_ID, id)
                .with(columns::ITEM_NAME, name)
                .with(columns::ORDER_PRICE, price)
                .with(columns::COUNT, count),
            None => row
                .with(columns::ORDER_ITEM_ID, DatabaseValue::Null)
                .with(columns::ITEM_ID, DatabaseValue::Null)
                .with(columns::ITEM_NAME, DatabaseValue::Null)
                .with(columns::ORDER_PRICE, DatabaseValue::Null)
                .with(columns::COUNT, DatabaseValue::Null),
        })
    }

    #[test]
    fn test_regroups_one_view_per_order() {
        let rows = vec![
            flat_row(4, "userA", Some((1, "JPA1 BOOK", 10000, 1))),
            flat_row(4, "userA", Some((2, "JPA2 BOOK", 20000, 2))),
            flat_row(11, "userB", Some((3, "SPRING1 BOOK", 20000, 3))),
            flat_row(11, "userB", Some((4, "SPRING2 BOOK", 40000, 4))),
        ];
        let views = regroup_flat(&rows).unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].order_id, 4);
        assert_eq!(views[0].lines[1].unit_price, 20000);
        assert_eq!(views[1].member_name, "userB");
        assert_eq!(views[1].lines.len(), 2);
    }

    #[test]
    fn test_identical_lines_with_distinct_ids_are_kept() {
        let rows = vec![
            flat_row(1, "userA", Some((1, "JPA1 BOOK", 10000, 1))),
            flat_row(1, "userA", Some((2, "JPA1 BOOK", 10000, 1))),
            flat_row(1, "userA", Some((1, "JPA1 BOOK", 10000, 1))),
        ];
        let views = regroup_flat(&rows).unwrap();
        assert_eq!(views[0].lines.len(), 2);
    }

    #[test]
    fn test_order_without_lines() {
        let views = regroup_flat(&[flat_row(3, "admin", None)]).unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].lines.is_empty());
    }

    #[test]
    fn test_row_ceiling() {
        assert!(check_row_ceiling(10, 10).is_ok());
        assert!(matches!(
            check_row_ceiling(11, 10),
            Err(OrmError::RowCeilingExceeded { ceiling: 10 })
        ));
    }

    #[test]
    fn test_paginate_parents_after_regrouping() {
        let rows = vec![
            flat_row(1, "userA", Some((1, "A", 1, 1))),
            flat_row(1, "userA", Some((2, "B", 1, 1))),
            flat_row(2, "userB", Some((3, "C", 1, 1))),
            flat_row(3, "admin", None),
        ];
        let views = regroup_flat(&rows).unwrap();

        let page = paginate_parents(views.clone(), Some(&Page::new(1, 1)));
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].order_id, 2);
        assert_eq!(paginate_parents(views, None).len(), 3);
    }
}
