//! The relational queries issued by the retrieval strategies
//!
//! Each variant is a complete query description. Stores either render it to
//! SQL ([`OrderQuery::to_sql_with_params`]) or evaluate it directly, and must
//! return rows carrying the column aliases in [`columns`].

use super::builder::SelectBuilder;
use crate::backends::DatabaseValue;
use crate::model::{OrderId, OrderSearch, Page};

/// Column aliases shared by every store
pub mod columns {
    pub const ORDER_ID: &str = "order_id";
    pub const MEMBER_ID: &str = "member_id";
    pub const MEMBER_NAME: &str = "member_name";
    pub const DELIVERY_ID: &str = "delivery_id";
    pub const ORDER_DATE: &str = "order_date";
    pub const STATUS: &str = "status";
    pub const CITY: &str = "city";
    pub const STREET: &str = "street";
    pub const ZIPCODE: &str = "zipcode";
    pub const ORDER_ITEM_ID: &str = "order_item_id";
    pub const ITEM_ID: &str = "item_id";
    pub const ITEM_NAME: &str = "item_name";
    pub const ORDER_PRICE: &str = "order_price";
    pub const COUNT: &str = "count";
}

/// Which parent columns a header query projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProjection {
    /// Entity columns, including member and delivery identities
    Entity,
    /// Only what the view needs
    Dto,
}

/// A single relational query issued by a strategy
#[derive(Debug, Clone, PartialEq)]
pub enum OrderQuery {
    /// One row per order with member and delivery joined; safe to paginate
    Headers {
        search: OrderSearch,
        page: Option<Page>,
        projection: HeaderProjection,
    },
    /// Orders fetch-joined with their lines and items, one row per line
    FetchJoin { search: OrderSearch },
    /// Lines of a single order
    LinesForOrder { order_id: OrderId },
    /// Lines of many orders through an `IN` predicate
    LinesForOrders { order_ids: Vec<OrderId> },
    /// Fully flattened projection, one row per line with parent columns repeated
    Flat {
        search: OrderSearch,
        row_limit: Option<usize>,
    },
}

impl OrderQuery {
    /// Short name for logs and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            OrderQuery::Headers { .. } => "headers",
            OrderQuery::FetchJoin { .. } => "fetch_join",
            OrderQuery::LinesForOrder { .. } => "lines_for_order",
            OrderQuery::LinesForOrders { .. } => "lines_for_orders",
            OrderQuery::Flat { .. } => "flat",
        }
    }

    pub fn to_sql_with_params(&self) -> (String, Vec<DatabaseValue>) {
        self.to_builder().to_sql_with_params()
    }

    pub fn param_count(&self) -> usize {
        self.to_builder().param_count()
    }

    fn to_builder(&self) -> SelectBuilder {
        match self {
            OrderQuery::Headers {
                search,
                page,
                projection,
            } => {
                let mut builder = apply_search(header_select(*projection), search)
                    .order_by("o.order_id");
                if let Some(page) = page {
                    builder = builder.limit(page.limit).offset(page.offset);
                }
                builder
            }
            OrderQuery::FetchJoin { search } => {
                let builder = line_columns(header_select(HeaderProjection::Entity))
                    .left_join("order_item oi", "oi.order_id", "o.order_id")
                    .left_join("item i", "oi.item_id", "i.item_id");
                apply_search(builder, search)
                    .order_by("o.order_id")
                    .order_by("oi.order_item_id")
            }
            OrderQuery::LinesForOrder { order_id } => lines_select().where_eq("oi.order_id", *order_id),
            OrderQuery::LinesForOrders { order_ids } => {
                lines_select().where_in("oi.order_id", order_ids.iter().copied())
            }
            OrderQuery::Flat { search, row_limit } => {
                let builder = line_columns(header_select(HeaderProjection::Dto))
                    .left_join("order_item oi", "oi.order_id", "o.order_id")
                    .left_join("item i", "oi.item_id", "i.item_id");
                let mut builder = apply_search(builder, search)
                    .order_by("o.order_id")
                    .order_by("oi.order_item_id");
                if let Some(limit) = row_limit {
                    builder = builder.limit(*limit);
                }
                builder
            }
        }
    }
}

fn header_select(projection: HeaderProjection) -> SelectBuilder {
    let mut builder = SelectBuilder::new().select_as("o.order_id", columns::ORDER_ID);
    if projection == HeaderProjection::Entity {
        builder = builder
            .select_as("o.member_id", columns::MEMBER_ID)
            .select_as("o.delivery_id", columns::DELIVERY_ID);
    }
    builder
        .select_as("m.name", columns::MEMBER_NAME)
        .select_as("o.order_date", columns::ORDER_DATE)
        .select_as("o.status", columns::STATUS)
        .select_as("d.city", columns::CITY)
        .select_as("d.street", columns::STREET)
        .select_as("d.zipcode", columns::ZIPCODE)
        .from("orders o")
        .join("member m", "o.member_id", "m.member_id")
        .join("delivery d", "o.delivery_id", "d.delivery_id")
}

fn line_columns(builder: SelectBuilder) -> SelectBuilder {
    builder
        .select_as("oi.order_item_id", columns::ORDER_ITEM_ID)
        .select_as("i.item_id", columns::ITEM_ID)
        .select_as("i.name", columns::ITEM_NAME)
        .select_as("oi.order_price", columns::ORDER_PRICE)
        .select_as("oi.count", columns::COUNT)
}

fn lines_select() -> SelectBuilder {
    SelectBuilder::new()
        .select_as("oi.order_item_id", columns::ORDER_ITEM_ID)
        .select_as("oi.order_id", columns::ORDER_ID)
        .select_as("i.item_id", columns::ITEM_ID)
        .select_as("i.name", columns::ITEM_NAME)
        .select_as("oi.order_price", columns::ORDER_PRICE)
        .select_as("oi.count", columns::COUNT)
        .from("order_item oi")
        .join("item i", "oi.item_id", "i.item_id")
        .order_by("oi.order_item_id")
}

fn apply_search(mut builder: SelectBuilder, search: &OrderSearch) -> SelectBuilder {
    if let Some(status) = search.status {
        builder = builder.where_eq("o.status", status.as_str());
    }
    if let Some(pattern) = search.member_name_pattern() {
        builder = builder.where_like("m.name", pattern);
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderStatus;

    #[test]
    fn test_paginated_headers_sql() {
        let query = OrderQuery::Headers {
            search: OrderSearch::new().with_status(OrderStatus::Ordered),
            page: Some(Page::new(0, 100)),
            projection: HeaderProjection::Entity,
        };
        let (sql, params) = query.to_sql_with_params();

        assert!(sql.starts_with("SELECT o.order_id AS order_id, o.member_id AS member_id"));
        assert!(sql.contains("INNER JOIN delivery d ON o.delivery_id = d.delivery_id"));
        assert!(sql.ends_with("WHERE o.status = $1 ORDER BY o.order_id ASC LIMIT 100 OFFSET 0"));
        assert_eq!(params, vec![DatabaseValue::String("ORDERED".into())]);
    }

    #[test]
    fn test_dto_headers_skip_identity_columns() {
        let query = OrderQuery::Headers {
            search: OrderSearch::new(),
            page: None,
            projection: HeaderProjection::Dto,
        };
        let (sql, _) = query.to_sql_with_params();
        assert!(!sql.contains("member_id AS"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_batched_lines_use_in_predicate() {
        let query = OrderQuery::LinesForOrders {
            order_ids: vec![1, 2, 3],
        };
        let (sql, params) = query.to_sql_with_params();

        assert!(sql.contains("WHERE oi.order_id IN ($1, $2, $3)"));
        assert!(sql.ends_with("ORDER BY oi.order_item_id ASC"));
        assert_eq!(params.len(), 3);
        assert_eq!(query.param_count(), 3);
    }

    #[test]
    fn test_fan_out_queries_never_paginate_rows_by_page() {
        let fetch_join = OrderQuery::FetchJoin {
            search: OrderSearch::new().with_member_name("user"),
        };
        let (sql, params) = fetch_join.to_sql_with_params();
        assert!(sql.contains("LEFT JOIN order_item oi ON oi.order_id = o.order_id"));
        assert!(!sql.contains("LIMIT"));
        assert_eq!(params, vec![DatabaseValue::String("%user%".into())]);

        let flat = OrderQuery::Flat {
            search: OrderSearch::new(),
            row_limit: Some(1001),
        };
        let (sql, _) = flat.to_sql_with_params();
        assert!(sql.ends_with("ORDER BY o.order_id ASC, oi.order_item_id ASC LIMIT 1001"));
    }
}
