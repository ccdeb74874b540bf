//! In-memory Backend Implementation
//!
//! Evaluates [`OrderQuery`] descriptions over a [`Dataset`] with the same
//! join, filter and ordering semantics as the generated SQL. Every executed
//! query is recorded so tests can assert on query counts and shapes; failures
//! and latency can be injected per query kind.

use super::core::*;
use crate::error::{OrmError, OrmResult};
use crate::model::OrderId;
use crate::query::{columns, HeaderProjection, OrderQuery};
use crate::seeding::{Dataset, OrderItemRecord, OrderRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory storage collaborator
#[derive(Clone)]
pub struct InMemoryOrderStore {
    data: Arc<Dataset>,
    query_count: Arc<AtomicUsize>,
    executed: Arc<Mutex<Vec<OrderQuery>>>,
    fail_on: Option<&'static str>,
    latency: Option<Duration>,
}

impl InMemoryOrderStore {
    pub fn new(data: Dataset) -> Self {
        Self {
            data: Arc::new(data),
            query_count: Arc::new(AtomicUsize::new(0)),
            executed: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            latency: None,
        }
    }

    /// Fail every query of the given kind (see [`OrderQuery::kind`])
    pub fn failing_on(mut self, kind: &'static str) -> Self {
        self.fail_on = Some(kind);
        self
    }

    /// Delay every query by `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of queries executed so far
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Executed queries in execution order
    pub fn executed_queries(&self) -> Vec<OrderQuery> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn reset_counters(&self) {
        self.query_count.store(0, Ordering::SeqCst);
        if let Ok(mut log) = self.executed.lock() {
            log.clear();
        }
    }

    fn evaluate(&self, query: &OrderQuery) -> OrmResult<Vec<ValueRow>> {
        match query {
            OrderQuery::Headers {
                search,
                page,
                projection,
            } => {
                let rows: Vec<ValueRow> = self
                    .matching_orders(|o, member| search.matches(member, o.status))?
                    .into_iter()
                    .map(|order| self.header_row(order, *projection))
                    .collect::<OrmResult<_>>()?;
                Ok(match page {
                    Some(page) => page.apply(rows),
                    None => rows,
                })
            }
            OrderQuery::FetchJoin { search } => {
                self.fan_out_rows(search, HeaderProjection::Entity, None)
            }
            OrderQuery::Flat { search, row_limit } => {
                self.fan_out_rows(search, HeaderProjection::Dto, *row_limit)
            }
            OrderQuery::LinesForOrder { order_id } => {
                let wanted: HashSet<OrderId> = std::iter::once(*order_id).collect();
                self.line_rows(&wanted)
            }
            OrderQuery::LinesForOrders { order_ids } => {
                let wanted: HashSet<OrderId> = order_ids.iter().copied().collect();
                self.line_rows(&wanted)
            }
        }
    }

    /// Orders surviving the inner joins to member and delivery, in id order
    fn matching_orders<F>(&self, filter: F) -> OrmResult<Vec<&OrderRecord>>
    where
        F: Fn(&OrderRecord, &str) -> bool,
    {
        let mut orders: Vec<&OrderRecord> = self
            .data
            .orders
            .iter()
            .filter(|o| self.data.delivery(o.delivery_id).is_some())
            .filter(|o| {
                self.data
                    .member(o.member_id)
                    .map(|m| filter(o, &m.name))
                    .unwrap_or(false)
            })
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    fn header_row(&self, order: &OrderRecord, projection: HeaderProjection) -> OrmResult<ValueRow> {
        let member = self
            .data
            .member(order.member_id)
            .ok_or_else(|| OrmError::Database(format!("member {} vanished", order.member_id)))?;
        let delivery = self.data.delivery(order.delivery_id).ok_or_else(|| {
            OrmError::Database(format!("delivery {} vanished", order.delivery_id))
        })?;

        let mut row = ValueRow::new().with(columns::ORDER_ID, order.id);
        if projection == HeaderProjection::Entity {
            row = row
                .with(columns::MEMBER_ID, order.member_id)
                .with(columns::DELIVERY_ID, order.delivery_id);
        }
        Ok(row
            .with(columns::MEMBER_NAME, member.name.as_str())
            .with(columns::ORDER_DATE, order.order_date)
            .with(columns::STATUS, order.status.as_str())
            .with(columns::CITY, delivery.address.city.as_str())
            .with(columns::STREET, delivery.address.street.as_str())
            .with(columns::ZIPCODE, delivery.address.zipcode.as_str()))
    }

    /// Orders left-joined to their lines and items: one row per line, or a
    /// single row with NULL line columns for an order without lines
    fn fan_out_rows(
        &self,
        search: &crate::model::OrderSearch,
        projection: HeaderProjection,
        row_limit: Option<usize>,
    ) -> OrmResult<Vec<ValueRow>> {
        let mut rows = Vec::new();
        for order in self.matching_orders(|o, member| search.matches(member, o.status))? {
            let header = self.header_row(order, projection)?;
            let lines = self.lines_of(order.id);
            if lines.is_empty() {
                rows.push(
                    header
                        .with(columns::ORDER_ITEM_ID, DatabaseValue::Null)
                        .with(columns::ITEM_ID, DatabaseValue::Null)
                        .with(columns::ITEM_NAME, DatabaseValue::Null)
                        .with(columns::ORDER_PRICE, DatabaseValue::Null)
                        .with(columns::COUNT, DatabaseValue::Null),
                );
                continue;
            }
            for line in lines {
                let item = self.data.item(line.item_id);
                rows.push(
                    header
                        .clone()
                        .with(columns::ORDER_ITEM_ID, line.id)
                        .with(columns::ITEM_ID, item.map(|i| i.id))
                        .with(columns::ITEM_NAME, item.map(|i| i.name.clone()))
                        .with(columns::ORDER_PRICE, line.order_price)
                        .with(columns::COUNT, line.count),
                );
            }
        }
        if let Some(limit) = row_limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn lines_of(&self, order_id: OrderId) -> Vec<&OrderItemRecord> {
        let mut lines: Vec<&OrderItemRecord> = self
            .data
            .order_items
            .iter()
            .filter(|l| l.order_id == order_id)
            .collect();
        lines.sort_by_key(|l| l.id);
        lines
    }

    fn line_rows(&self, order_ids: &HashSet<OrderId>) -> OrmResult<Vec<ValueRow>> {
        let mut lines: Vec<&OrderItemRecord> = self
            .data
            .order_items
            .iter()
            .filter(|l| order_ids.contains(&l.order_id))
            .collect();
        lines.sort_by_key(|l| l.id);

        // inner join to item
        Ok(lines
            .into_iter()
            .filter_map(|line| {
                self.data.item(line.item_id).map(|item| {
                    ValueRow::new()
                        .with(columns::ORDER_ITEM_ID, line.id)
                        .with(columns::ORDER_ID, line.order_id)
                        .with(columns::ITEM_ID, item.id)
                        .with(columns::ITEM_NAME, item.name.as_str())
                        .with(columns::ORDER_PRICE, line.order_price)
                        .with(columns::COUNT, line.count)
                })
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn fetch_all(&self, query: &OrderQuery) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.executed.lock() {
            log.push(query.clone());
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_on == Some(query.kind()) {
            return Err(OrmError::Database(format!(
                "injected failure for {} query",
                query.kind()
            )));
        }

        let rows = self.evaluate(query)?;
        Ok(rows
            .into_iter()
            .map(|row| Box::new(row) as Box<dyn DatabaseRow>)
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
