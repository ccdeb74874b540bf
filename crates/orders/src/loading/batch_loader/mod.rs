use crate::{
    backends::OrderStore,
    error::OrmResult,
    model::{OrderId, OrderLine},
    query::OrderQuery,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};

use super::row_mapper::decode_rows;

pub mod config;

pub use config::{BatchConfig, MAX_BIND_PARAMETERS};

/// Result of a batch load operation
#[derive(Debug, Default)]
pub struct BatchLoadResult {
    /// Loaded lines keyed by order id; every requested id has an entry
    pub children: HashMap<OrderId, Vec<OrderLine>>,
    /// Number of queries executed
    pub query_count: usize,
    /// Total records loaded
    pub record_count: usize,
}

impl BatchLoadResult {
    /// Take the lines of one order, leaving an empty list behind
    pub fn take(&mut self, order_id: OrderId) -> Vec<OrderLine> {
        self.children.remove(&order_id).unwrap_or_default()
    }
}

/// Loads the lines of many orders with `IN` queries of bounded size
#[derive(Debug, Clone, Default)]
pub struct BatchLoader {
    config: BatchConfig,
}

impl BatchLoader {
    /// Create a new batch loader with default configuration
    pub fn new() -> Self {
        Self::with_config(BatchConfig::default())
    }

    /// Create a new batch loader with custom configuration
    pub fn with_config(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Load the lines of `parent_ids`, issuing `ceil(N / batch size)` queries
    /// for N distinct ids and none at all for an empty id list.
    pub async fn load_children(
        &self,
        store: &dyn OrderStore,
        parent_ids: &[OrderId],
    ) -> OrmResult<BatchLoadResult> {
        let ids = distinct_in_order(parent_ids);
        if ids.is_empty() {
            return Ok(BatchLoadResult::default());
        }

        let batch_size = self.config.max_batch_size.max(1);
        let chunks: Vec<Vec<OrderId>> = ids.chunks(batch_size).map(<[OrderId]>::to_vec).collect();
        let query_count = chunks.len();

        tracing::debug!(
            parents = ids.len(),
            batch_size,
            queries = query_count,
            parallel = self.config.parallel_execution,
            "batch loading order lines"
        );

        let per_chunk: Vec<Vec<OrderLine>> = if self.config.parallel_execution {
            // `buffered` keeps chunk results in submission order
            stream::iter(chunks)
                .map(|chunk| Self::execute_batch_query(store, chunk))
                .buffered(self.config.max_parallel_batches.max(1))
                .try_collect()
                .await?
        } else {
            let mut results = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                results.push(Self::execute_batch_query(store, chunk).await?);
            }
            results
        };

        let lines: Vec<OrderLine> = per_chunk.into_iter().flatten().collect();
        let record_count = lines.len();

        Ok(BatchLoadResult {
            children: group_by_parent_id(lines, &ids),
            query_count,
            record_count,
        })
    }

    /// Execute a single batch query
    async fn execute_batch_query(
        store: &dyn OrderStore,
        order_ids: Vec<OrderId>,
    ) -> OrmResult<Vec<OrderLine>> {
        let rows = store
            .fetch_all(&OrderQuery::LinesForOrders { order_ids })
            .await?;
        decode_rows(&rows)
    }
}

fn distinct_in_order(ids: &[OrderId]) -> Vec<OrderId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Group lines by order id
fn group_by_parent_id(lines: Vec<OrderLine>, parent_ids: &[OrderId]) -> HashMap<OrderId, Vec<OrderLine>> {
    let mut grouped: HashMap<OrderId, Vec<OrderLine>> = parent_ids
        .iter()
        .map(|id| (*id, Vec::new()))
        .collect();

    for line in lines {
        grouped.entry(line.order_id).or_default().push(line);
    }

    grouped
}
