use crate::{
    backends::{DatabaseRow, OrderStore},
    config::OrderQueryConfig,
    error::{OrmError, OrmResult},
    model::{Order, OrderId, OrderLine, OrderLineView, OrderSearch, OrderView, Page},
    query::{HeaderProjection, OrderQuery},
};
use super::batch_loader::{BatchLoader, MAX_BIND_PARAMETERS};
use super::flattener;
use super::planner::{QueryPlan, QueryPlanner, RetrievalRequest, Strategy};
use super::row_mapper::{self, decode_rows};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation supplied by the caller for one retrieval
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    /// Overrides the configured query timeout when set
    pub timeout: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl RetrievalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Statistics about one retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalStats {
    pub strategy: Strategy,
    /// Number of queries executed
    pub query_count: usize,
    /// Total rows fetched across all queries
    pub rows_fetched: usize,
    /// Orders returned
    pub order_count: usize,
    pub total_duration: Duration,
}

/// Result of a retrieval
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub orders: Vec<OrderView>,
    pub stats: RetrievalStats,
}

/// Counts queries and rows for a single retrieval
struct CountingStore<'a> {
    inner: &'a dyn OrderStore,
    queries: AtomicUsize,
    rows: AtomicUsize,
}

impl<'a> CountingStore<'a> {
    fn new(inner: &'a dyn OrderStore) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
            rows: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<'a> OrderStore for CountingStore<'a> {
    async fn fetch_all(&self, query: &OrderQuery) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        let n = self.queries.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(query = n, kind = query.kind(), backend = self.inner.backend_name(), "issuing query");

        let rows = self.inner.fetch_all(query).await?;
        self.rows.fetch_add(rows.len(), Ordering::Relaxed);
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

/// Executes retrieval plans against a storage collaborator
#[derive(Clone)]
pub struct OrderRetriever {
    store: Arc<dyn OrderStore>,
    planner: QueryPlanner,
    batch_loader: BatchLoader,
    config: OrderQueryConfig,
}

impl OrderRetriever {
    /// Create a retriever with default configuration
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        let config = OrderQueryConfig::default();
        Self {
            store,
            planner: QueryPlanner::new(&config),
            batch_loader: BatchLoader::with_config(config.batch.clone()),
            config,
        }
    }

    /// Create a retriever with custom configuration
    pub fn with_config(store: Arc<dyn OrderStore>, config: OrderQueryConfig) -> OrmResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            planner: QueryPlanner::new(&config),
            batch_loader: BatchLoader::with_config(config.batch.clone()),
            config,
        })
    }

    pub fn config(&self) -> &OrderQueryConfig {
        &self.config
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    /// List orders matching `search`, letting the planner pick the strategy
    pub async fn list_orders(
        &self,
        search: &OrderSearch,
        page: Option<Page>,
        include_lines: bool,
    ) -> OrmResult<Vec<OrderView>> {
        let request = RetrievalRequest {
            search: search.clone(),
            page,
            include_lines,
            strategy: None,
        };
        Ok(self.retrieve(&request, &RetrievalContext::default()).await?.orders)
    }

    /// Plan and execute a retrieval under the caller's deadline and
    /// cancellation token. Nothing is returned from a retrieval that was cut
    /// short.
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest,
        context: &RetrievalContext,
    ) -> OrmResult<Retrieval> {
        let plan = self.planner.plan(request)?;
        let deadline = context.timeout.or_else(|| self.config.query_timeout());
        let start = Instant::now();
        let counter = CountingStore::new(self.store.as_ref());

        let work = self.execute(&plan, &counter);
        let bounded = async {
            match deadline {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(OrmError::Timeout(format!(
                        "retrieval exceeded {} ms",
                        limit.as_millis()
                    ))),
                },
                None => work.await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = context.cancellation.cancelled() => {
                Err(OrmError::Timeout("retrieval cancelled by caller".to_string()))
            }
            result = bounded => result,
        };

        let orders = match result {
            Ok(orders) => orders,
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!(
                        strategy = %plan.strategy,
                        queries = counter.queries.load(Ordering::Relaxed),
                        "order retrieval aborted: {}",
                        e
                    );
                }
                return Err(e);
            }
        };

        let stats = RetrievalStats {
            strategy: plan.strategy,
            query_count: counter.queries.load(Ordering::Relaxed),
            rows_fetched: counter.rows.load(Ordering::Relaxed),
            order_count: orders.len(),
            total_duration: start.elapsed(),
        };

        tracing::info!(
            strategy = %stats.strategy,
            queries = stats.query_count,
            rows = stats.rows_fetched,
            orders = stats.order_count,
            elapsed_ms = stats.total_duration.as_millis() as u64,
            "order retrieval completed"
        );

        Ok(Retrieval { orders, stats })
    }

    async fn execute(&self, plan: &QueryPlan, store: &dyn OrderStore) -> OrmResult<Vec<OrderView>> {
        match plan.strategy {
            Strategy::FetchJoin => self.fetch_join(plan, store).await,
            Strategy::ToOneFetch => self.to_one_fetch(plan, store).await,
            Strategy::DtoPerOrder => self.dto_per_order(plan, store).await,
            Strategy::DtoBatched => self.dto_batched(plan, store).await,
            Strategy::FlatProjection => self.flat_projection(plan, store).await,
        }
    }

    async fn fetch_join(&self, plan: &QueryPlan, store: &dyn OrderStore) -> OrmResult<Vec<OrderView>> {
        let rows = store
            .fetch_all(&OrderQuery::FetchJoin {
                search: plan.search.clone(),
            })
            .await?;
        let orders = row_mapper::map_fetch_join(&rows)?;
        Ok(to_views(&orders, plan.include_lines))
    }

    async fn to_one_fetch(&self, plan: &QueryPlan, store: &dyn OrderStore) -> OrmResult<Vec<OrderView>> {
        let rows = store
            .fetch_all(&OrderQuery::Headers {
                search: plan.search.clone(),
                page: plan.database_page,
                projection: HeaderProjection::Entity,
            })
            .await?;
        let mut orders = row_mapper::map_order_headers(&rows)?;

        if plan.include_lines {
            let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
            let mut loaded = self.batch_loader.load_children(store, &ids).await?;
            for order in &mut orders {
                order.lines = loaded.take(order.id);
            }
        }

        Ok(to_views(&orders, plan.include_lines))
    }

    async fn dto_per_order(&self, plan: &QueryPlan, store: &dyn OrderStore) -> OrmResult<Vec<OrderView>> {
        let mut views = self.dto_headers(plan, store).await?;
        if !plan.include_lines {
            return Ok(views);
        }

        for view in &mut views {
            let rows = store
                .fetch_all(&OrderQuery::LinesForOrder {
                    order_id: view.order_id,
                })
                .await?;
            view.lines = decode_rows::<OrderLine>(&rows)?
                .iter()
                .map(OrderLineView::from)
                .collect();
        }
        Ok(views)
    }

    async fn dto_batched(&self, plan: &QueryPlan, store: &dyn OrderStore) -> OrmResult<Vec<OrderView>> {
        let mut views = self.dto_headers(plan, store).await?;
        if !plan.include_lines || views.is_empty() {
            return Ok(views);
        }

        // one IN query unless the id list would overflow the bind parameter limit
        let order_ids: Vec<OrderId> = views.iter().map(|v| v.order_id).collect();
        let mut lines: Vec<OrderLine> = Vec::new();
        for chunk in order_ids.chunks(MAX_BIND_PARAMETERS) {
            let rows = store
                .fetch_all(&OrderQuery::LinesForOrders {
                    order_ids: chunk.to_vec(),
                })
                .await?;
            lines.extend(decode_rows::<OrderLine>(&rows)?);
        }

        // lines arrive in id order; grouping keeps that order per parent
        let mut by_order: HashMap<OrderId, Vec<OrderLineView>> = HashMap::new();
        for line in &lines {
            by_order
                .entry(line.order_id)
                .or_default()
                .push(OrderLineView::from(line));
        }
        for view in &mut views {
            view.lines = by_order.remove(&view.order_id).unwrap_or_default();
        }
        Ok(views)
    }

    async fn flat_projection(&self, plan: &QueryPlan, store: &dyn OrderStore) -> OrmResult<Vec<OrderView>> {
        let ceiling = plan.row_ceiling.ok_or_else(|| {
            OrmError::Configuration("flat projection requires a row ceiling".to_string())
        })?;

        let rows = store
            .fetch_all(&OrderQuery::Flat {
                search: plan.search.clone(),
                row_limit: Some(ceiling.saturating_add(1)),
            })
            .await?;
        flattener::check_row_ceiling(rows.len(), ceiling)?;

        let mut views = flattener::regroup_flat(&rows)?;
        if !plan.include_lines {
            for view in &mut views {
                view.lines.clear();
            }
        }
        Ok(flattener::paginate_parents(views, plan.memory_page.as_ref()))
    }

    async fn dto_headers(&self, plan: &QueryPlan, store: &dyn OrderStore) -> OrmResult<Vec<OrderView>> {
        let rows = store
            .fetch_all(&OrderQuery::Headers {
                search: plan.search.clone(),
                page: plan.database_page,
                projection: HeaderProjection::Dto,
            })
            .await?;
        row_mapper::map_view_headers(&rows)
    }
}

fn to_views(orders: &[Order], include_lines: bool) -> Vec<OrderView> {
    orders
        .iter()
        .map(|order| OrderView::from_order(order, include_lines))
        .collect()
}
