//! Strategy selection
//!
//! The strategy set is closed. The planner either picks one for a request or
//! validates the one the caller asked for, and rejects incompatible
//! combinations before any query is issued.

use crate::config::OrderQueryConfig;
use crate::error::{OrmError, OrmResult};
use crate::loading::batch_loader::MAX_BIND_PARAMETERS;
use crate::model::{OrderSearch, Page};
use std::fmt;
use std::str::FromStr;

/// How an order list and its lines are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One query joining orders, member, delivery, lines and items; one row
    /// per line, deduplicated in memory. Cannot paginate.
    FetchJoin,
    /// One paginated query over the to-one joins, lines filled in by the
    /// batch loader with `IN` queries of bounded size.
    ToOneFetch,
    /// DTO projection of the orders, then one line query per order (1 + N).
    DtoPerOrder,
    /// DTO projection of the orders, then one `IN` query for all their lines
    /// (1 + 1). Id lists beyond the bind parameter limit are split.
    DtoBatched,
    /// One fully flattened query regrouped in memory. Cannot paginate in the
    /// database and needs a row ceiling.
    FlatProjection,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::FetchJoin,
        Strategy::ToOneFetch,
        Strategy::DtoPerOrder,
        Strategy::DtoBatched,
        Strategy::FlatProjection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::FetchJoin => "fetch_join",
            Strategy::ToOneFetch => "to_one_fetch",
            Strategy::DtoPerOrder => "dto_per_order",
            Strategy::DtoBatched => "dto_batched",
            Strategy::FlatProjection => "flat",
        }
    }

    /// Whether the order query can carry LIMIT/OFFSET
    pub fn paginates_in_database(&self) -> bool {
        !matches!(self, Strategy::FetchJoin | Strategy::FlatProjection)
    }

    /// Queries the strategy issues for `orders` matching orders
    pub fn expected_queries(&self, orders: usize, batch_size: usize, include_lines: bool) -> usize {
        if !include_lines || orders == 0 {
            return 1;
        }
        match self {
            Strategy::FetchJoin | Strategy::FlatProjection => 1,
            Strategy::ToOneFetch => 1 + orders.div_ceil(batch_size.max(1)),
            Strategy::DtoPerOrder => 1 + orders,
            Strategy::DtoBatched => 1 + orders.div_ceil(MAX_BIND_PARAMETERS),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fetch_join" => Ok(Strategy::FetchJoin),
            "to_one_fetch" | "batch_fetch" => Ok(Strategy::ToOneFetch),
            "dto_per_order" => Ok(Strategy::DtoPerOrder),
            "dto_batched" => Ok(Strategy::DtoBatched),
            "flat" | "flat_projection" => Ok(Strategy::FlatProjection),
            _ => Err(format!("Unknown retrieval strategy: {}", s)),
        }
    }
}

/// What the caller asked for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalRequest {
    pub search: OrderSearch,
    pub page: Option<Page>,
    pub include_lines: bool,
    /// Explicit strategy; the planner chooses when unset
    pub strategy: Option<Strategy>,
}

impl RetrievalRequest {
    pub fn new(search: OrderSearch) -> Self {
        Self {
            search,
            ..Self::default()
        }
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_lines(mut self) -> Self {
        self.include_lines = true;
        self
    }

    pub fn using(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// A validated plan, ready for the executor
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub strategy: Strategy,
    pub search: OrderSearch,
    /// Window pushed into the order query
    pub database_page: Option<Page>,
    /// Window applied to regrouped orders (flat projection only)
    pub memory_page: Option<Page>,
    pub include_lines: bool,
    /// Raw row ceiling for the flat projection
    pub row_ceiling: Option<usize>,
}

/// Picks and validates retrieval strategies
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    default_strategy: Strategy,
    flat_row_ceiling: Option<usize>,
    in_memory_pagination: bool,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(&OrderQueryConfig::default())
    }
}

impl QueryPlanner {
    pub fn new(config: &OrderQueryConfig) -> Self {
        Self {
            default_strategy: config.default_strategy,
            flat_row_ceiling: config.flat_row_ceiling,
            in_memory_pagination: config.in_memory_pagination,
        }
    }

    /// Choose a strategy: paginated or line-less requests use the to-one
    /// fetch, everything else the configured default.
    pub fn choose(&self, page: Option<&Page>, include_lines: bool) -> Strategy {
        if page.is_some() || !include_lines {
            Strategy::ToOneFetch
        } else {
            self.default_strategy
        }
    }

    pub fn plan(&self, request: &RetrievalRequest) -> OrmResult<QueryPlan> {
        let strategy = request
            .strategy
            .unwrap_or_else(|| self.choose(request.page.as_ref(), request.include_lines));

        self.validate(strategy, request.page.as_ref())?;

        let (database_page, memory_page) = if strategy.paginates_in_database() {
            (request.page, None)
        } else {
            (None, request.page)
        };

        tracing::debug!(
            strategy = %strategy,
            paged = request.page.is_some(),
            include_lines = request.include_lines,
            "planned order retrieval"
        );

        Ok(QueryPlan {
            strategy,
            search: request.search.clone(),
            database_page,
            memory_page,
            include_lines: request.include_lines,
            row_ceiling: match strategy {
                Strategy::FlatProjection => self.flat_row_ceiling,
                _ => None,
            },
        })
    }

    /// Reject combinations that would silently return wrong or unbounded
    /// results
    pub fn validate(&self, strategy: Strategy, page: Option<&Page>) -> OrmResult<()> {
        let rejection = match (strategy, page) {
            (Strategy::FetchJoin, Some(_)) => Some(
                "fetch join over order lines cannot be paginated; the row count per order is unknown before execution"
                    .to_string(),
            ),
            (Strategy::FlatProjection, _) if self.flat_row_ceiling.is_none() => Some(
                "flat projection requires a row ceiling and none is configured".to_string(),
            ),
            (Strategy::FlatProjection, Some(_)) if !self.in_memory_pagination => Some(
                "flat projection cannot be paginated in the database and in-memory pagination is disabled"
                    .to_string(),
            ),
            _ => None,
        };

        match rejection {
            Some(reason) => {
                tracing::warn!(strategy = %strategy, "rejected retrieval plan: {}", reason);
                Err(OrmError::Configuration(reason))
            }
            None => Ok(()),
        }
    }
}
