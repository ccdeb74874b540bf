/// Order retrieval strategies and the components they share:
/// planning, row deduplication, batch loading and flat regrouping

pub mod batch_loader;
pub mod executor;
pub mod flattener;
pub mod planner;
pub mod row_mapper;

pub use batch_loader::{BatchConfig, BatchLoadResult, BatchLoader};
pub use executor::{OrderRetriever, Retrieval, RetrievalContext, RetrievalStats};
pub use flattener::{paginate_parents, regroup_flat, FlatRow};
pub use planner::{QueryPlan, QueryPlanner, RetrievalRequest, Strategy};
pub use row_mapper::{map_fetch_join, regroup, FromDatabaseRow, ParentChildRow, Regrouper};
