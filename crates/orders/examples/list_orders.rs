//! Lists the sample shop's orders with every strategy and prints the query
//! cost of each.
//!
//! Runs against the in-memory store by default; set `DATABASE_URL` to a
//! PostgreSQL database holding the shop schema to run against it instead.
//!
//! ```sh
//! RUST_LOG=jpashop_orders=debug cargo run --example list_orders
//! ```

use jpashop_orders::{
    init_logging, seeding::sample_dataset, InMemoryOrderStore, LoggingConfig, OrderQueryConfig,
    OrderRetriever, OrderSearch, OrderStore, PostgresOrderStore, RetrievalContext,
    RetrievalRequest, Strategy,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LoggingConfig::development()).map_err(|e| anyhow::anyhow!(e))?;

    let config = OrderQueryConfig::from_env()?;
    let store: Arc<dyn OrderStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => Arc::new(PostgresOrderStore::connect(&url, 5).await?),
        Err(_) => Arc::new(InMemoryOrderStore::new(sample_dataset())),
    };
    let retriever = OrderRetriever::with_config(store, config)?;

    for strategy in Strategy::ALL {
        let request = RetrievalRequest::new(OrderSearch::new())
            .with_lines()
            .using(strategy);
        let retrieval = retriever.retrieve(&request, &RetrievalContext::new()).await?;

        println!(
            "{:<14} queries={} rows={} orders={}",
            strategy,
            retrieval.stats.query_count,
            retrieval.stats.rows_fetched,
            retrieval.stats.order_count
        );
    }

    let orders = retriever.list_orders(&OrderSearch::new(), None, true).await?;
    println!("{}", serde_json::to_string_pretty(&orders)?);

    Ok(())
}
