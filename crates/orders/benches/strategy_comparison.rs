//! Strategy Comparison Benchmarks
//!
//! Runs every retrieval strategy over the same in-memory shop so the cost of
//! query count, duplicated rows and regrouping can be compared directly.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jpashop_orders::{
    loading::{regroup_flat, BatchConfig, BatchLoader},
    query::OrderQuery,
    seeding::bulk_dataset,
    InMemoryOrderStore, OrderQueryConfig, OrderRetriever, OrderSearch, OrderStore, RetrievalContext,
    RetrievalRequest, Strategy,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn bench_strategies(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("list_orders_by_strategy");

    for orders in [10usize, 100, 500] {
        let store = InMemoryOrderStore::new(bulk_dataset(orders));
        let config = OrderQueryConfig {
            flat_row_ceiling: Some(orders * 4),
            ..OrderQueryConfig::default()
        };
        let retriever = OrderRetriever::with_config(Arc::new(store), config).unwrap();

        for strategy in Strategy::ALL {
            let request = RetrievalRequest::new(OrderSearch::new())
                .with_lines()
                .using(strategy);

            group.bench_with_input(BenchmarkId::new(strategy.as_str(), orders), &request, |b, request| {
                b.iter(|| {
                    rt.block_on(async {
                        let retrieval = retriever
                            .retrieve(black_box(request), &RetrievalContext::new())
                            .await
                            .unwrap();
                        black_box(retrieval.orders.len())
                    })
                })
            });
        }
    }

    group.finish();
}

fn bench_batch_sizes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("batch_loader_sizes");
    let store = InMemoryOrderStore::new(bulk_dataset(500));
    let ids: Vec<i64> = (1..=500).collect();

    for batch_size in [10usize, 50, 100, 500] {
        let loader = BatchLoader::with_config(BatchConfig::default().with_batch_size(batch_size));
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &ids, |b, ids| {
            b.iter(|| {
                rt.block_on(async {
                    let result = loader.load_children(&store, black_box(ids)).await.unwrap();
                    black_box(result.record_count)
                })
            })
        });
    }

    group.finish();
}

fn bench_flat_regrouping(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("flat_regrouping");

    for orders in [100usize, 1000] {
        let store = InMemoryOrderStore::new(bulk_dataset(orders));
        let rows = rt
            .block_on(store.fetch_all(&OrderQuery::Flat {
                search: OrderSearch::new(),
                row_limit: None,
            }))
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(rows.len()), &rows, |b, rows| {
            b.iter(|| black_box(regroup_flat(black_box(rows)).unwrap().len()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_batch_sizes, bench_flat_regrouping);
criterion_main!(benches);
