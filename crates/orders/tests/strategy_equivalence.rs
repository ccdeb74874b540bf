use jpashop_orders::{
    seeding::{bulk_dataset, sample_dataset, Dataset, OrderItemRecord},
    InMemoryOrderStore, OrderQueryConfig, OrderRetriever, OrderSearch, OrderStatus, OrderView, Page,
    RetrievalContext, RetrievalRequest, Strategy,
};
use std::sync::Arc;

fn retriever_for(data: Dataset, batch_size: usize) -> (OrderRetriever, InMemoryOrderStore) {
    let store = InMemoryOrderStore::new(data);
    let mut config = OrderQueryConfig::default();
    config.batch.max_batch_size = batch_size;
    config.flat_row_ceiling = Some(10_000);
    config.in_memory_pagination = true;
    let retriever = OrderRetriever::with_config(Arc::new(store.clone()), config).unwrap();
    (retriever, store)
}

async fn run(
    retriever: &OrderRetriever,
    search: &OrderSearch,
    page: Option<Page>,
    include_lines: bool,
    strategy: Strategy,
) -> Vec<OrderView> {
    let mut request = RetrievalRequest::new(search.clone()).using(strategy);
    request.page = page;
    request.include_lines = include_lines;
    retriever
        .retrieve(&request, &RetrievalContext::new())
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", strategy, e))
        .orders
}

#[tokio::test]
async fn test_sample_dataset_nested_result() {
    let (retriever, _) = retriever_for(sample_dataset(), 100);
    let orders = retriever
        .list_orders(&OrderSearch::new(), None, true)
        .await
        .unwrap();

    assert_eq!(orders.len(), 2);

    assert_eq!(orders[0].order_id, 1);
    assert_eq!(orders[0].member_name, "userA");
    assert_eq!(orders[0].address.city, "Seoul");
    let first: Vec<(&str, i32, i32)> = orders[0]
        .lines
        .iter()
        .map(|l| (l.item_name.as_str(), l.unit_price, l.quantity))
        .collect();
    assert_eq!(first, vec![("JPA1 BOOK", 10000, 1), ("JPA2 BOOK", 20000, 2)]);

    assert_eq!(orders[1].member_name, "userB");
    let second: Vec<(&str, i32)> = orders[1]
        .lines
        .iter()
        .map(|l| (l.item_name.as_str(), l.quantity))
        .collect();
    assert_eq!(second, vec![("SPRING1 BOOK", 3), ("SPRING2 BOOK", 4)]);
}

#[tokio::test]
async fn test_all_strategies_agree_on_sample_dataset() {
    let (retriever, _) = retriever_for(sample_dataset(), 100);
    let search = OrderSearch::new();

    let baseline = run(&retriever, &search, None, true, Strategy::ToOneFetch).await;
    for strategy in Strategy::ALL {
        assert_eq!(
            run(&retriever, &search, None, true, strategy).await,
            baseline,
            "strategy {}",
            strategy
        );
    }
}

#[tokio::test]
async fn test_all_strategies_agree_under_filters() {
    let (retriever, _) = retriever_for(bulk_dataset(37), 4);
    let searches = [
        OrderSearch::new(),
        OrderSearch::new().with_status(OrderStatus::Canceled),
        OrderSearch::new().with_status(OrderStatus::Ordered),
        OrderSearch::new().with_member_name("user"),
        OrderSearch::new().with_member_name("B").with_status(OrderStatus::Ordered),
        OrderSearch::new().with_member_name("   "),
        OrderSearch::new().with_member_name("nobody"),
    ];

    for search in &searches {
        for include_lines in [true, false] {
            let baseline = run(&retriever, search, None, include_lines, Strategy::FetchJoin).await;
            for strategy in Strategy::ALL {
                assert_eq!(
                    run(&retriever, search, None, include_lines, strategy).await,
                    baseline,
                    "strategy {} search {:?} lines {}",
                    strategy,
                    search,
                    include_lines
                );
            }
        }
    }
}

#[tokio::test]
async fn test_paginating_strategies_agree_page_by_page() {
    let (retriever, _) = retriever_for(bulk_dataset(23), 3);
    let search = OrderSearch::new();
    let all = run(&retriever, &search, None, true, Strategy::FetchJoin).await;

    for offset in (0..25).step_by(5) {
        let page = Page::new(offset, 5);
        let expected = page.apply(all.clone());
        for strategy in [
            Strategy::ToOneFetch,
            Strategy::DtoPerOrder,
            Strategy::DtoBatched,
            Strategy::FlatProjection,
        ] {
            assert_eq!(
                run(&retriever, &search, Some(page), true, strategy).await,
                expected,
                "strategy {} offset {}",
                strategy,
                offset
            );
        }
    }
}

#[tokio::test]
async fn test_orders_without_lines_are_returned_by_every_strategy() {
    // orders 4 and 8 have no lines
    let (retriever, _) = retriever_for(bulk_dataset(8), 100);
    for strategy in Strategy::ALL {
        let orders = run(&retriever, &OrderSearch::new(), None, true, strategy).await;
        assert_eq!(orders.len(), 8, "strategy {}", strategy);
        assert!(orders[3].lines.is_empty());
        assert_eq!(orders[2].lines.len(), 3);
    }
}

#[tokio::test]
async fn test_line_without_item_is_skipped_by_every_strategy() {
    let mut data = sample_dataset();
    let next_id = data.order_items.len() as i64 + 1;
    data.order_items.push(OrderItemRecord {
        id: next_id,
        order_id: 1,
        item_id: 999,
        order_price: 500,
        count: 1,
    });
    let (retriever, _) = retriever_for(data, 100);

    for strategy in Strategy::ALL {
        let orders = run(&retriever, &OrderSearch::new(), None, true, strategy).await;
        assert_eq!(orders.len(), 2, "strategy {}", strategy);
        assert_eq!(orders[0].lines.len(), 2, "strategy {}", strategy);
    }
}

#[tokio::test]
async fn test_member_name_search_without_lines() {
    let (retriever, _) = retriever_for(sample_dataset(), 100);
    let orders = retriever
        .list_orders(&OrderSearch::new().with_member_name("user"), None, false)
        .await
        .unwrap();

    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o.lines.is_empty()));
}

#[tokio::test]
async fn test_canceled_filter_on_sample_dataset_is_empty() {
    let (retriever, _) = retriever_for(sample_dataset(), 100);
    let orders = retriever
        .list_orders(
            &OrderSearch::new().with_status(OrderStatus::Canceled),
            None,
            true,
        )
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_query_counts_per_strategy() {
    let (retriever, store) = retriever_for(bulk_dataset(10), 3);
    let search = OrderSearch::new();

    for strategy in Strategy::ALL {
        store.reset_counters();
        let retrieval = retriever
            .retrieve(
                &RetrievalRequest::new(search.clone()).with_lines().using(strategy),
                &RetrievalContext::new(),
            )
            .await
            .unwrap();

        let expected = strategy.expected_queries(10, 3, true);
        assert_eq!(retrieval.stats.query_count, expected, "strategy {}", strategy);
        assert_eq!(store.query_count(), expected, "strategy {}", strategy);
    }
}

#[tokio::test]
async fn test_default_plan_for_paginated_request_uses_batches() {
    let (retriever, store) = retriever_for(bulk_dataset(10), 2);
    let orders = retriever
        .list_orders(&OrderSearch::new(), Some(Page::new(2, 4)), true)
        .await
        .unwrap();

    let ids: Vec<i64> = orders.iter().map(|o| o.order_id).collect();
    assert_eq!(ids, vec![3, 4, 5, 6]);
    // one header query, two line batches of two ids
    assert_eq!(store.query_count(), 3);
}

#[tokio::test]
async fn test_views_serialize_for_transport() {
    let (retriever, _) = retriever_for(sample_dataset(), 100);
    let orders = retriever
        .list_orders(&OrderSearch::new(), Some(Page::new(0, 1)), true)
        .await
        .unwrap();

    let json = serde_json::to_value(&orders).unwrap();
    assert_eq!(json[0]["memberName"], "userA");
    assert_eq!(json[0]["lines"][1]["itemName"], "JPA2 BOOK");
    assert_eq!(json[0]["lines"][1]["unitPrice"], 20000);
}
