//! The async pipeline materializes exactly what the blocking one does.

#![allow(clippy::unwrap_used, missing_docs)]

use std::time::Duration;

use recordgraph::{
    AsyncRecordsetCursor, MapperConfig, ResultSet, ResultShape, query_async, query_multiple,
    query_multiple_async, query_single_async,
};
use recordgraph_testing::fixtures::{self, Customer, Grandparent, Order, family_materializer};
use recordgraph_testing::{Fault, ScriptedSource};

fn slow(sets: Vec<ResultSet>) -> ScriptedSource {
    ScriptedSource::builder()
        .result_sets(sets)
        .latency(Duration::from_millis(1))
        .build()
}

fn customer_sets() -> Vec<ResultSet> {
    vec![
        fixtures::customers(),
        fixtures::orders(),
        fixtures::total_count(3),
    ]
}

#[tokio::test]
async fn test_shape_parity() {
    let config = MapperConfig::default();
    let shape = fixtures::customer_orders_shape();

    let mut blocking =
        query_multiple(ScriptedSource::new(customer_sets()), &shape, &config).unwrap();
    let source = slow(customer_sets());
    let probe = source.probe();
    let mut suspended = query_multiple_async(source, &shape, &config).await.unwrap();

    assert_eq!(
        blocking.take::<Customer>(0).unwrap(),
        suspended.take::<Customer>(0).unwrap()
    );
    assert_eq!(
        blocking.scalar::<i32>("total").unwrap(),
        suspended.scalar::<i32>("total").unwrap()
    );
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn test_grouped_parity() {
    let config = MapperConfig::default();
    let shape = ResultShape::new().returns_with(family_materializer());

    let blocking = query_multiple(
        ScriptedSource::new(vec![fixtures::interleaved_family_rows()]),
        &shape,
        &config,
    )
    .unwrap();
    let source = slow(vec![fixtures::interleaved_family_rows()]);
    let suspended = query_multiple_async(source, &shape, &config).await.unwrap();

    assert_eq!(
        blocking.set::<Grandparent>(0).unwrap(),
        suspended.set::<Grandparent>(0).unwrap()
    );
}

#[tokio::test]
async fn test_async_missing_positions() {
    let shape = ResultShape::new().returns::<Customer>().then::<Order>();
    let results = query_multiple_async(slow(Vec::new()), &shape, &MapperConfig::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.set::<Customer>(0).unwrap().is_empty());
    assert!(results.set::<Order>(1).unwrap().is_empty());
}

#[tokio::test]
async fn test_async_single_row_reads() {
    let config = MapperConfig::default();
    let orders: Vec<Order> = query_async(slow(vec![fixtures::orders()]), &config)
        .await
        .unwrap();
    assert_eq!(orders.len(), 5);

    let err = query_single_async::<Customer, _>(slow(vec![fixtures::customers()]), &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        recordgraph::Error::Cardinality { actual: 3, .. }
    ));
}

#[tokio::test]
async fn test_async_for_each_and_fault() {
    let config = MapperConfig::default();
    let source = ScriptedSource::builder()
        .result_set(fixtures::customers())
        .fault(Fault::ReadRow(2))
        .latency(Duration::from_millis(1))
        .build();
    let probe = source.probe();
    let mut cursor = AsyncRecordsetCursor::new(source);
    cursor.expect_result().await.unwrap();

    let mut names = Vec::new();
    let err = cursor
        .for_each::<Customer, _>(&config, |customer| {
            names.push(customer.name);
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(err.is_source_error());
    assert_eq!(names, ["Ada", "Brian"]);
    drop(cursor);
    assert_eq!(probe.closes(), 1);
}
