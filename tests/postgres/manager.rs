use serde_json::json;
use sqlx::{Pool, Postgres};

use foldstore::store::postgres::{PgStore, PgStoreBuilder};
use foldstore::store::EventStore;
use foldstore::AggregateManager;

use crate::aggregate::{Counter, TestCommand};

#[sqlx::test]
async fn execute_and_load_test(pool: Pool<Postgres>) {
    let store: PgStore = PgStoreBuilder::new(pool).try_build().await.unwrap();
    let manager: AggregateManager<Counter, PgStore> = AggregateManager::new(store);

    let executed = manager
        .execute("s1", TestCommand::Increment { amount: 3 })
        .await
        .unwrap();
    assert_eq!(executed.state.inner().count, 3);
    assert_eq!(executed.state.version(), 1);

    let executed = manager
        .execute("s1", TestCommand::Increment { amount: 7 })
        .await
        .unwrap();
    assert_eq!(executed.state.inner().count, 10);
    assert_eq!(executed.state.version(), 2);

    let aggregate_state = manager.load("s1").await.unwrap();
    assert_eq!(aggregate_state, executed.state);
}

#[sqlx::test]
async fn snapshot_at_interval_test(pool: Pool<Postgres>) {
    let store: PgStore = PgStoreBuilder::new(pool).try_build().await.unwrap();
    let manager: AggregateManager<Counter, PgStore> = AggregateManager::new(store.clone());

    for _ in 0..100 {
        manager
            .execute("s1", TestCommand::Increment { amount: 1 })
            .await
            .unwrap();
    }

    let snapshot = store.get_latest_snapshot("s1").await.unwrap().unwrap();
    assert_eq!(snapshot.stream_version, 100);
    assert_eq!(snapshot.data, json!({ "count": 100, "status": "open" }));

    let aggregate_state = manager.load("s1").await.unwrap();
    assert_eq!(aggregate_state.version(), 100);
    assert_eq!(aggregate_state.inner().count, 100);
}
