use serde_json::json;
use sqlx::{Pool, Postgres};

use foldstore::event::NewEvent;
use foldstore::store::postgres::{PgStore, PgStoreBuilder};
use foldstore::store::{EventStore, StoreError};

fn incremented(amount: i64) -> NewEvent {
    NewEvent::new("incremented", json!({ "type": "incremented", "amount": amount }))
}

#[sqlx::test]
async fn setup_database_test(pool: Pool<Postgres>) {
    let rows = sqlx::query("SELECT table_name FROM information_schema.tables WHERE table_name LIKE 'foldstore_%'")
        .fetch_all(&pool)
        .await
        .unwrap();

    assert!(rows.is_empty());

    let store: PgStore = PgStoreBuilder::new(pool.clone())
        .try_build()
        .await
        .expect("Failed to create PgStore");

    let rows = sqlx::query("SELECT table_name FROM information_schema.tables WHERE table_name LIKE 'foldstore_%'")
        .fetch_all(&pool)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);

    let rows = sqlx::query("SELECT indexname FROM pg_indexes WHERE tablename = $1")
        .bind(store.events_table())
        .fetch_all(&pool)
        .await
        .unwrap();

    // primary key, stream_id-stream_version
    assert_eq!(rows.len(), 2);

    // Migrations are idempotent
    let _: PgStore = PgStoreBuilder::new(pool.clone()).try_build().await.unwrap();
}

#[sqlx::test]
async fn append_and_read_forward_test(pool: Pool<Postgres>) {
    let store: PgStore = PgStoreBuilder::new(pool).try_build().await.unwrap();

    assert_eq!(store.stream_version("s1").await.unwrap(), 0);
    assert!(store.read_stream_forward("s1", 1, 100).await.unwrap().is_empty());

    let store_events = store
        .append_events("s1", 0, vec![incremented(1), incremented(2)])
        .await
        .unwrap();

    assert_eq!(store_events.len(), 2);
    assert_eq!(store_events[0].stream_version, 1);
    assert_eq!(store_events[1].stream_version, 2);
    assert_eq!(store_events[1].payload["amount"], json!(2));

    store.append_events("s1", 2, vec![incremented(3)]).await.unwrap();

    let store_events = store.read_stream_forward("s1", 2, 100).await.unwrap();
    assert_eq!(
        store_events.iter().map(|e| e.stream_version).collect::<Vec<_>>(),
        vec![2, 3]
    );
    assert_eq!(store_events[0].event_type, "incremented");

    let store_events = store.read_stream_forward("s1", 1, 1).await.unwrap();
    assert_eq!(store_events.len(), 1);

    assert_eq!(store.stream_version("s1").await.unwrap(), 3);
    assert_eq!(store.stream_version("s2").await.unwrap(), 0);
}

#[sqlx::test]
async fn stale_expected_version_test(pool: Pool<Postgres>) {
    let store: PgStore = PgStoreBuilder::new(pool).try_build().await.unwrap();

    store.append_events("s1", 0, vec![incremented(1)]).await.unwrap();

    let result = store
        .append_events("s1", 0, vec![incremented(1), incremented(1)])
        .await;

    assert!(matches!(
        result,
        Err(StoreError::WrongExpectedVersion {
            expected: 0,
            actual: Some(1),
            ..
        })
    ));
    assert_eq!(store.stream_version("s1").await.unwrap(), 1);
}

#[sqlx::test]
async fn racing_appends_test(pool: Pool<Postgres>) {
    let store: PgStore = PgStoreBuilder::new(pool).try_build().await.unwrap();

    let (first, second) = tokio::join!(
        store.append_events("s1", 0, vec![incremented(1)]),
        store.append_events("s1", 0, vec![incremented(2)]),
    );

    let successes = [&first, &second].iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    assert!([first, second]
        .into_iter()
        .filter_map(Result::err)
        .all(|error| error.is_wrong_expected_version()));
    assert_eq!(store.stream_version("s1").await.unwrap(), 1);
}

#[sqlx::test]
async fn latest_snapshot_test(pool: Pool<Postgres>) {
    let store: PgStore = PgStoreBuilder::new(pool)
        .with_table_prefix("counters")
        .try_build()
        .await
        .unwrap();

    assert_eq!(store.snapshots_table(), "counters_snapshots");
    assert!(store.get_latest_snapshot("s1").await.unwrap().is_none());

    store.save_snapshot("s1", 100, "counter", json!({ "count": 100 })).await.unwrap();
    store.save_snapshot("s1", 200, "counter", json!({ "count": 200 })).await.unwrap();
    // Saving again at the same version is ignored
    store.save_snapshot("s1", 200, "counter", json!({ "count": -1 })).await.unwrap();

    let snapshot = store.get_latest_snapshot("s1").await.unwrap().unwrap();
    assert_eq!(snapshot.stream_id, "s1");
    assert_eq!(snapshot.stream_version, 200);
    assert_eq!(snapshot.aggregate_type, "counter");
    assert_eq!(snapshot.data, json!({ "count": 200 }));
}
