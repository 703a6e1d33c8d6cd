macro_rules! statement {
    ($file:expr, $table:expr $(,)?) => {{
        format!(include_str!($file), $table)
    }};
}

/// Every query the [`super::PgStore`] runs, rendered once for its table names.
#[derive(Clone, Debug)]
pub struct Statements {
    events_table: String,
    snapshots_table: String,
    insert_event: String,
    select_stream_version: String,
    select_stream_forward: String,
    select_latest_snapshot: String,
    insert_snapshot: String,
}

impl Statements {
    pub fn new(table_prefix: &str) -> Self {
        let events_table: String = format!("{}_events", table_prefix);
        let snapshots_table: String = format!("{}_snapshots", table_prefix);

        Self {
            insert_event: statement!("statements/insert_event.sql", &events_table),
            select_stream_version: statement!("statements/select_stream_version.sql", &events_table),
            select_stream_forward: statement!("statements/select_stream_forward.sql", &events_table),
            select_latest_snapshot: statement!("statements/select_latest_snapshot.sql", &snapshots_table),
            insert_snapshot: statement!("statements/insert_snapshot.sql", &snapshots_table),
            events_table,
            snapshots_table,
        }
    }

    /// Idempotent schema setup, in the order it has to run.
    pub fn migrations(&self) -> Vec<String> {
        vec![
            statement!("migrations/01_create_events_table.sql", &self.events_table),
            statement!("migrations/02_create_events_unique_constraint.sql", &self.events_table),
            statement!("migrations/03_create_snapshots_table.sql", &self.snapshots_table),
            statement!("migrations/04_create_snapshots_index.sql", &self.snapshots_table),
        ]
    }

    pub fn events_table(&self) -> &str {
        &self.events_table
    }

    pub fn snapshots_table(&self) -> &str {
        &self.snapshots_table
    }

    pub fn insert_event(&self) -> &str {
        &self.insert_event
    }

    pub fn select_stream_version(&self) -> &str {
        &self.select_stream_version
    }

    pub fn select_stream_forward(&self) -> &str {
        &self.select_stream_forward
    }

    pub fn select_latest_snapshot(&self) -> &str {
        &self.select_latest_snapshot
    }

    pub fn insert_snapshot(&self) -> &str {
        &self.insert_snapshot
    }
}
