use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Transaction};

use super::event_store::{InnerPgStore, PgStore};
use super::statements::Statements;
use super::ConnectionParams;

/// Struct used to build a brand new [`PgStore`].
pub struct PgStoreBuilder {
    pool: Pool<Postgres>,
    table_prefix: String,
    run_migrations: bool,
}

impl PgStoreBuilder {
    pub const DEFAULT_TABLE_PREFIX: &'static str = "foldstore";

    /// Creates a new instance of a [`PgStoreBuilder`] over an existing pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            table_prefix: Self::DEFAULT_TABLE_PREFIX.to_string(),
            run_migrations: true,
        }
    }

    /// Opens a new pool with the given [`ConnectionParams`].
    ///
    /// # Errors
    ///
    /// Will return an `Err` if the database is not reachable.
    pub async fn connect(params: &ConnectionParams) -> Result<Self, sqlx::Error> {
        let pool: Pool<Postgres> = PgPoolOptions::new()
            .max_connections(params.max_connections())
            .connect(&params.postgres_url())
            .await?;

        Ok(Self::new(pool))
    }

    /// Set the prefix of the events and snapshots tables, `<prefix>_events` and `<prefix>_snapshots`.
    pub fn with_table_prefix(mut self, table_prefix: impl Into<String>) -> Self {
        self.table_prefix = table_prefix.into();
        self
    }

    /// Calling this function the caller avoid running migrations. It is recommend to run migrations
    /// at least once per store per startup.
    pub fn without_running_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }

    /// This function runs all the needed migrations, atomically setting up the database if
    /// `run_migrations` isn't explicitly set to false.
    ///
    /// Eventually returns an instance of PgStore.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if there's an error running migrations.
    pub async fn try_build(self) -> Result<PgStore, sqlx::Error> {
        let statements = Statements::new(&self.table_prefix);

        if self.run_migrations {
            let mut transaction: Transaction<Postgres> = self.pool.begin().await?;

            for migration in statements.migrations() {
                let _ = sqlx::query(migration.as_str()).execute(&mut *transaction).await?;
            }

            transaction.commit().await?;
        }

        Ok(PgStore {
            inner: Arc::new(InnerPgStore {
                pool: self.pool,
                statements,
            }),
        })
    }
}
