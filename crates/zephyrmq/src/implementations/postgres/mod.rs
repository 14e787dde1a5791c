//! Postgres-backed implementation of every storage contract trait.
//!
//! Grounded in `implementations/postgres/catalog.rs` from the teacher: one
//! marker struct (`PostgresDriver`) holding a connection pool, implementing
//! each capability trait in its own file.

mod catalogue;
mod claim;
mod dbutils;
mod message;
mod partition;
mod queue;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::service::SharedClock;

/// A Postgres-backed driver. Implements [`crate::service::QueueOps`],
/// [`crate::service::MessageOps`], [`crate::service::ClaimOps`],
/// [`crate::service::CatalogueOps`], and [`crate::service::PartitionOps`].
#[derive(Clone)]
pub struct PostgresDriver {
    pool: PgPool,
    clock: SharedClock,
}

impl std::fmt::Debug for PostgresDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDriver").finish_non_exhaustive()
    }
}

impl PostgresDriver {
    #[must_use]
    pub fn new(pool: PgPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Builds a connection pool against `database_url`. `max_connections` and
/// `acquire_timeout` are surfaced to the caller so bin-level config
/// (`spec.md` SPEC_FULL ambient config section) can size read and write
/// pools independently.
pub async fn connect_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Applies every embedded migration. Safe to call repeatedly; already
/// applied migrations are skipped.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("src/implementations/postgres/migrations")
        .run(pool)
        .await
}
