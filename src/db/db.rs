// db/db.rs
use sqlx::{Pool, Postgres};

use super::{applicationdb::ApplicationExt, jobdb::JobExt, statuslogdb::StatusLogExt};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("size", &self.pool.size())
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Everything the lifecycle services need from persistence.
///
/// Implemented by [`DBClient`] for PostgreSQL; the unit tests use an in-memory
/// implementation with the same conditional-write semantics.
pub trait JobStore: JobExt + ApplicationExt + StatusLogExt + Send + Sync {}

impl<T> JobStore for T where T: JobExt + ApplicationExt + StatusLogExt + Send + Sync {}
