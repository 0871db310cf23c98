//! Data access for the pantry collections.
//!
//! - [`store`]: the document store abstraction and its backends.
//! - [`repository`]: the generic per-collection repository plus the
//!   fridge and shopping list query methods layered on top.
//! - [`config`]: store selection from the environment.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

pub mod config;
pub mod error;
pub mod repository;
pub mod store;

pub use config::{StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use repository::{BuyListRepo, Collection, Created, FridgeRepo};
pub use store::{DocumentStore, MemoryStore, PgDocumentStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the connection.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `migrations/`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Build the document store selected by `config`.
///
/// For PostgreSQL this connects, checks health and applies migrations.
pub async fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!(project = %config.project_id, "Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                StoreError::Backend("DATABASE_URL is required for the postgres backend".into())
            })?;
            let pool = create_pool(url, config.max_connections).await?;
            tracing::info!(project = %config.project_id, "Database connection pool created");

            health_check(&pool).await?;
            run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
    }
}
