//! `PostgreSQL` adapters for workspace persistence.
//!
//! Diesel calls are synchronous, so every query runs on the blocking pool
//! with a connection checked out of an r2d2 pool.

mod code_source;
mod models;
mod repository;
mod schema;

pub use code_source::PostgresCodeSourceRepository;
pub use repository::PostgresWorkspaceStore;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by workspace adapters.
pub type WorkspacePgPool = Pool<ConnectionManager<PgConnection>>;

/// Port error types that can carry a pool or join failure.
trait PersistenceError: Send + 'static {
    fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self;
}

async fn run_blocking<F, T, E>(pool: &WorkspacePgPool, f: F) -> Result<T, E>
where
    F: FnOnce(&mut PgConnection) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: PersistenceError,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(E::wrap)?;
        f(&mut connection)
    })
    .await
    .map_err(E::wrap)?
}
