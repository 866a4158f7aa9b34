//! The connection pool to the relational store. The pool is the only
//! handle to the database: it is built once at startup, shared through
//! gotham's state data, and every operation checks a connection out
//! for the duration of a single transaction.

use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::RunQueryDsl;
use gotham::state::{FromState, State};
use gotham_derive::StateData;
use log::info;

pub use diesel::pg::PgConnection as Connection;

use crate::{config::Database, error::Error};

embed_migrations!();

pub type PooledConn = PooledConnection<ConnectionManager<Connection>>;

/// Applies a statement timeout to every connection the pool hands out,
/// so a stuck query cancels instead of stalling the request forever.
#[derive(Debug)]
struct StatementTimeout(u64);

impl CustomizeConnection<Connection, diesel::r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, connection: &mut Connection) -> Result<(), diesel::r2d2::Error> {
        diesel::sql_query(format!("SET statement_timeout = {}", self.0))
            .execute(connection)
            .map(|_| ())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// The shared connection pool, exposed as gotham state data.
#[derive(Clone, StateData)]
pub struct DbPool {
    pool: Pool<ConnectionManager<Connection>>,
}

impl std::panic::RefUnwindSafe for DbPool {}

impl DbPool {
    /// Builds the pool and runs any pending migrations.
    pub fn new(settings: &Database) -> Result<Self, failure::Error> {
        let manager = ConnectionManager::<Connection>::new(settings.url.as_str());
        let pool = Pool::builder()
            .max_size(settings.pool_size)
            .connection_timeout(std::time::Duration::from_millis(settings.connect_timeout_ms))
            .connection_customizer(Box::new(StatementTimeout(settings.statement_timeout_ms)))
            .build(manager)?;

        let connection = pool.get()?;
        embedded_migrations::run_with_output(&*connection, &mut std::io::stdout())?;
        info!("database pool ready ({} connections max)", settings.pool_size);

        Ok(DbPool { pool })
    }

    /// Checks a connection out of the pool.
    pub fn get(&self) -> Result<PooledConn, Error> {
        self.pool
            .get()
            .map_err(|e| Error::StoreUnavailable(e.to_string()))
    }

    pub fn from_state(state: &State) -> Result<PooledConn, Error> {
        Self::borrow_from(state).get()
    }
}
