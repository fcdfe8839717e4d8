//! # conn-pool-mgr
//!
//! Builds connection pools for MySQL, PostgreSQL and SQL Server from typed
//! settings, and splits reads and writes across replicas and sources.
//!
//! ## Core Types
//!
//! - **[`ConnectionPool`]**: Main connection plus optional read/write split routes
//! - **[`ConnectionHandle`]**: What callers query through; resolves reads and writes
//! - **[`BackendSettings`]**: Pool limits, main connection, sources and replicas
//! - **[`Driver`]**: Opens a DSN into a pooled handle; one per backend
//! - **[`PoolSlot`]**: Holds one pool per process and opens it only once
//! - **[`Error`]**: Error type for pool operations
//!
//! ## Architecture
//!
//! - **DSNs**: Each backend dialect formats its descriptor into a connection string
//! - **Drivers**: sqlx pools for MySQL and PostgreSQL, a bounded pool of tiberius
//!   clients for SQL Server
//! - **Read/write splitting**: Writes go to a source, reads to a replica; a side
//!   with nothing registered falls back to the main connection
//! - **Singletons**: [`new_mysql_pool`], [`new_postgres_pool`] and
//!   [`new_sql_server_pool`] return the same pool for the life of the process
//!
//! ## Usage
//!
//! ```no_run
//! use conn_pool_mgr::{BackendSettings, MySqlConnection, new_mysql_pool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> conn_pool_mgr::Result<()> {
//!     let mut settings = BackendSettings::new(MySqlConnection {
//!         username: "app".into(),
//!         password: "secret".into(),
//!         host: "10.0.0.1".into(),
//!         port: 3306,
//!         database: "shop".into(),
//!         charset: "utf8mb4".into(),
//!         ..Default::default()
//!     });
//!     settings.max_open_conns = 100;
//!     settings.max_idle_conns = 10;
//!     settings.rws = true;
//!     settings.replicas.insert(
//!         "replica-1".into(),
//!         MySqlConnection {
//!             host: "10.0.0.2".into(),
//!             ..settings.main.clone()
//!         },
//!     );
//!
//!     // Opens once; later calls return the same pool
//!     let pool = new_mysql_pool(&settings).await?;
//!     let again = new_mysql_pool(&settings).await?;
//!     assert!(Arc::ptr_eq(&pool, &again));
//!
//!     let conn = pool.get_connection()?;
//!
//!     // Reads go to replica-1, writes to the main connection
//!     sqlx::query("SELECT * FROM orders").fetch_all(conn.reader()).await.ok();
//!     sqlx::query("DELETE FROM carts").execute(conn.writer()).await.ok();
//!
//!     pool.close().await?;
//!     Ok(())
//! }
//! ```
//!
mod config;
mod descriptor;
mod driver;
mod dsn;
mod error;
mod policy;
mod pool;
mod registry;
mod resolver;

// Re-export public types
pub use config::{BackendSettings, DEFAULT_MAX_CONNECTIONS, MAX_LIMIT_HOURS, PoolConfig};
pub use descriptor::{MySqlConnection, NamedConnections, PostgresConnection, SqlServerConnection};
pub use driver::Driver;
pub use dsn::{
   BackendKind, Dialect, Dsn, MAIN_DSN_NAME, MySqlDialect, PostgresDialect, SqlServerDialect, build_dsn,
};
pub use error::{BoxDynError, DsnError, Error};
pub use policy::{Policy, RandomPolicy, RoundRobinPolicy};
pub use pool::{ConnectionHandle, ConnectionOf, ConnectionPool};
pub use registry::PoolSlot;
pub use resolver::{Operation, Resolver, Route};

#[cfg(feature = "mysql")]
pub use driver::{MySqlDriver, MySqlDsnParts};
#[cfg(feature = "mysql")]
pub use pool::MySqlConnPool;
#[cfg(feature = "mysql")]
pub use registry::new_mysql_pool;

#[cfg(feature = "postgres")]
pub use driver::{PgDsnParts, PostgresDriver};
#[cfg(feature = "postgres")]
pub use pool::PostgresConnPool;
#[cfg(feature = "postgres")]
pub use registry::new_postgres_pool;

#[cfg(feature = "sqlserver")]
pub use driver::{MssqlClient, MssqlPool, PooledClient, SqlServerDriver, SqlServerDsnParts};
#[cfg(feature = "sqlserver")]
pub use pool::SqlServerConnPool;
#[cfg(feature = "sqlserver")]
pub use registry::new_sql_server_pool;

// Re-export sqlx so callers can run queries against the pooled handles
pub use sqlx;

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
