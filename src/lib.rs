//! # db-pool
//!
//! Connection pools for MySQL, PostgreSQL and SQL Server, configured from a
//! YAML settings file.
//!
//! ```no_run
//! use db_pool::{connect, load_settings};
//!
//! # async fn example() -> db_pool::Result<()> {
//! let settings = load_settings("./settings")?;
//!
//! // Opens the backend named by `common.driver`; later calls return the same pool
//! let pool = connect(&settings).await?;
//!
//! if let Some(mysql) = pool.as_mysql() {
//!    let conn = mysql.get_connection()?;
//!    db_pool::conn_pool_mgr::sqlx::query("SELECT 1")
//!       .execute(conn.reader())
//!       .await
//!       .ok();
//! }
//!
//! pool.close().await?;
//! # Ok(())
//! # }
//! ```

use conn_pool_mgr::BackendKind;
use std::sync::Arc;

#[cfg(not(any(feature = "mysql", feature = "postgres", feature = "sqlserver")))]
compile_error!("enable at least one of the `mysql`, `postgres` or `sqlserver` features");

mod error;
mod settings;

pub use conn_pool_mgr;
pub use error::{ConfigError, Error, Result};
pub use settings::{Common, DbSettings, SETTINGS_FILE_NAME, load_settings};

#[cfg(feature = "mysql")]
use conn_pool_mgr::{MySqlConnPool, new_mysql_pool};
#[cfg(feature = "postgres")]
use conn_pool_mgr::{PostgresConnPool, new_postgres_pool};
#[cfg(feature = "sqlserver")]
use conn_pool_mgr::{SqlServerConnPool, new_sql_server_pool};

/// The process-wide pool of one backend.
#[derive(Debug, Clone)]
pub enum DbPool {
   #[cfg(feature = "mysql")]
   MySql(Arc<MySqlConnPool>),
   #[cfg(feature = "postgres")]
   Postgres(Arc<PostgresConnPool>),
   #[cfg(feature = "sqlserver")]
   SqlServer(Arc<SqlServerConnPool>),
}

impl DbPool {
   pub fn kind(&self) -> BackendKind {
      match self {
         #[cfg(feature = "mysql")]
         DbPool::MySql(pool) => pool.kind(),
         #[cfg(feature = "postgres")]
         DbPool::Postgres(pool) => pool.kind(),
         #[cfg(feature = "sqlserver")]
         DbPool::SqlServer(pool) => pool.kind(),
      }
   }

   pub fn is_closed(&self) -> bool {
      match self {
         #[cfg(feature = "mysql")]
         DbPool::MySql(pool) => pool.is_closed(),
         #[cfg(feature = "postgres")]
         DbPool::Postgres(pool) => pool.is_closed(),
         #[cfg(feature = "sqlserver")]
         DbPool::SqlServer(pool) => pool.is_closed(),
      }
   }

   /// Close the pool and every read/write split route
   pub async fn close(&self) -> Result<()> {
      match self {
         #[cfg(feature = "mysql")]
         DbPool::MySql(pool) => pool.close().await?,
         #[cfg(feature = "postgres")]
         DbPool::Postgres(pool) => pool.close().await?,
         #[cfg(feature = "sqlserver")]
         DbPool::SqlServer(pool) => pool.close().await?,
      }
      Ok(())
   }

   #[cfg(feature = "mysql")]
   pub fn as_mysql(&self) -> Option<&Arc<MySqlConnPool>> {
      match self {
         DbPool::MySql(pool) => Some(pool),
         #[allow(unreachable_patterns)]
         _ => None,
      }
   }

   #[cfg(feature = "postgres")]
   pub fn as_postgres(&self) -> Option<&Arc<PostgresConnPool>> {
      match self {
         DbPool::Postgres(pool) => Some(pool),
         #[allow(unreachable_patterns)]
         _ => None,
      }
   }

   #[cfg(feature = "sqlserver")]
   pub fn as_sql_server(&self) -> Option<&Arc<SqlServerConnPool>> {
      match self {
         DbPool::SqlServer(pool) => Some(pool),
         #[allow(unreachable_patterns)]
         _ => None,
      }
   }
}

/// Open the pool for `kind` from its section of `settings`.
///
/// The pool is opened once per process; later calls return it unchanged.
/// Fails with [`Error::MissingSettings`] when `settings` has no section for
/// `kind`.
pub async fn new_pool(kind: BackendKind, settings: &DbSettings) -> Result<DbPool> {
   match kind {
      #[cfg(feature = "mysql")]
      BackendKind::MySql => {
         let section = settings.mysql.as_ref().ok_or(Error::MissingSettings(kind))?;
         Ok(DbPool::MySql(new_mysql_pool(section).await?))
      }
      #[cfg(feature = "postgres")]
      BackendKind::Postgres => {
         let section = settings.postgres.as_ref().ok_or(Error::MissingSettings(kind))?;
         Ok(DbPool::Postgres(new_postgres_pool(section).await?))
      }
      #[cfg(feature = "sqlserver")]
      BackendKind::SqlServer => {
         let section = settings.sql_server.as_ref().ok_or(Error::MissingSettings(kind))?;
         Ok(DbPool::SqlServer(new_sql_server_pool(section).await?))
      }
      #[allow(unreachable_patterns)]
      _ => Err(conn_pool_mgr::Error::UnknownBackend(kind.to_string()).into()),
   }
}

/// Open the pool for the backend named by `common.driver`
pub async fn connect(settings: &DbSettings) -> Result<DbPool> {
   new_pool(settings.driver()?, settings).await
}
