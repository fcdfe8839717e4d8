//! Drivers open a DSN into a pooled handle and release it again
//!
//! The [`Driver`] trait is the seam between the pool manager and the actual
//! database client. Each backend has one implementation; tests substitute a
//! driver that records what it was asked to open.

use crate::Result;
use crate::config::PoolConfig;
use crate::dsn::{Dialect, Dsn};
use std::future::Future;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlserver")]
mod sqlserver;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlDriver, MySqlDsnParts};
#[cfg(feature = "postgres")]
pub use postgres::{PgDsnParts, PostgresDriver};
#[cfg(feature = "sqlserver")]
pub use sqlserver::{MssqlClient, MssqlPool, PooledClient, SqlServerDriver, SqlServerDsnParts};

/// Opens and releases connection handles for one backend dialect
pub trait Driver: Send + Sync + 'static {
   /// Dialect whose DSNs this driver understands
   type Dialect: Dialect;

   /// The pooled handle callers issue queries through. Cloning must be cheap
   /// and share the underlying pool.
   type Handle: Clone + Send + Sync + 'static;

   /// Open `dsn` with `config` limits applied.
   ///
   /// Failures, including a DSN the driver cannot parse, are reported as
   /// [`Error::Connection`](crate::Error::Connection) named after `dsn.name`.
   fn open(&self, dsn: &Dsn, config: &PoolConfig) -> impl Future<Output = Result<Self::Handle>> + Send;

   /// Release every connection held by `handle`
   fn close(&self, name: &str, handle: Self::Handle) -> impl Future<Output = Result<()>> + Send;
}

/// Applies pool limits to sqlx pool options.
///
/// sqlx has no cap on idle connections. No connections are kept open
/// eagerly; idle ones are dropped after the idle time, so `max_idle_conns`
/// has no sqlx counterpart.
#[cfg(any(feature = "mysql", feature = "postgres"))]
pub(crate) fn sqlx_pool_options<DB: sqlx::Database>(config: &PoolConfig) -> sqlx::pool::PoolOptions<DB> {
   let max_connections = match config.max_open_conns {
      0 => crate::config::DEFAULT_MAX_CONNECTIONS,
      n => n,
   };

   sqlx::pool::PoolOptions::<DB>::new()
      .max_connections(max_connections)
      .min_connections(0)
      .max_lifetime(config.max_lifetime())
      .idle_timeout(config.max_idle_time())
}

#[cfg(all(test, feature = "postgres"))]
mod tests {
   use super::*;
   use std::time::Duration;

   #[test]
   fn test_idle_limit_does_not_keep_connections_open() {
      let config = PoolConfig {
         max_open_conns: 20,
         max_idle_conns: 15,
         max_lifetime_hours: 1,
         max_idle_time_hours: 2,
         ..Default::default()
      };
      let options = sqlx_pool_options::<sqlx::Postgres>(&config);

      assert_eq!(options.get_max_connections(), 20);
      assert_eq!(options.get_min_connections(), 0);
      assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(3600)));
      assert_eq!(options.get_idle_timeout(), Some(Duration::from_secs(7200)));
   }

   #[test]
   fn test_unset_open_limit_uses_sqlx_default() {
      let options = sqlx_pool_options::<sqlx::Postgres>(&PoolConfig::default());

      assert_eq!(options.get_max_connections(), crate::config::DEFAULT_MAX_CONNECTIONS);
      assert_eq!(options.get_max_lifetime(), None);
      assert_eq!(options.get_idle_timeout(), None);
   }
}
