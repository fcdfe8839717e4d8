//! Process-wide pool slots, one per backend kind

use crate::Result;
use crate::config::BackendSettings;
use crate::driver::Driver;
use crate::policy::{Policy, RandomPolicy};
use crate::pool::{ConnectionOf, ConnectionPool};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Holds at most one open pool.
///
/// The first [`get_or_open`](Self::get_or_open) opens the pool; every later
/// call returns the same instance and ignores its settings. Concurrent first
/// calls wait on each other, so the pool is opened once and nobody sees it
/// before it is fully configured. A failed open leaves the slot empty so the
/// next call retries. A pool that has been closed stays in the slot; callers
/// get it back and its [`get_connection`](ConnectionPool::get_connection)
/// reports [`Error::PoolClosed`](crate::Error::PoolClosed).
pub struct PoolSlot<D: Driver> {
   pool: Mutex<Option<Arc<ConnectionPool<D>>>>,
}

impl<D: Driver> PoolSlot<D> {
   pub fn new() -> Self {
      Self {
         pool: Mutex::new(None),
      }
   }

   pub async fn get_or_open(
      &self,
      settings: &BackendSettings<ConnectionOf<D>>,
      driver: D,
   ) -> Result<Arc<ConnectionPool<D>>> {
      self.get_or_open_with_policy(settings, driver, Arc::new(RandomPolicy)).await
   }

   pub async fn get_or_open_with_policy(
      &self,
      settings: &BackendSettings<ConnectionOf<D>>,
      driver: D,
      policy: Arc<dyn Policy>,
   ) -> Result<Arc<ConnectionPool<D>>> {
      // Held across the open so racing callers wait for the first one
      let mut slot = self.pool.lock().await;

      if let Some(pool) = slot.as_ref() {
         debug!(backend = %pool.kind(), closed = pool.is_closed(), "Reusing connection pool");
         return Ok(Arc::clone(pool));
      }

      let pool = Arc::new(ConnectionPool::open_with_policy(settings, driver, policy).await?);
      *slot = Some(Arc::clone(&pool));

      Ok(pool)
   }

   /// The pool in this slot, if one has been opened. It may since have been closed.
   pub async fn get(&self) -> Option<Arc<ConnectionPool<D>>> {
      self.pool.lock().await.as_ref().map(Arc::clone)
   }
}

impl<D: Driver> Default for PoolSlot<D> {
   fn default() -> Self {
      Self::new()
   }
}

#[cfg(feature = "mysql")]
mod mysql_slot {
   use super::*;
   use crate::descriptor::MySqlConnection;
   use crate::driver::MySqlDriver;
   use std::sync::LazyLock;

   static MYSQL_POOL: LazyLock<PoolSlot<MySqlDriver>> = LazyLock::new(PoolSlot::new);

   /// Open the process-wide MySQL pool, or return it if it is already open
   pub async fn new_mysql_pool(
      settings: &BackendSettings<MySqlConnection>,
   ) -> Result<Arc<ConnectionPool<MySqlDriver>>> {
      MYSQL_POOL.get_or_open(settings, MySqlDriver).await
   }
}

#[cfg(feature = "postgres")]
mod postgres_slot {
   use super::*;
   use crate::descriptor::PostgresConnection;
   use crate::driver::PostgresDriver;
   use std::sync::LazyLock;

   static POSTGRES_POOL: LazyLock<PoolSlot<PostgresDriver>> = LazyLock::new(PoolSlot::new);

   /// Open the process-wide PostgreSQL pool, or return it if it is already open
   pub async fn new_postgres_pool(
      settings: &BackendSettings<PostgresConnection>,
   ) -> Result<Arc<ConnectionPool<PostgresDriver>>> {
      POSTGRES_POOL.get_or_open(settings, PostgresDriver).await
   }
}

#[cfg(feature = "sqlserver")]
mod sqlserver_slot {
   use super::*;
   use crate::descriptor::SqlServerConnection;
   use crate::driver::SqlServerDriver;
   use std::sync::LazyLock;

   static SQL_SERVER_POOL: LazyLock<PoolSlot<SqlServerDriver>> = LazyLock::new(PoolSlot::new);

   /// Open the process-wide SQL Server pool, or return it if it is already open
   pub async fn new_sql_server_pool(
      settings: &BackendSettings<SqlServerConnection>,
   ) -> Result<Arc<ConnectionPool<SqlServerDriver>>> {
      SQL_SERVER_POOL.get_or_open(settings, SqlServerDriver).await
   }
}

#[cfg(feature = "mysql")]
pub use mysql_slot::new_mysql_pool;
#[cfg(feature = "postgres")]
pub use postgres_slot::new_postgres_pool;
#[cfg(feature = "sqlserver")]
pub use sqlserver_slot::new_sql_server_pool;
