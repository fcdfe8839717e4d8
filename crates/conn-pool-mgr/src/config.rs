//! Pool limits and per-backend settings

use crate::descriptor::NamedConnections;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ONE_HOUR_SECS: u64 = 60 * 60;

/// Longer lifetimes (about a century) are treated as no limit. sqlx adds the
/// lifetime to `Instant::now()`, which must not overflow.
pub const MAX_LIMIT_HOURS: u64 = 100 * 365 * 24;

/// Pool size sqlx falls back to when no open-connection limit is configured
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Limits applied to the main connection and to every source/replica route
///
/// # Examples
///
/// ```
/// use conn_pool_mgr::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig {
///     max_open_conns: 100,
///     max_idle_conns: 10,
///     max_lifetime_hours: 1,
///     ..Default::default()
/// };
///
/// assert_eq!(config.max_lifetime(), Some(Duration::from_secs(3600)));
/// assert_eq!(config.max_idle_time(), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
   /// Maximum number of open connections. `0` means no explicit limit.
   pub max_open_conns: u32,

   /// Maximum number of idle connections kept around. Never more than the
   /// open limit when one is set. Only the SQL Server pool enforces it; sqlx
   /// pools keep no connections open eagerly and drop idle ones after
   /// `max_idle_time_hours`.
   pub max_idle_conns: u32,

   /// Maximum age of a connection, in hours. `0`, or anything above
   /// [`MAX_LIMIT_HOURS`], means connections never expire by age.
   pub max_lifetime_hours: u64,

   /// Maximum time a connection may sit idle, in hours. `0`, or anything
   /// above [`MAX_LIMIT_HOURS`], means idle connections never expire.
   pub max_idle_time_hours: u64,

   /// Whether sources/replicas from the settings are registered at open time
   pub read_write_split: bool,
}

impl PoolConfig {
   /// Maximum connection age as a duration, `None` when unlimited
   pub fn max_lifetime(&self) -> Option<Duration> {
      hours(self.max_lifetime_hours)
   }

   /// Maximum idle time as a duration, `None` when unlimited
   pub fn max_idle_time(&self) -> Option<Duration> {
      hours(self.max_idle_time_hours)
   }

   /// Idle connections to retain, clamped to the open-connection limit
   pub fn effective_idle_conns(&self) -> u32 {
      if self.max_open_conns == 0 {
         self.max_idle_conns
      } else {
         self.max_idle_conns.min(self.max_open_conns)
      }
   }
}

fn hours(count: u64) -> Option<Duration> {
   (count > 0 && count <= MAX_LIMIT_HOURS).then(|| Duration::from_secs(count * ONE_HOUR_SECS))
}

/// Settings block for one backend, as read from the settings file
///
/// Sources and replicas only take effect when `rws` is set, or when they are
/// passed to [`ConnectionPool::enable_read_write_split`] explicitly.
///
/// [`ConnectionPool::enable_read_write_split`]: crate::ConnectionPool::enable_read_write_split
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSettings<C> {
   #[serde(default)]
   pub max_open_conns: u32,

   #[serde(default)]
   pub max_idle_conns: u32,

   #[serde(default, rename = "maxLifetime", alias = "maxLifetimeHours")]
   pub max_lifetime_hours: u64,

   #[serde(default, rename = "maxIdleTime", alias = "maxIdleTimeHours")]
   pub max_idle_time_hours: u64,

   /// Read/write splitting across `sources` and `replicas`
   #[serde(default)]
   pub rws: bool,

   pub main: C,

   #[serde(default)]
   pub sources: NamedConnections<C>,

   #[serde(default)]
   pub replicas: NamedConnections<C>,
}

impl<C> BackendSettings<C> {
   /// Settings with no limits, no splitting and only a main connection
   pub fn new(main: C) -> Self {
      Self {
         max_open_conns: 0,
         max_idle_conns: 0,
         max_lifetime_hours: 0,
         max_idle_time_hours: 0,
         rws: false,
         main,
         sources: Default::default(),
         replicas: Default::default(),
      }
   }

   pub fn pool_config(&self) -> PoolConfig {
      PoolConfig {
         max_open_conns: self.max_open_conns,
         max_idle_conns: self.max_idle_conns,
         max_lifetime_hours: self.max_lifetime_hours,
         max_idle_time_hours: self.max_idle_time_hours,
         read_write_split: self.rws,
      }
   }
}
