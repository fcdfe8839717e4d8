//! Connection pool owning the main handle and the read/write split routes

use crate::Result;
use crate::config::{BackendSettings, PoolConfig};
use crate::descriptor::NamedConnections;
use crate::driver::Driver;
use crate::dsn::{BackendKind, Dialect, Dsn, MAIN_DSN_NAME, build_dsn};
use crate::error::Error;
use crate::policy::{Policy, RandomPolicy};
use crate::resolver::{Operation, Resolver};
use parking_lot::RwLock;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Descriptor type accepted by the pool for driver `D`
pub type ConnectionOf<D> = <<D as Driver>::Dialect as Dialect>::Connection;

/// A pool of connections to one backend.
///
/// Holds the main handle and, once read/write splitting is enabled, a
/// resolver over the source and replica routes. Every handle is opened with
/// the same [`PoolConfig`] limits.
///
/// # Example
///
/// ```no_run
/// use conn_pool_mgr::{BackendSettings, MySqlConnection, MySqlDriver, ConnectionPool};
///
/// # async fn example() -> Result<(), conn_pool_mgr::Error> {
/// let settings = BackendSettings::new(MySqlConnection {
///     username: "app".into(),
///     password: "secret".into(),
///     host: "127.0.0.1".into(),
///     port: 3306,
///     database: "shop".into(),
///     charset: "utf8mb4".into(),
///     ..Default::default()
/// });
///
/// let pool = ConnectionPool::open(&settings, MySqlDriver).await?;
/// let conn = pool.get_connection()?;
///
/// sqlx::query("SELECT 1").execute(conn.reader()).await.ok();
///
/// pool.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionPool<D: Driver> {
   driver: D,
   config: PoolConfig,
   main_dsn: Dsn,
   policy: Arc<dyn Policy>,

   /// `None` once the pool has been closed
   state: RwLock<Option<PoolState<D::Handle>>>,

   /// Serializes registration and close
   registration: Mutex<()>,
}

struct PoolState<H> {
   main: H,
   resolver: Option<Arc<Resolver<H>>>,
}

impl<D: Driver> ConnectionPool<D> {
   /// Open the main connection described by `settings`, choosing routes at random
   ///
   /// When `settings.rws` is set the sources and replicas are registered as
   /// part of opening. If any of them fails to open, the main handle is
   /// released again and the error returned.
   pub async fn open(settings: &BackendSettings<ConnectionOf<D>>, driver: D) -> Result<Self> {
      Self::open_with_policy(settings, driver, Arc::new(RandomPolicy)).await
   }

   /// Same as [`open`](Self::open), selecting routes with `policy`
   pub async fn open_with_policy(
      settings: &BackendSettings<ConnectionOf<D>>,
      driver: D,
      policy: Arc<dyn Policy>,
   ) -> Result<Self> {
      let config = settings.pool_config();
      let main_dsn = build_dsn::<D::Dialect>(MAIN_DSN_NAME, &settings.main);

      let main = driver.open(&main_dsn, &config).await?;

      let resolver = if config.read_write_split {
         let registered = Resolver::register(
            &driver,
            &config,
            &settings.sources,
            &settings.replicas,
            Arc::clone(&policy),
            None,
         )
         .await;

         match registered {
            Ok(registration) => Some(Arc::new(registration.resolver)),
            Err(e) => {
               if let Err(close_err) = driver.close(MAIN_DSN_NAME, main).await {
                  warn!(error = %close_err, "Failed to release main connection after registration error");
               }
               return Err(e);
            }
         }
      } else {
         None
      };

      info!(
         backend = %Self::kind_of(),
         read_write_split = resolver.is_some(),
         max_open_conns = config.max_open_conns,
         max_idle_conns = config.max_idle_conns,
         "Opened connection pool"
      );

      Ok(Self {
         driver,
         config,
         main_dsn,
         policy,
         state: RwLock::new(Some(PoolState { main, resolver })),
         registration: Mutex::new(()),
      })
   }

   fn kind_of() -> BackendKind {
      <D::Dialect as Dialect>::KIND
   }

   /// Get a handle to the main connection and any registered routes
   ///
   /// Returns [`Error::PoolClosed`] after [`close`](Self::close).
   pub fn get_connection(&self) -> Result<ConnectionHandle<D::Handle>> {
      let state = self.state.read();
      let state = state.as_ref().ok_or(Error::PoolClosed)?;

      Ok(ConnectionHandle {
         main: state.main.clone(),
         resolver: state.resolver.clone(),
      })
   }

   /// Register `sources` for writes and `replicas` for reads.
   ///
   /// Replaces any earlier registration. Routes whose DSN is already
   /// registered keep their open handle; routes that are no longer named are
   /// released once the new registration is in place. On failure the
   /// previous registration stays active.
   pub async fn enable_read_write_split(
      &self,
      sources: &NamedConnections<ConnectionOf<D>>,
      replicas: &NamedConnections<ConnectionOf<D>>,
   ) -> Result<ConnectionHandle<D::Handle>> {
      let _guard = self.registration.lock().await;

      let (main, previous) = {
         let state = self.state.read();
         let state = state.as_ref().ok_or(Error::PoolClosed)?;
         (state.main.clone(), state.resolver.clone())
      };

      let registration = Resolver::register(
         &self.driver,
         &self.config,
         sources,
         replicas,
         Arc::clone(&self.policy),
         previous.as_deref(),
      )
      .await?;

      let resolver = Arc::new(registration.resolver);

      // Close is serialized with registration, so the state is still present
      if let Some(state) = self.state.write().as_mut() {
         state.resolver = Some(Arc::clone(&resolver));
      }

      for route in registration.retired {
         let (dsn, handle) = route.into_parts();
         if let Err(e) = self.driver.close(&dsn.name, handle).await {
            warn!(dsn = %dsn.name, error = %e, "Failed to release retired route");
         }
      }

      Ok(ConnectionHandle {
         main,
         resolver: Some(resolver),
      })
   }

   /// Close the main connection and every route.
   ///
   /// Every handle is released even if an earlier one fails; the first
   /// failure is returned. Closing a pool twice returns [`Error::PoolClosed`].
   pub async fn close(&self) -> Result<()> {
      let _guard = self.registration.lock().await;

      let state = self.state.write().take().ok_or(Error::PoolClosed)?;
      let mut first_error = None;

      let mut record = |name: &str, result: Result<()>| {
         if let Err(e) = result {
            error!(dsn = %name, error = %e, "Failed to close connection");
            first_error.get_or_insert(e);
         }
      };

      let result = self.driver.close(MAIN_DSN_NAME, state.main).await;
      record(MAIN_DSN_NAME, result);

      if let Some(resolver) = state.resolver {
         for route in resolver.routes() {
            let result = self.driver.close(route.name(), route.handle().clone()).await;
            record(route.name(), result);
         }
      }

      info!(backend = %Self::kind_of(), "Closed connection pool");

      match first_error {
         Some(e) => Err(e),
         None => Ok(()),
      }
   }

   pub fn kind(&self) -> BackendKind {
      Self::kind_of()
   }

   pub fn config(&self) -> &PoolConfig {
      &self.config
   }

   /// DSN of the main connection
   pub fn main_dsn(&self) -> &Dsn {
      &self.main_dsn
   }

   pub fn driver(&self) -> &D {
      &self.driver
   }

   pub fn is_closed(&self) -> bool {
      self.state.read().is_none()
   }
}

impl<D: Driver> fmt::Debug for ConnectionPool<D> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("ConnectionPool")
         .field("kind", &self.kind())
         .field("main_dsn", &self.main_dsn)
         .field("config", &self.config)
         .field("policy", &self.policy)
         .field("closed", &self.is_closed())
         .finish()
   }
}

/// The main handle plus the resolver registered when it was obtained.
///
/// Cheap to clone. Dereferences to the main handle.
#[derive(Debug, Clone)]
pub struct ConnectionHandle<H> {
   main: H,
   resolver: Option<Arc<Resolver<H>>>,
}

impl<H> ConnectionHandle<H> {
   pub fn main(&self) -> &H {
      &self.main
   }

   /// Handle for `op`. Without read/write splitting this is always the main handle.
   pub fn resolve(&self, op: Operation) -> &H {
      match &self.resolver {
         Some(resolver) => resolver.resolve(op, &self.main),
         None => {
            debug!(operation = %op, route = %MAIN_DSN_NAME, "Resolved connection");
            &self.main
         }
      }
   }

   /// Handle for statements that modify data
   pub fn writer(&self) -> &H {
      self.resolve(Operation::Write)
   }

   /// Handle for read-only statements
   pub fn reader(&self) -> &H {
      self.resolve(Operation::Read)
   }

   pub fn is_read_write_split(&self) -> bool {
      self.resolver.is_some()
   }

   pub fn resolver(&self) -> Option<&Resolver<H>> {
      self.resolver.as_deref()
   }

   /// Names of the registered sources, in registration order
   pub fn source_names(&self) -> Vec<&str> {
      self.resolver
         .as_ref()
         .map(|r| r.sources().iter().map(|route| route.name()).collect())
         .unwrap_or_default()
   }

   /// Names of the registered replicas, in registration order
   pub fn replica_names(&self) -> Vec<&str> {
      self.resolver
         .as_ref()
         .map(|r| r.replicas().iter().map(|route| route.name()).collect())
         .unwrap_or_default()
   }
}

impl<H> Deref for ConnectionHandle<H> {
   type Target = H;

   fn deref(&self) -> &H {
      &self.main
   }
}

#[cfg(feature = "mysql")]
pub type MySqlConnPool = ConnectionPool<crate::driver::MySqlDriver>;

#[cfg(feature = "postgres")]
pub type PostgresConnPool = ConnectionPool<crate::driver::PostgresDriver>;

#[cfg(feature = "sqlserver")]
pub type SqlServerConnPool = ConnectionPool<crate::driver::SqlServerDriver>;
