//! PostgreSQL driver backed by a sqlx pool

use super::{Driver, sqlx_pool_options};
use crate::Result;
use crate::config::PoolConfig;
use crate::dsn::{Dsn, PostgresDialect};
use crate::error::{DsnError, Error};
use sqlx::Postgres;
use sqlx::postgres::{PgConnectOptions, PgPool, PgSslMode};
use std::str::FromStr;
use tracing::debug;

/// Opens [`PgPool`]s from libpq key/value DSNs
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

impl Driver for PostgresDriver {
   type Dialect = PostgresDialect;
   type Handle = PgPool;

   async fn open(&self, dsn: &Dsn, config: &PoolConfig) -> Result<PgPool> {
      let options = PgDsnParts::parse(&dsn.content)
         .map_err(|e| Error::connection(&dsn.name, e))?
         .connect_options();

      let pool = sqlx_pool_options::<Postgres>(config)
         .connect_with(options)
         .await
         .map_err(|e| Error::connection(&dsn.name, e))?;

      debug!(dsn = %dsn.name, "Opened PostgreSQL pool");
      Ok(pool)
   }

   async fn close(&self, name: &str, handle: PgPool) -> Result<()> {
      handle.close().await;
      debug!(dsn = %name, "Closed PostgreSQL pool");
      Ok(())
   }
}

/// The fields of a `host=H user=U password=P dbname=D port=P sslmode=S TimeZone=Z` DSN
///
/// Keys that are not connection parameters (such as `TimeZone`) are kept as
/// startup options and applied as server settings for every session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgDsnParts {
   pub host: Option<String>,
   pub port: Option<u16>,
   pub username: Option<String>,
   pub password: Option<String>,
   pub database: Option<String>,
   pub ssl_mode: Option<String>,
   pub options: Vec<(String, String)>,
}

impl PgDsnParts {
   /// Parse whitespace separated `key=value` pairs. Empty values are
   /// treated as absent.
   pub fn parse(dsn: &str) -> std::result::Result<Self, DsnError> {
      let mut parts = Self::default();

      for pair in dsn.split_whitespace() {
         let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| DsnError::invalid("key/value pair", pair))?;
         if value.is_empty() {
            continue;
         }

         match key {
            "host" => parts.host = Some(value.to_string()),
            "port" => {
               parts.port = Some(value.parse::<u16>().map_err(|_| DsnError::invalid("port", value))?)
            }
            "user" => parts.username = Some(value.to_string()),
            "password" => parts.password = Some(value.to_string()),
            "dbname" => parts.database = Some(value.to_string()),
            "sslmode" => {
               PgSslMode::from_str(value).map_err(|_| DsnError::invalid("sslmode", value))?;
               parts.ssl_mode = Some(value.to_string());
            }
            _ => parts.options.push((key.to_string(), value.to_string())),
         }
      }

      Ok(parts)
   }

   pub fn connect_options(&self) -> PgConnectOptions {
      let mut options = PgConnectOptions::new();

      if let Some(host) = &self.host {
         options = options.host(host);
      }
      if let Some(port) = self.port {
         options = options.port(port);
      }
      if let Some(username) = &self.username {
         options = options.username(username);
      }
      if let Some(password) = &self.password {
         options = options.password(password);
      }
      if let Some(database) = &self.database {
         options = options.database(database);
      }
      if let Some(mode) = self.ssl_mode.as_deref().and_then(|m| PgSslMode::from_str(m).ok()) {
         options = options.ssl_mode(mode);
      }
      if !self.options.is_empty() {
         options = options.options(self.options.iter().map(|(k, v)| (k.as_str(), v.as_str())));
      }

      options
   }
}
