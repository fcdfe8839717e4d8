//! MySQL driver backed by a sqlx pool

use super::{Driver, sqlx_pool_options};
use crate::Result;
use crate::config::PoolConfig;
use crate::dsn::{Dsn, MySqlDialect};
use crate::error::{DsnError, Error};
use sqlx::MySql;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool};
use tracing::debug;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3306;

/// Opens [`MySqlPool`]s from go-sql-driver style DSNs
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl Driver for MySqlDriver {
   type Dialect = MySqlDialect;
   type Handle = MySqlPool;

   async fn open(&self, dsn: &Dsn, config: &PoolConfig) -> Result<MySqlPool> {
      let options = MySqlDsnParts::parse(&dsn.content)
         .map_err(|e| Error::connection(&dsn.name, e))?
         .connect_options();

      let pool = sqlx_pool_options::<MySql>(config)
         .connect_with(options)
         .await
         .map_err(|e| Error::connection(&dsn.name, e))?;

      debug!(dsn = %dsn.name, "Opened MySQL pool");
      Ok(pool)
   }

   async fn close(&self, name: &str, handle: MySqlPool) -> Result<()> {
      // Waits for checked-out connections to be returned
      handle.close().await;
      debug!(dsn = %name, "Closed MySQL pool");
      Ok(())
   }
}

/// The fields of a `user:password@tcp(host:port)/database?params` DSN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlDsnParts {
   pub username: String,
   pub password: Option<String>,
   pub host: String,
   pub port: u16,
   pub database: String,
   pub charset: Option<String>,
   pub collation: Option<String>,
   /// `None` keeps the server's time zone (`loc=Local`)
   pub timezone: Option<String>,
}

impl MySqlDsnParts {
   /// Parse a DSN the way go-sql-driver does: the last `/` starts the
   /// database name and the last `@` before it ends the credentials, so
   /// passwords may contain either character.
   pub fn parse(dsn: &str) -> std::result::Result<Self, DsnError> {
      let slash = dsn.rfind('/').ok_or(DsnError::Missing("`/` before the database name"))?;
      let (head, tail) = (&dsn[..slash], &dsn[slash + 1..]);

      let (credentials, address) = match head.rsplit_once('@') {
         Some((credentials, address)) => (Some(credentials), address),
         None => (None, head),
      };

      let (username, password) = match credentials {
         Some(credentials) => match credentials.split_once(':') {
            Some((user, pass)) => (user.to_string(), Some(pass.to_string())),
            None => (credentials.to_string(), None),
         },
         None => (String::new(), None),
      };

      let (host, port) = parse_address(address)?;

      let (database, params) = tail.split_once('?').unwrap_or((tail, ""));

      let mut parts = Self {
         username,
         password,
         host,
         port,
         database: database.to_string(),
         charset: None,
         collation: None,
         timezone: None,
      };

      for (key, value) in params.split('&').filter_map(|pair| pair.split_once('=')) {
         match key {
            // go-sql-driver accepts a comma separated fallback list
            "charset" => {
               parts.charset = value.split(',').next().filter(|c| !c.is_empty()).map(str::to_string)
            }
            "collation" if !value.is_empty() => parts.collation = Some(value.to_string()),
            "loc" => {
               parts.timezone = match value {
                  "" | "Local" => None,
                  "UTC" => Some("+00:00".to_string()),
                  other => Some(other.to_string()),
               }
            }
            _ => {}
         }
      }

      Ok(parts)
   }

   pub fn connect_options(&self) -> MySqlConnectOptions {
      let mut options = MySqlConnectOptions::new()
         .host(&self.host)
         .port(self.port)
         .username(&self.username)
         .timezone(self.timezone.clone());

      if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
         options = options.password(password);
      }
      if !self.database.is_empty() {
         options = options.database(&self.database);
      }
      if let Some(charset) = &self.charset {
         options = options.charset(charset);
      }
      if let Some(collation) = &self.collation {
         options = options.collation(collation);
      }

      options
   }
}

/// `tcp(host:port)`, or an empty address for the local default
fn parse_address(address: &str) -> std::result::Result<(String, u16), DsnError> {
   if address.is_empty() {
      return Ok((DEFAULT_HOST.to_string(), DEFAULT_PORT));
   }

   let (protocol, rest) = address
      .split_once('(')
      .ok_or_else(|| DsnError::invalid("address", address))?;
   if protocol != "tcp" {
      return Err(DsnError::invalid("protocol", protocol));
   }
   let inner = rest
      .strip_suffix(')')
      .ok_or_else(|| DsnError::invalid("address", address))?;

   // Bracketed IPv6 literals contain colons of their own
   let (host, port) = match inner.rsplit_once(':') {
      Some((host, port)) if !host.ends_with(':') => (
         host,
         port.parse::<u16>().map_err(|_| DsnError::invalid("port", port))?,
      ),
      _ => (inner, DEFAULT_PORT),
   };

   let host = host.trim_start_matches('[').trim_end_matches(']');
   if host.is_empty() {
      return Err(DsnError::Missing("host"));
   }

   Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_parse_formatted_dsn() {
      let parts =
         MySqlDsnParts::parse("app:secret@tcp(db.internal:3307)/shop?charset=utf8mb4&parseTime=True&loc=Local")
            .unwrap();

      assert_eq!(
         parts,
         MySqlDsnParts {
            username: "app".into(),
            password: Some("secret".into()),
            host: "db.internal".into(),
            port: 3307,
            database: "shop".into(),
            charset: Some("utf8mb4".into()),
            collation: None,
            timezone: None,
         }
      );
   }

   #[test]
   fn test_password_may_contain_separators() {
      let parts = MySqlDsnParts::parse("app:p@ss:w/rd@tcp(h:3306)/d?charset=utf8").unwrap();

      assert_eq!(parts.username, "app");
      assert_eq!(parts.password.as_deref(), Some("p@ss:w/rd"));
      assert_eq!(parts.host, "h");
      assert_eq!(parts.database, "d");
   }

   #[test]
   fn test_ipv6_host_and_port_bounds() {
      let parts = MySqlDsnParts::parse("u:p@tcp([::1]:65535)/d").unwrap();
      assert_eq!((parts.host.as_str(), parts.port), ("::1", 65535));

      let parts = MySqlDsnParts::parse("u:p@tcp(h:0)/d").unwrap();
      assert_eq!(parts.port, 0);
   }

   #[test]
   fn test_address_defaults() {
      let parts = MySqlDsnParts::parse("u@/d").unwrap();
      assert_eq!(parts.host, DEFAULT_HOST);
      assert_eq!(parts.port, DEFAULT_PORT);
      assert_eq!(parts.password, None);

      let parts = MySqlDsnParts::parse("u:p@tcp(h)/d").unwrap();
      assert_eq!(parts.port, DEFAULT_PORT);
   }

   #[test]
   fn test_collation_and_location() {
      let parts = MySqlDsnParts::parse("u:p@tcp(h:1)/d?charset=utf8mb4,utf8&collation=utf8mb4_bin&loc=UTC").unwrap();

      assert_eq!(parts.charset.as_deref(), Some("utf8mb4"));
      assert_eq!(parts.collation.as_deref(), Some("utf8mb4_bin"));
      assert_eq!(parts.timezone.as_deref(), Some("+00:00"));
   }

   #[test]
   fn test_malformed_dsns() {
      assert_eq!(
         MySqlDsnParts::parse("u:p@tcp(h:3306)").unwrap_err(),
         DsnError::Missing("`/` before the database name")
      );
      assert_eq!(
         MySqlDsnParts::parse("u:p@tcp(h:70000)/d").unwrap_err(),
         DsnError::invalid("port", "70000")
      );
      assert_eq!(
         MySqlDsnParts::parse("u:p@unix(/tmp/mysql.sock)/d").unwrap_err(),
         DsnError::invalid("protocol", "unix")
      );
      assert_eq!(
         MySqlDsnParts::parse("u:p@tcp(:3306)/d").unwrap_err(),
         DsnError::Missing("host")
      );
   }
}
