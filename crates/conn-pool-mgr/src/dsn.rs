//! DSN construction per backend dialect

use crate::descriptor::{MySqlConnection, PostgresConnection, SqlServerConnection};
use crate::error::Error;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;

/// Name given to the DSN of the main connection
pub const MAIN_DSN_NAME: &str = "main";

/// Backend kinds supported by the pool manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
   MySql,
   Postgres,
   SqlServer,
}

impl BackendKind {
   pub fn as_str(&self) -> &'static str {
      match self {
         BackendKind::MySql => "mysql",
         BackendKind::Postgres => "postgres",
         BackendKind::SqlServer => "sqlserver",
      }
   }
}

impl fmt::Display for BackendKind {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

impl FromStr for BackendKind {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self, Self::Err> {
      match s.trim().to_ascii_lowercase().as_str() {
         "mysql" => Ok(BackendKind::MySql),
         "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
         "sqlserver" | "sql_server" | "mssql" => Ok(BackendKind::SqlServer),
         _ => Err(Error::UnknownBackend(s.to_string())),
      }
   }
}

/// A named, fully formatted connection string
///
/// `Debug` never prints the content since it embeds the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
   /// `main`, or the source/replica key the DSN was built from
   pub name: String,
   /// The connection string handed to the driver
   pub content: String,
}

impl Dsn {
   pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
      Self {
         name: name.into(),
         content: content.into(),
      }
   }
}

impl fmt::Debug for Dsn {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Dsn")
         .field("name", &self.name)
         .field("content", &"<redacted>")
         .finish()
   }
}

/// A backend dialect: its descriptor type and its DSN template.
///
/// Formatting is pure. Nothing is validated here; a malformed DSN surfaces
/// when the driver opens it.
pub trait Dialect: Send + Sync + 'static {
   const KIND: BackendKind;

   /// Descriptor of one endpoint of this backend
   type Connection: Clone + fmt::Debug + Send + Sync + DeserializeOwned + 'static;

   fn format_dsn(conn: &Self::Connection) -> String;
}

/// Build the DSN named `name` for `conn`
///
/// # Examples
///
/// ```
/// use conn_pool_mgr::{MySqlConnection, MySqlDialect, build_dsn};
///
/// let conn = MySqlConnection {
///     username: "u".into(),
///     password: "p".into(),
///     host: "h".into(),
///     port: 3306,
///     database: "d".into(),
///     charset: "utf8mb4".into(),
///     ..Default::default()
/// };
/// let dsn = build_dsn::<MySqlDialect>("main", &conn);
/// assert_eq!(dsn.content, "u:p@tcp(h:3306)/d?charset=utf8mb4&parseTime=True&loc=Local");
/// ```
pub fn build_dsn<D: Dialect>(name: impl Into<String>, conn: &D::Connection) -> Dsn {
   Dsn::new(name, D::format_dsn(conn))
}

/// MySQL, in go-sql-driver DSN syntax
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
   const KIND: BackendKind = BackendKind::MySql;
   type Connection = MySqlConnection;

   fn format_dsn(conn: &MySqlConnection) -> String {
      format!(
         "{}:{}@tcp({}:{})/{}?charset={}&parseTime=True&loc=Local",
         conn.username, conn.password, conn.host, conn.port, conn.database, conn.charset
      )
   }
}

/// PostgreSQL, in libpq key/value syntax
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
   const KIND: BackendKind = BackendKind::Postgres;
   type Connection = PostgresConnection;

   fn format_dsn(conn: &PostgresConnection) -> String {
      format!(
         "host={} user={} password={} dbname={} port={} sslmode={} TimeZone={}",
         conn.host,
         conn.username,
         conn.password,
         conn.database,
         conn.port,
         conn.ssl_mode,
         conn.timezone
      )
   }
}

/// Characters escaped in the user info of a `sqlserver://` URL: everything
/// except RFC 3986 unreserved characters
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// SQL Server, in `sqlserver://` URL syntax
///
/// The username and password are percent-encoded, so any character may
/// appear in them. Credentials made of unreserved characters are formatted
/// unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
   const KIND: BackendKind = BackendKind::SqlServer;
   type Connection = SqlServerConnection;

   fn format_dsn(conn: &SqlServerConnection) -> String {
      format!(
         "sqlserver://{}:{}@{}:{}?database={}",
         utf8_percent_encode(&conn.username, USERINFO),
         utf8_percent_encode(&conn.password, USERINFO),
         conn.host,
         conn.port,
         conn.database
      )
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_backend_kind_parsing() {
      assert_eq!("mysql".parse::<BackendKind>().unwrap(), BackendKind::MySql);
      assert_eq!("MySQL".parse::<BackendKind>().unwrap(), BackendKind::MySql);
      assert_eq!("postgresql".parse::<BackendKind>().unwrap(), BackendKind::Postgres);
      assert_eq!("mssql".parse::<BackendKind>().unwrap(), BackendKind::SqlServer);

      let err = "oracle".parse::<BackendKind>().unwrap_err();
      assert!(matches!(err, Error::UnknownBackend(ref name) if name == "oracle"));
   }

   #[test]
   fn test_dsn_debug_hides_content() {
      let dsn = Dsn::new("main", "u:hunter2@tcp(h:1)/d");
      let printed = format!("{:?}", dsn);

      assert!(printed.contains("main"));
      assert!(!printed.contains("hunter2"));
   }
}
