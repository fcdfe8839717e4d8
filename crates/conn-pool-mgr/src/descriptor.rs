//! Connection descriptors: credentials and endpoint of one backend

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-named connection descriptors, used for the `sources` and `replicas`
/// groups of read/write splitting. Iteration order carries no meaning.
pub type NamedConnections<C> = HashMap<String, C>;

/// A MySQL endpoint
///
/// # Examples
///
/// ```
/// use conn_pool_mgr::MySqlConnection;
///
/// let main = MySqlConnection {
///     username: "app".into(),
///     password: "secret".into(),
///     host: "127.0.0.1".into(),
///     port: 3306,
///     database: "shop".into(),
///     charset: "utf8mb4".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlConnection {
   pub username: String,
   pub password: String,
   pub host: String,
   pub port: u16,
   pub database: String,
   /// Connection character set, e.g. `utf8mb4`
   pub charset: String,
   /// Connection collation. Not part of the DSN template.
   pub collation: String,
}

/// A PostgreSQL endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConnection {
   pub username: String,
   pub password: String,
   pub host: String,
   pub port: u16,
   pub database: String,
   /// Session time zone, sent as the `TimeZone` startup option
   #[serde(alias = "timeZone")]
   pub timezone: String,
   /// libpq SSL mode (`disable`, `prefer`, `require`, ...)
   #[serde(rename = "sslmode", alias = "sslMode")]
   pub ssl_mode: String,
}

/// A SQL Server endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlServerConnection {
   pub username: String,
   /// Percent-encoded when formatted into the DSN, so it may contain any character
   pub password: String,
   pub host: String,
   pub port: u16,
   pub database: String,
}
