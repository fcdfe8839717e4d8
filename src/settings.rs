//! Settings file loading

use crate::error::{ConfigError, Result};
use conn_pool_mgr::{BackendKind, BackendSettings, MySqlConnection, PostgresConnection, SqlServerConnection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// File name looked up when [`load_settings`] is given a directory
pub const SETTINGS_FILE_NAME: &str = "db.yaml";

/// Which backend to connect to by default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Common {
   /// `mysql`, `postgres` or `sqlserver`
   #[serde(default)]
   pub driver: String,
}

/// The whole settings file: one optional section per backend.
///
/// ```
/// use db_pool::DbSettings;
/// use db_pool::conn_pool_mgr::BackendKind;
///
/// let settings = DbSettings::from_yaml_str(
///    r#"
/// common:
///   driver: mysql
/// mysql:
///   maxOpenConns: 100
///   main:
///     username: app
///     password: secret
///     host: 127.0.0.1
///     port: 3306
///     database: shop
///     charset: utf8mb4
/// "#,
/// )
/// .unwrap();
///
/// assert_eq!(settings.driver().unwrap(), BackendKind::MySql);
/// assert_eq!(settings.mysql.unwrap().max_open_conns, 100);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSettings {
   #[serde(default)]
   pub common: Option<Common>,

   #[serde(default)]
   pub mysql: Option<BackendSettings<MySqlConnection>>,

   #[serde(default)]
   pub postgres: Option<BackendSettings<PostgresConnection>>,

   #[serde(default)]
   pub sql_server: Option<BackendSettings<SqlServerConnection>>,
}

impl DbSettings {
   /// Load settings from a YAML file, or from `db.yaml` inside a directory
   pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
      let path = path.as_ref();
      let path = if path.is_dir() {
         path.join(SETTINGS_FILE_NAME)
      } else {
         path.to_path_buf()
      };

      let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
         path: path.clone(),
         source,
      })?;

      let settings = Self::from_yaml_str(&text)?;
      debug!(path = %path.display(), "Loaded database settings");
      Ok(settings)
   }

   pub fn from_yaml_str(text: &str) -> std::result::Result<Self, ConfigError> {
      Ok(serde_yaml::from_str(text)?)
   }

   /// The backend named by `common.driver`
   pub fn driver(&self) -> Result<BackendKind> {
      let name = self.common.as_ref().map(|c| c.driver.as_str()).unwrap_or_default();
      Ok(name.parse::<BackendKind>()?)
   }

   /// Whether there is a section for `kind`
   pub fn has_backend(&self, kind: BackendKind) -> bool {
      match kind {
         BackendKind::MySql => self.mysql.is_some(),
         BackendKind::Postgres => self.postgres.is_some(),
         BackendKind::SqlServer => self.sql_server.is_some(),
      }
   }
}

/// Load settings from a YAML file, or from `db.yaml` inside a directory
pub fn load_settings(path: impl AsRef<Path>) -> std::result::Result<DbSettings, ConfigError> {
   DbSettings::load(path)
}
