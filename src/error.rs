use conn_pool_mgr::BackendKind;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for callers that report errors as data.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   message: String,
}

/// Failure to load the settings file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
   /// The settings file could not be read.
   #[error("failed to read settings file {}: {source}", path.display())]
   Read {
      path: PathBuf,
      #[source]
      source: std::io::Error,
   },

   /// The settings are not valid YAML or do not match the expected shape.
   #[error("failed to parse settings: {0}")]
   Parse(#[from] serde_yaml::Error),
}

/// Error types for pool setup and use.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Settings could not be loaded.
   #[error(transparent)]
   Config(#[from] ConfigError),

   /// Error from the pool manager.
   #[error(transparent)]
   Pool(#[from] conn_pool_mgr::Error),

   /// The settings have no section for the requested backend.
   #[error("no {0} section in settings")]
   MissingSettings(BackendKind),
}

impl Error {
   /// Machine-readable error code.
   pub fn code(&self) -> &'static str {
      match self {
         Error::Config(_) => "CONFIG_ERROR",
         Error::Pool(e) => match e {
            conn_pool_mgr::Error::Connection { .. } => "CONNECTION_ERROR",
            conn_pool_mgr::Error::Close { .. } => "CLOSE_ERROR",
            conn_pool_mgr::Error::PoolClosed => "POOL_CLOSED",
            conn_pool_mgr::Error::UnknownBackend(_) => "UNKNOWN_BACKEND",
         },
         Error::MissingSettings(_) => "MISSING_SETTINGS",
      }
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      let response = ErrorResponse {
         code: self.code().to_string(),
         message: self.to_string(),
      };
      response.serialize(serializer)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_codes() {
      assert_eq!(Error::from(conn_pool_mgr::Error::PoolClosed).code(), "POOL_CLOSED");
      assert_eq!(Error::MissingSettings(BackendKind::SqlServer).code(), "MISSING_SETTINGS");

      let unknown = "oracle".parse::<BackendKind>().unwrap_err();
      assert_eq!(Error::from(unknown).code(), "UNKNOWN_BACKEND");

      let parse = serde_yaml::from_str::<u32>("not a number").unwrap_err();
      assert_eq!(Error::from(ConfigError::from(parse)).code(), "CONFIG_ERROR");
   }

   #[test]
   fn test_missing_settings_message() {
      assert_eq!(
         Error::MissingSettings(BackendKind::Postgres).to_string(),
         "no postgres section in settings"
      );
   }
}
