//! Error types for conn-pool-mgr

use thiserror::Error;

/// Boxed error carried as the cause of connection and close failures
pub type BoxDynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that may occur when opening, routing or closing connection pools
#[derive(Error, Debug)]
pub enum Error {
   /// Opening a connection failed. Covers the main connection and every
   /// source/replica route, including DSNs the driver could not parse.
   #[error("failed to open connection `{name}`: {source}")]
   Connection {
      /// Name of the DSN being opened (`main`, or a source/replica key)
      name: String,
      #[source]
      source: BoxDynError,
   },

   /// Releasing an underlying connection resource failed
   #[error("failed to close connection `{name}`: {source}")]
   Close {
      /// Name of the DSN being released
      name: String,
      #[source]
      source: BoxDynError,
   },

   /// Pool has been closed and cannot be used
   #[error("connection pool has been closed")]
   PoolClosed,

   /// The backend name is not one of mysql, postgres or sqlserver
   #[error("unknown database backend `{0}`")]
   UnknownBackend(String),
}

impl Error {
   pub(crate) fn connection(name: impl Into<String>, source: impl Into<BoxDynError>) -> Self {
      Error::Connection {
         name: name.into(),
         source: source.into(),
      }
   }

   pub(crate) fn close(name: impl Into<String>, source: impl Into<BoxDynError>) -> Self {
      Error::Close {
         name: name.into(),
         source: source.into(),
      }
   }
}

/// A DSN that a driver could not interpret.
///
/// Always surfaces wrapped in [`Error::Connection`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DsnError {
   /// A required part of the DSN is absent
   #[error("missing {0}")]
   Missing(&'static str),

   /// A part of the DSN is present but malformed
   #[error("invalid {field}: `{value}`")]
   Invalid {
      /// Which part of the DSN was malformed
      field: &'static str,
      /// The offending text
      value: String,
   },
}

impl DsnError {
   pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
      DsnError::Invalid {
         field,
         value: value.into(),
      }
   }
}
