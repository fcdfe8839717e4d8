//! Driver double that records what the pool asks it to open and close

#![allow(dead_code)]

use conn_pool_mgr::{Dialect, Driver, Dsn, Error, PoolConfig, Result};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHandle {
   pub id: usize,
   pub name: String,
   pub dsn: String,
}

#[derive(Debug, Default)]
pub struct MockState {
   pub opened: Mutex<Vec<(Dsn, PoolConfig)>>,
   pub closed: Mutex<Vec<MockHandle>>,
   /// Opening any DSN containing this text fails
   pub fail_on: Mutex<Option<String>>,
   /// Closing the handle with this name fails
   pub fail_close_on: Mutex<Option<String>>,
   next_id: AtomicUsize,
}

impl MockState {
   pub fn opened_contents(&self) -> Vec<String> {
      self.opened.lock().iter().map(|(dsn, _)| dsn.content.clone()).collect()
   }

   pub fn opened_names(&self) -> Vec<String> {
      self.opened.lock().iter().map(|(dsn, _)| dsn.name.clone()).collect()
   }

   pub fn open_count(&self) -> usize {
      self.opened.lock().len()
   }

   pub fn closed_names(&self) -> Vec<String> {
      let mut names: Vec<String> = self.closed.lock().iter().map(|h| h.name.clone()).collect();
      names.sort();
      names
   }
}

#[derive(Debug)]
pub struct MockDriver<Dl> {
   pub state: Arc<MockState>,
   pub open_delay: Option<Duration>,
   _dialect: PhantomData<fn() -> Dl>,
}

impl<Dl> MockDriver<Dl> {
   pub fn new() -> Self {
      Self {
         state: Arc::new(MockState::default()),
         open_delay: None,
         _dialect: PhantomData,
      }
   }

   pub fn with_delay(mut self, delay: Duration) -> Self {
      self.open_delay = Some(delay);
      self
   }

   pub fn failing_on(self, needle: &str) -> Self {
      *self.state.fail_on.lock() = Some(needle.to_string());
      self
   }
}

impl<Dl> Clone for MockDriver<Dl> {
   fn clone(&self) -> Self {
      Self {
         state: Arc::clone(&self.state),
         open_delay: self.open_delay,
         _dialect: PhantomData,
      }
   }
}

impl<Dl: Dialect> Driver for MockDriver<Dl> {
   type Dialect = Dl;
   type Handle = MockHandle;

   async fn open(&self, dsn: &Dsn, config: &PoolConfig) -> Result<MockHandle> {
      if let Some(delay) = self.open_delay {
         tokio::time::sleep(delay).await;
      }

      self.state.opened.lock().push((dsn.clone(), *config));

      let fails = self
         .state
         .fail_on
         .lock()
         .as_deref()
         .is_some_and(|needle| dsn.content.contains(needle));
      if fails {
         return Err(Error::Connection {
            name: dsn.name.clone(),
            source: "connection refused".into(),
         });
      }

      Ok(MockHandle {
         id: self.state.next_id.fetch_add(1, Ordering::SeqCst),
         name: dsn.name.clone(),
         dsn: dsn.content.clone(),
      })
   }

   async fn close(&self, name: &str, handle: MockHandle) -> Result<()> {
      self.state.closed.lock().push(handle);

      if self.state.fail_close_on.lock().as_deref() == Some(name) {
         return Err(Error::Close {
            name: name.to_string(),
            source: "socket already gone".into(),
         });
      }

      Ok(())
   }
}

/// Show debug logs, including route resolution, in test output
pub fn init_tracing() {
   let _ = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_test_writer()
      .try_init();
}

/// Collects formatted log output so tests can assert on it
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
   pub fn lines(&self) -> Vec<String> {
      String::from_utf8_lossy(&self.0.lock())
         .lines()
         .map(str::to_string)
         .collect()
   }
}

impl std::io::Write for CapturedLogs {
   fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().extend_from_slice(buf);
      Ok(buf.len())
   }

   fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
   }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
   type Writer = CapturedLogs;

   fn make_writer(&'a self) -> Self::Writer {
      self.clone()
   }
}

/// Run `f` with debug logs written to `logs`
pub fn with_captured_logs<T>(logs: &CapturedLogs, f: impl FnOnce() -> T) -> T {
   let subscriber = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_ansi(false)
      .with_writer(logs.clone())
      .finish();

   tracing::subscriber::with_default(subscriber, f)
}
