mod common;

use common::MockDriver;
use conn_pool_mgr::{BackendSettings, Error, PoolSlot, PostgresConnection, PostgresDialect};
use std::sync::Arc;
use std::time::Duration;

type MockSlot = PoolSlot<MockDriver<PostgresDialect>>;

fn settings(host: &str) -> BackendSettings<PostgresConnection> {
   BackendSettings::new(PostgresConnection {
      username: "app".into(),
      password: "secret".into(),
      host: host.into(),
      port: 5432,
      database: "shop".into(),
      timezone: "UTC".into(),
      ssl_mode: "disable".into(),
   })
}

#[tokio::test]
async fn test_repeated_opens_return_same_pool() {
   let slot = MockSlot::new();
   let driver = MockDriver::new();
   let state = Arc::clone(&driver.state);

   let first = slot.get_or_open(&settings("first"), driver.clone()).await.unwrap();

   // Later settings are ignored once the pool is open
   let mut other = settings("second");
   other.max_open_conns = 7;
   let second = slot.get_or_open(&other, driver).await.unwrap();

   assert!(Arc::ptr_eq(&first, &second));
   assert_eq!(state.open_count(), 1);
   assert_eq!(second.config().max_open_conns, 0);
   assert!(second.main_dsn().content.contains("host=first"));
}

#[tokio::test]
async fn test_concurrent_first_calls_open_once() {
   let slot = Arc::new(MockSlot::new());
   let driver = MockDriver::new().with_delay(Duration::from_millis(50));
   let state = Arc::clone(&driver.state);

   let handles: Vec<_> = (0..8)
      .map(|i| {
         let (slot, driver) = (Arc::clone(&slot), driver.clone());
         tokio::spawn(async move { slot.get_or_open(&settings(&format!("host-{}", i)), driver).await })
      })
      .collect();

   let mut pools = Vec::new();
   for handle in handles {
      pools.push(handle.await.unwrap().unwrap());
   }

   assert_eq!(state.open_count(), 1);
   assert!(pools.iter().all(|pool| Arc::ptr_eq(pool, &pools[0])));
   assert!(pools[0].get_connection().is_ok());
}

#[tokio::test]
async fn test_failed_open_leaves_slot_empty() {
   let slot = MockSlot::new();
   let driver = MockDriver::new().failing_on("host=down");
   let state = Arc::clone(&driver.state);

   assert!(slot.get_or_open(&settings("down"), driver.clone()).await.is_err());
   assert!(slot.get().await.is_none());

   *state.fail_on.lock() = None;
   let pool = slot.get_or_open(&settings("down"), driver).await.unwrap();

   assert_eq!(state.open_count(), 2);
   assert!(Arc::ptr_eq(&pool, &slot.get().await.unwrap()));
}

#[tokio::test]
async fn test_closed_pool_is_not_reopened() {
   let slot = MockSlot::new();
   let driver = MockDriver::new();
   let state = Arc::clone(&driver.state);

   let first = slot.get_or_open(&settings("first"), driver.clone()).await.unwrap();
   first.close().await.unwrap();

   let mut other = settings("second");
   other.max_open_conns = 7;
   let second = slot.get_or_open(&other, driver).await.unwrap();

   assert!(Arc::ptr_eq(&first, &second));
   assert_eq!(state.open_count(), 1);
   assert!(second.is_closed());
   assert_eq!(second.config().max_open_conns, 0);
   assert!(second.main_dsn().content.contains("host=first"));
   assert!(matches!(second.get_connection().unwrap_err(), Error::PoolClosed));
   assert!(Arc::ptr_eq(&slot.get().await.unwrap(), &first));
}
