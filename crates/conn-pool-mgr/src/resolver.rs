//! Read/write splitting across source and replica routes

use crate::Result;
use crate::config::PoolConfig;
use crate::descriptor::NamedConnections;
use crate::driver::Driver;
use crate::dsn::{Dialect, Dsn, MAIN_DSN_NAME, build_dsn};
use crate::policy::Policy;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Kind of statement being routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
   /// Routed to a replica
   Read,
   /// Routed to a source
   Write,
}

impl fmt::Display for Operation {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Operation::Read => f.write_str("read"),
         Operation::Write => f.write_str("write"),
      }
   }
}

/// One registered source or replica connection
#[derive(Debug, Clone)]
pub struct Route<H> {
   dsn: Dsn,
   handle: H,
}

impl<H> Route<H> {
   /// The source/replica key this route was registered under
   pub fn name(&self) -> &str {
      &self.dsn.name
   }

   pub fn dsn(&self) -> &Dsn {
      &self.dsn
   }

   pub fn handle(&self) -> &H {
      &self.handle
   }

   pub(crate) fn into_parts(self) -> (Dsn, H) {
      (self.dsn, self.handle)
   }
}

/// Routes writes across sources and reads across replicas.
///
/// A side with no routes falls back to the main connection. Every
/// resolution is logged at debug level with the route it picked.
#[derive(Debug)]
pub struct Resolver<H> {
   sources: Vec<Route<H>>,
   replicas: Vec<Route<H>>,
   policy: Arc<dyn Policy>,
   trace: bool,
}

/// Outcome of a registration: the new resolver, plus routes of the previous
/// resolver that it no longer uses and that the caller must release.
pub(crate) struct Registration<H> {
   pub(crate) resolver: Resolver<H>,
   pub(crate) retired: Vec<Route<H>>,
}

impl<H: Clone + Send + Sync + 'static> Resolver<H> {
   /// Open one route per source and per replica.
   ///
   /// Routes whose DSN matches a route of `previous` reuse its handle
   /// instead of opening a new one. If any open fails, everything opened by
   /// this call is released and the error is returned; `previous` is left
   /// untouched.
   pub(crate) async fn register<D>(
      driver: &D,
      config: &PoolConfig,
      sources: &NamedConnections<<D::Dialect as Dialect>::Connection>,
      replicas: &NamedConnections<<D::Dialect as Dialect>::Connection>,
      policy: Arc<dyn Policy>,
      previous: Option<&Resolver<H>>,
   ) -> Result<Registration<H>>
   where
      D: Driver<Handle = H>,
   {
      let previous_routes: Vec<&Route<H>> = previous.map(|p| p.routes().collect()).unwrap_or_default();
      let mut reused = vec![false; previous_routes.len()];
      let mut opened: Vec<(String, H)> = Vec::new();

      let outcome = match open_routes(driver, config, sources, &previous_routes, &mut reused, &mut opened).await {
         Ok(sources) => open_routes(driver, config, replicas, &previous_routes, &mut reused, &mut opened)
            .await
            .map(|replicas| (sources, replicas)),
         Err(e) => Err(e),
      };

      let (sources, replicas) = match outcome {
         Ok(routes) => routes,
         Err(e) => {
            for (name, handle) in opened {
               if let Err(close_err) = driver.close(&name, handle).await {
                  warn!(dsn = %name, error = %close_err, "Failed to release route after registration error");
               }
            }
            return Err(e);
         }
      };

      let retired: Vec<Route<H>> = previous_routes
         .into_iter()
         .zip(reused)
         .filter(|(_, reused)| !reused)
         .map(|(route, _)| route.clone())
         .collect();

      debug!(
         sources = sources.len(),
         replicas = replicas.len(),
         opened = opened.len(),
         retired = retired.len(),
         "Registered read/write split"
      );

      Ok(Registration {
         resolver: Resolver {
            sources,
            replicas,
            policy,
            trace: true,
         },
         retired,
      })
   }
}

/// Build one side's routes, reusing handles of `previous` whose DSN content
/// matches and recording every newly opened handle in `opened`.
async fn open_routes<D: Driver>(
   driver: &D,
   config: &PoolConfig,
   conns: &NamedConnections<<D::Dialect as Dialect>::Connection>,
   previous: &[&Route<D::Handle>],
   reused: &mut [bool],
   opened: &mut Vec<(String, D::Handle)>,
) -> Result<Vec<Route<D::Handle>>> {
   let mut routes = Vec::with_capacity(conns.len());

   for (name, conn) in conns {
      let dsn = build_dsn::<D::Dialect>(name.as_str(), conn);

      let handle = match previous.iter().position(|route| route.dsn.content == dsn.content) {
         Some(idx) => {
            reused[idx] = true;
            previous[idx].handle.clone()
         }
         None => {
            let handle = driver.open(&dsn, config).await?;
            opened.push((dsn.name.clone(), handle.clone()));
            handle
         }
      };

      routes.push(Route { dsn, handle });
   }

   Ok(routes)
}

impl<H> Resolver<H> {
   #[cfg(test)]
   pub(crate) fn from_routes(
      sources: Vec<(Dsn, H)>,
      replicas: Vec<(Dsn, H)>,
      policy: Arc<dyn Policy>,
   ) -> Self {
      let into_routes = |pairs: Vec<(Dsn, H)>| -> Vec<Route<H>> {
         pairs.into_iter().map(|(dsn, handle)| Route { dsn, handle }).collect()
      };

      Self {
         sources: into_routes(sources),
         replicas: into_routes(replicas),
         policy,
         trace: true,
      }
   }

   /// Write-side routes
   pub fn sources(&self) -> &[Route<H>] {
      &self.sources
   }

   /// Read-side routes
   pub fn replicas(&self) -> &[Route<H>] {
      &self.replicas
   }

   pub fn policy(&self) -> &Arc<dyn Policy> {
      &self.policy
   }

   /// Whether resolutions are logged
   pub fn is_tracing(&self) -> bool {
      self.trace
   }

   /// Every route, sources first
   pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
      self.sources.iter().chain(self.replicas.iter())
   }

   /// Pick the handle for `op`, falling back to `main` when that side has no routes
   pub fn resolve<'a>(&'a self, op: Operation, main: &'a H) -> &'a H {
      let routes = match op {
         Operation::Read => &self.replicas,
         Operation::Write => &self.sources,
      };

      let (name, handle) = if routes.is_empty() {
         (MAIN_DSN_NAME, main)
      } else {
         let route = &routes[self.policy.select(routes.len()) % routes.len()];
         (route.name(), &route.handle)
      };

      if self.trace {
         debug!(operation = %op, route = %name, "Resolved connection");
      }

      handle
   }
}
