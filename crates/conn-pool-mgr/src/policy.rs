//! Selection policies for choosing among source or replica routes

use rand::Rng;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks one of `candidates` routes for an operation.
///
/// Called only with `candidates >= 1`. Out-of-range answers wrap around.
pub trait Policy: Debug + Send + Sync {
   fn select(&self, candidates: usize) -> usize;
}

/// Uniform random choice on every call. No weighting, health checks or
/// stickiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPolicy;

impl Policy for RandomPolicy {
   fn select(&self, candidates: usize) -> usize {
      rand::thread_rng().gen_range(0..candidates)
   }
}

/// Cycles through the routes in registration order
#[derive(Debug, Default)]
pub struct RoundRobinPolicy {
   next: AtomicUsize,
}

impl RoundRobinPolicy {
   pub fn new() -> Self {
      Self::default()
   }
}

impl Policy for RoundRobinPolicy {
   fn select(&self, candidates: usize) -> usize {
      self.next.fetch_add(1, Ordering::Relaxed) % candidates
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_random_policy_stays_in_range() {
      let policy = RandomPolicy;
      let mut seen = [false; 3];

      for _ in 0..1000 {
         let idx = policy.select(3);
         assert!(idx < 3);
         seen[idx] = true;
      }

      assert!(seen.iter().all(|s| *s), "every route should be picked eventually");
   }

   #[test]
   fn test_round_robin_cycles() {
      let policy = RoundRobinPolicy::new();
      let picks: Vec<usize> = (0..5).map(|_| policy.select(2)).collect();

      assert_eq!(picks, vec![0, 1, 0, 1, 0]);
   }
}
