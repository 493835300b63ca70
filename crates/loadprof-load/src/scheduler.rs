//! Deterministic request scheduling.
//!
//! The scheduler owns an explicit PRNG and turns it into a bounded sequence
//! of shots. Each draw is reduced in two stages, first into `[0, limit)` and
//! then into `[0, catalog.len())`:
//!
//! ```text
//! index = rng.next_u64() % random_limit % catalog.len()
//! ```
//!
//! The same seed, catalog size, shot count and limit always produce the same
//! index sequence, which is what makes two profiling runs comparable.

use crate::catalog::TargetCatalog;
use crate::{LoadError, LoadResult};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::time::Duration;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 123_456_789;

/// Shape of a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Number of shots to produce
    pub shots: usize,
    /// First-stage modulus; must be larger than the catalog size
    pub random_limit: u64,
    /// Pause after each shot
    pub cooldown: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            shots: 100,
            random_limit: 1000,
            cooldown: Duration::from_millis(100),
        }
    }
}

/// One unit of load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shot {
    pub index: usize,
    pub target: String,
    pub cooldown: Duration,
}

/// Produces exactly `shots` draws from the catalog.
#[derive(Debug)]
pub struct Scheduler<R = StdRng> {
    catalog: TargetCatalog,
    rng: R,
    random_limit: u64,
    cooldown: Duration,
    remaining: usize,
}

impl Scheduler<StdRng> {
    /// Scheduler backed by `StdRng` seeded with `seed`.
    pub fn seeded(catalog: TargetCatalog, seed: u64, config: ScheduleConfig) -> LoadResult<Self> {
        Self::new(catalog, StdRng::seed_from_u64(seed), config)
    }
}

impl<R: RngCore> Scheduler<R> {
    pub fn new(catalog: TargetCatalog, rng: R, config: ScheduleConfig) -> LoadResult<Self> {
        if config.random_limit <= catalog.len() as u64 {
            return Err(LoadError::InvalidLimit {
                limit: config.random_limit,
                catalog_size: catalog.len(),
            });
        }

        Ok(Self {
            catalog,
            rng,
            random_limit: config.random_limit,
            cooldown: config.cooldown,
            remaining: config.shots,
        })
    }

    pub fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Consume the scheduler, returning only the drawn indices.
    pub fn indices(self) -> Vec<usize> {
        self.map(|shot| shot.index).collect()
    }

    fn draw_index(&mut self) -> usize {
        let reduced = self.rng.next_u64() % self.random_limit;
        (reduced % self.catalog.len() as u64) as usize
    }
}

impl<R: RngCore> Iterator for Scheduler<R> {
    type Item = Shot;

    fn next(&mut self) -> Option<Shot> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let index = self.draw_index();
        // In range: index < catalog.len()
        let target = self.catalog.get(index)?.to_string();

        Some(Shot {
            index,
            target,
            cooldown: self.cooldown,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: RngCore> ExactSizeIterator for Scheduler<R> {}
