//! Placement strategies behind one interface.

pub mod backtrack;
#[cfg(feature = "exact")]
pub mod exact;
pub mod greedy;

use crate::data::{SessionDemand, Year};
use crate::error::Result;
use crate::grid::Grid;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use backtrack::BacktrackingScheduler;
pub use greedy::GreedyScheduler;

/// What a strategy hands back: the filled grid and anything it could not
/// place.
#[derive(Debug)]
pub struct Outcome {
    pub grid: Grid,
    pub leftovers: Vec<SessionDemand>,
    /// Candidate placements examined.
    pub attempts: u64,
}

pub trait Scheduler {
    /// Places `demands` into `grid`, which the strategy owns for the run.
    fn schedule(&self, grid: Grid, demands: Vec<SessionDemand>) -> Result<Outcome>;
}

/// Shared flag that asks a running search to stop at its next expansion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Applies the optional seeded shuffle, then restores year priority with a
/// stable sort so final-year work still goes first.
pub(crate) fn shuffle_within_years<T>(items: &mut [T], seed: Option<u64>, year: impl Fn(&T) -> Year) {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        items.shuffle(&mut rng);
        items.sort_by_key(|item| year(item).priority());
    }
}
