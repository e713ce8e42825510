//! Rounding Engine
//!
//! Madow systematic sampling from a fractional cache. Items are laid out on
//! [0, k) in catalog order, each covering an interval as long as its
//! occupancy; the points u, u + 1, …, u + k − 1 select the items whose
//! intervals they land in. Every interval is at most 1 long, so no item is
//! hit twice, exactly k items are chosen, and item i is chosen with
//! probability x_i.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{CacheSet, ItemIndex, OccupancyVector};
use crate::error::{Error, Result};

/// Golden-ratio increment used to spread per-round seeds
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Turns fractional caches into integral ones of exactly `capacity` items.
#[derive(Debug, Clone, Copy)]
pub struct RoundingEngine {
    capacity: usize,
    seed: u64,
}

impl RoundingEngine {
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self { capacity, seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Round the decision for `round` with that round's own generator.
    ///
    /// The generator depends only on the seed and the round index, so a run
    /// resumed from a checkpoint draws the same sets as an uninterrupted one.
    pub fn round(&self, x: &OccupancyVector, round: u64) -> Result<CacheSet> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(round.wrapping_mul(SEED_STRIDE)));
        self.round_with(x, &mut rng)
    }

    /// Round using an external source of randomness.
    pub fn round_with<R: Rng + ?Sized>(&self, x: &OccupancyVector, rng: &mut R) -> Result<CacheSet> {
        let u: f64 = rng.gen();
        self.systematic(x, u)
    }

    /// Systematic sampling with offset `u ∈ [0, 1)`.
    pub fn systematic(&self, x: &OccupancyVector, u: f64) -> Result<CacheSet> {
        let k = self.capacity;
        if x.len() < k {
            return Err(Error::config(format!(
                "cannot pick {} items from an occupancy vector of length {}",
                k,
                x.len()
            )));
        }
        if !(0.0..1.0).contains(&u) {
            return Err(Error::computation(format!(
                "systematic offset {} outside [0, 1)",
                u
            )));
        }
        if k == 0 {
            return Ok(CacheSet::new(Vec::new()));
        }

        let clamped: Vec<f64> = x
            .as_slice()
            .iter()
            .map(|&v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 })
            .collect();
        let total: f64 = clamped.iter().sum();
        if total <= 0.0 {
            return Err(Error::computation("occupancy vector has no mass"));
        }

        // Remove floating drift so the intervals tile [0, k).
        let scale = k as f64 / total;
        let mass: Vec<f64> = clamped.iter().map(|&v| (v * scale).min(1.0)).collect();

        let mut selected: Vec<ItemIndex> = Vec::with_capacity(k);
        let mut point = u;
        let mut cumulative = 0.0;
        for (i, &m) in mass.iter().enumerate() {
            if selected.len() == k {
                break;
            }
            cumulative += m;
            if m > 0.0 && point < cumulative {
                selected.push(i);
                point += 1.0;
            }
        }

        if selected.len() < k {
            fill_largest(&mut selected, &mass, k);
        }

        Ok(CacheSet::new(selected))
    }
}

/// Top up `selected` with the heaviest unselected items (lowest index first
/// on ties) when the last point fell past the final interval.
fn fill_largest(selected: &mut Vec<ItemIndex>, mass: &[f64], k: usize) {
    let mut rest: Vec<ItemIndex> = (0..mass.len()).filter(|i| !selected.contains(i)).collect();
    rest.sort_by(|&a, &b| mass[b].total_cmp(&mass[a]).then(a.cmp(&b)));
    selected.extend(rest.into_iter().take(k - selected.len()));
}

// =============================================================================
// Tests
// =============================================================================
