//! Capacity Projector
//!
//! Projection onto the capped simplex {x : 0 ≤ x_i ≤ 1, Σx_i = k}.
//!
//! Two geometries are supported, one per regularizer:
//!
//! - **Euclidean**: x_i = clip(y_i − τ, 0, 1). The total mass is piecewise
//!   linear and non-increasing in τ with breakpoints at y_i and y_i − 1, so
//!   a binary search over the sorted breakpoints followed by one linear
//!   interpolation finds τ exactly.
//! - **KL**: x_i = min(1, exp(s_i + c)). With items sorted by score, the
//!   solution saturates some prefix of m items; m is the smallest count for
//!   which the next item stays below 1. Computed in the log domain with
//!   suffix log-sum-exp, so large scores never overflow.
//!
//! Both run in O(n log n).

use crate::domain::OccupancyVector;
use crate::error::{Error, Result};

/// Projects score vectors onto the capped simplex of a fixed capacity.
#[derive(Debug, Clone, Copy)]
pub struct CapacityProjector {
    capacity: usize,
}

impl CapacityProjector {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Euclidean projection of `y`.
    pub fn euclidean(&self, y: &[f64]) -> Result<OccupancyVector> {
        if let Some(trivial) = self.trivial(y)? {
            return Ok(trivial);
        }

        let target = self.capacity as f64;
        let mass = |tau: f64| -> f64 { y.iter().map(|&v| (v - tau).clamp(0.0, 1.0)).sum() };

        let mut breakpoints: Vec<f64> = y.iter().flat_map(|&v| [v - 1.0, v]).collect();
        breakpoints.sort_by(|a, b| a.total_cmp(b));

        // mass(first) = n >= k and mass(last) = 0 < k
        let (mut lo, mut hi) = (0, breakpoints.len() - 1);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if mass(breakpoints[mid]) >= target {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let (mass_lo, mass_hi) = (mass(breakpoints[lo]), mass(breakpoints[hi]));
        let tau = if mass_lo - mass_hi <= f64::EPSILON {
            breakpoints[lo]
        } else {
            breakpoints[lo]
                + (mass_lo - target) * (breakpoints[hi] - breakpoints[lo]) / (mass_lo - mass_hi)
        };

        Ok(OccupancyVector::new(
            y.iter().map(|&v| (v - tau).clamp(0.0, 1.0)).collect(),
        ))
    }

    /// KL projection of the weights `exp(log_weights)`.
    pub fn entropic(&self, log_weights: &[f64]) -> Result<OccupancyVector> {
        if let Some(trivial) = self.trivial(log_weights)? {
            return Ok(trivial);
        }

        let n = log_weights.len();
        let k = self.capacity;

        // Highest score first; equal scores keep catalog order.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| log_weights[b].total_cmp(&log_weights[a]).then(a.cmp(&b)));

        // suffix[j] = log Σ_{i >= j} exp(s_order[i])
        let mut suffix = vec![f64::NEG_INFINITY; n + 1];
        for j in (0..n).rev() {
            suffix[j] = log_add_exp(suffix[j + 1], log_weights[order[j]]);
        }

        // m = k - 1 always qualifies: the largest remaining score never
        // exceeds the log-sum-exp of its own suffix.
        let mut saturated = k - 1;
        for m in 0..k {
            let top = (log_weights[order[m]] - suffix[m]) + ((k - m) as f64).ln();
            if top <= 0.0 {
                saturated = m;
                break;
            }
        }
        let log_norm = suffix[saturated];
        let log_mass = ((k - saturated) as f64).ln();

        let mut x = vec![0.0; n];
        for (rank, &i) in order.iter().enumerate() {
            x[i] = if rank < saturated {
                1.0
            } else {
                ((log_weights[i] - log_norm) + log_mass).exp().min(1.0)
            };
        }
        Ok(OccupancyVector::new(x))
    }

    /// Handle dimension checks and the k = 0 / k = n corners.
    fn trivial(&self, scores: &[f64]) -> Result<Option<OccupancyVector>> {
        let n = scores.len();
        if self.capacity > n {
            return Err(Error::config(format!(
                "cannot project {} items onto capacity {}",
                n, self.capacity
            )));
        }
        if let Some(i) = scores.iter().position(|v| !v.is_finite()) {
            return Err(Error::computation(format!(
                "projection score {} is {}",
                i, scores[i]
            )));
        }
        if self.capacity == 0 {
            return Ok(Some(OccupancyVector::new(vec![0.0; n])));
        }
        if self.capacity == n {
            return Ok(Some(OccupancyVector::new(vec![1.0; n])));
        }
        Ok(None)
    }
}

/// log(exp(a) + exp(b)) without overflow
pub(crate) fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

// =============================================================================
// Tests
// =============================================================================
