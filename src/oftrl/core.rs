//! OFTRL Decision Core
//!
//! Optimistic Follow-The-Regularized-Leader over the capped simplex.
//!
//! Each round the core solves
//!
//! ```text
//! x_t = argmin_{x ∈ X}  η_t · ⟨L_{t-1} + ĝ_t, x⟩ + ψ(x)
//! ```
//!
//! where `L` is the cumulative loss gradient, `ĝ_t = −c · d_t` the gradient
//! predicted from the forecaster's demand `d_t`, and `ψ` the configured
//! regularizer. The per-round loss is the linearized miss cost
//! `f_t(x) = c · (1 − x[r_t])`, whose gradient is `−c` on the requested
//! coordinate.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::projector::CapacityProjector;
use crate::config::{EngineConfig, LearningRate, Regularizer};
use crate::domain::{DemandEstimate, OccupancyVector, RequestVector};
use crate::error::{Error, Result};

/// Magnitude at which non-finite scores are clipped
const SCORE_LIMIT: f64 = 1.0e12;

/// Serializable decision-core state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreCheckpoint {
    /// Number of completed rounds
    pub round: u64,
    /// Cumulative loss gradient
    pub cumulative_gradient: Vec<f64>,
}

/// Fractional cache for one round
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub occupancy: OccupancyVector,
    /// Non-finite scores were clipped before projection
    pub clipped: bool,
}

/// Stateful OFTRL optimizer
#[derive(Debug, Clone)]
pub struct DecisionCore {
    catalog_size: usize,
    regularizer: Regularizer,
    learning_rate: LearningRate,
    miss_cost: f64,
    projector: CapacityProjector,
    cumulative_gradient: Vec<f64>,
    round: u64,
}

impl DecisionCore {
    /// Create a core for `capacity` out of `catalog_size` items.
    pub fn new(capacity: usize, catalog_size: usize, config: &EngineConfig) -> Result<Self> {
        if catalog_size == 0 {
            return Err(Error::config("catalog size must be at least 1"));
        }
        if capacity > catalog_size {
            return Err(Error::config(format!(
                "capacity {} exceeds catalog size {}",
                capacity, catalog_size
            )));
        }
        config.validate()?;

        Ok(Self {
            catalog_size,
            regularizer: config.regularizer,
            learning_rate: config.learning_rate,
            miss_cost: config.miss_cost,
            projector: CapacityProjector::new(capacity),
            cumulative_gradient: vec![0.0; catalog_size],
            round: 0,
        })
    }

    /// Completed rounds
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn capacity(&self) -> usize {
        self.projector.capacity()
    }

    pub fn catalog_size(&self) -> usize {
        self.catalog_size
    }

    pub fn regularizer(&self) -> Regularizer {
        self.regularizer
    }

    pub fn cumulative_gradient(&self) -> &[f64] {
        &self.cumulative_gradient
    }

    /// Learning rate used for the next decision
    pub fn current_learning_rate(&self) -> f64 {
        self.learning_rate.at(self.round + 1)
    }

    /// Fractional cache for the next round, informed by `prediction`.
    pub fn decide(&self, prediction: &DemandEstimate) -> Result<OccupancyVector> {
        self.decision(prediction).map(|d| d.occupancy)
    }

    /// Like [`decide`](Self::decide), also reporting whether the scores had
    /// to be clipped.
    pub fn decision(&self, prediction: &DemandEstimate) -> Result<Decision> {
        prediction.check_len(self.catalog_size)?;

        let eta = self.current_learning_rate();
        let mut scores: Vec<f64> = self
            .cumulative_gradient
            .iter()
            .zip(prediction.as_slice())
            .map(|(&l, &d)| -eta * (l - self.miss_cost * d))
            .collect();

        let clipped = match scores.iter().position(|s| !s.is_finite()) {
            Some(i) => {
                let err = Error::computation(format!("decision score {} is {}", i, scores[i]));
                warn!(error = %err, round = self.round, "Clipping non-finite decision scores");
                for s in scores.iter_mut() {
                    *s = if s.is_nan() {
                        0.0
                    } else {
                        s.clamp(-SCORE_LIMIT, SCORE_LIMIT)
                    };
                }
                true
            }
            None => false,
        };

        let occupancy = match self.regularizer {
            Regularizer::Entropic => self.projector.entropic(&scores)?,
            Regularizer::Euclidean => self.projector.euclidean(&scores)?,
        };

        debug!(
            round = self.round,
            eta,
            clipped,
            regularizer = %self.regularizer,
            "Computed fractional cache"
        );
        Ok(Decision { occupancy, clipped })
    }

    /// Gradient of the linearized miss cost for `request`
    pub fn loss_gradient(&self, request: &RequestVector) -> Result<Vec<f64>> {
        self.check_request(request)?;
        let mut gradient = vec![0.0; self.catalog_size];
        gradient[request.index()] = -self.miss_cost;
        Ok(gradient)
    }

    /// Accumulate a gradient into the cumulative state and advance the round.
    pub fn apply_gradient(&mut self, gradient: &[f64]) -> Result<()> {
        if gradient.len() != self.catalog_size {
            return Err(Error::config(format!(
                "gradient has length {}, expected {}",
                gradient.len(),
                self.catalog_size
            )));
        }
        for (l, g) in self.cumulative_gradient.iter_mut().zip(gradient) {
            *l += g;
        }
        self.round += 1;
        Ok(())
    }

    /// Charge the revealed request against `x` and fold its gradient in.
    ///
    /// Returns the fractional cost `c · (1 − x[r])`.
    pub fn update(&mut self, x: &OccupancyVector, request: &RequestVector) -> Result<f64> {
        if x.len() != self.catalog_size {
            return Err(Error::config(format!(
                "occupancy has length {}, expected {}",
                x.len(),
                self.catalog_size
            )));
        }
        let gradient = self.loss_gradient(request)?;
        let fractional_cost = self.miss_cost * (1.0 - x.get(request.index()));
        self.apply_gradient(&gradient)?;
        Ok(fractional_cost)
    }

    pub fn checkpoint(&self) -> CoreCheckpoint {
        CoreCheckpoint {
            round: self.round,
            cumulative_gradient: self.cumulative_gradient.clone(),
        }
    }

    /// Replace state with a previously taken checkpoint.
    pub fn restore(&mut self, checkpoint: &CoreCheckpoint) -> Result<()> {
        if checkpoint.cumulative_gradient.len() != self.catalog_size {
            return Err(Error::config(format!(
                "checkpoint gradient has length {}, expected {}",
                checkpoint.cumulative_gradient.len(),
                self.catalog_size
            )));
        }
        if checkpoint.cumulative_gradient.iter().any(|g| !g.is_finite()) {
            return Err(Error::config("checkpoint gradient contains non-finite values"));
        }
        self.cumulative_gradient = checkpoint.cumulative_gradient.clone();
        self.round = checkpoint.round;
        Ok(())
    }

    fn check_request(&self, request: &RequestVector) -> Result<()> {
        if request.catalog_size() != self.catalog_size {
            return Err(Error::config(format!(
                "request sized for {} items, catalog has {}",
                request.catalog_size(),
                self.catalog_size
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
