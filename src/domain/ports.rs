//! Domain Ports (Port/Adapter Pattern)
//!
//! The decision engine depends only on the abstractions defined here.
//! Concrete forecasters live in [`crate::forecaster`]; learned models trained
//! out of process plug in behind the same trait.

use super::types::{DemandEstimate, ItemIndex};

/// Demand forecaster consulted once per round before the cache is chosen.
///
/// Implementations must return one finite, non-negative value per catalog
/// item. The engine rejects estimates of the wrong length as a configuration
/// error and clips non-finite values.
pub trait Forecaster: Send {
    /// Predict demand for round `round` given every request seen so far,
    /// oldest first.
    fn predict(&mut self, round: u64, history: &[ItemIndex]) -> DemandEstimate;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

impl<F: Forecaster + ?Sized> Forecaster for Box<F> {
    fn predict(&mut self, round: u64, history: &[ItemIndex]) -> DemandEstimate {
        (**self).predict(round, history)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
