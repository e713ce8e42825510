//! EWMA forecaster
//!
//! p̂_i(t) = (1 − α)·p̂_i(t − 1) + α·1[r_t = i]

use crate::domain::{DemandEstimate, Forecaster, ItemIndex};
use crate::error::{Error, Result};

/// Exponentially weighted moving average of per-item request indicators.
#[derive(Debug, Clone)]
pub struct EwmaForecaster {
    /// Smoothing parameter α ∈ (0, 1]
    alpha: f64,
    values: Vec<f64>,
    seen: usize,
}

impl EwmaForecaster {
    /// Create a forecaster, rejecting α outside (0, 1].
    pub fn new(catalog_size: usize, alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::config(format!(
                "EWMA alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        let initial = if catalog_size == 0 {
            0.0
        } else {
            1.0 / catalog_size as f64
        };
        Ok(Self {
            alpha,
            values: vec![initial; catalog_size],
            seen: 0,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn observe(&mut self, item: ItemIndex) {
        for (i, v) in self.values.iter_mut().enumerate() {
            let hit = if i == item { 1.0 } else { 0.0 };
            *v = (1.0 - self.alpha) * *v + self.alpha * hit;
        }
    }
}

impl Forecaster for EwmaForecaster {
    fn predict(&mut self, _round: u64, history: &[ItemIndex]) -> DemandEstimate {
        if history.len() < self.seen {
            let n = self.values.len();
            let initial = if n == 0 { 0.0 } else { 1.0 / n as f64 };
            self.values.iter_mut().for_each(|v| *v = initial);
            self.seen = 0;
        }
        for &item in &history[self.seen..] {
            self.observe(item);
        }
        self.seen = history.len();

        DemandEstimate::new(self.values.clone())
    }

    fn name(&self) -> &str {
        "ewma"
    }
}
