//! Uniform baseline forecaster

use crate::domain::{DemandEstimate, Forecaster, ItemIndex};

/// Predicts the same demand for every item, `capacity / catalog_size`.
#[derive(Debug, Clone)]
pub struct UniformForecaster {
    catalog_size: usize,
    level: f64,
}

impl UniformForecaster {
    pub fn new(capacity: usize, catalog_size: usize) -> Self {
        let level = if catalog_size == 0 {
            0.0
        } else {
            capacity as f64 / catalog_size as f64
        };
        Self {
            catalog_size,
            level,
        }
    }
}

impl Forecaster for UniformForecaster {
    fn predict(&mut self, _round: u64, _history: &[ItemIndex]) -> DemandEstimate {
        DemandEstimate::uniform(self.catalog_size, self.level)
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_history() {
        let mut f = UniformForecaster::new(2, 4);
        let first = f.predict(0, &[]);
        let later = f.predict(10, &[0, 0, 1, 3]);
        assert_eq!(first, later);
        assert_eq!(first.as_slice(), &[0.5; 4]);
    }
}
