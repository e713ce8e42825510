//! Demand Forecasters
//!
//! Interchangeable implementations of [`Forecaster`](crate::domain::Forecaster).
//!
//! - [`UniformForecaster`]: ignores history; makes the engine plain FTRL
//! - [`FrequencyForecaster`]: normalized running request counts
//! - [`EwmaForecaster`]: exponentially weighted recent demand

mod ewma;
mod frequency;
mod uniform;

pub use ewma::EwmaForecaster;
pub use frequency::FrequencyForecaster;
pub use uniform::UniformForecaster;

use serde::{Deserialize, Serialize};

use crate::domain::Forecaster;
use crate::error::Result;

/// Forecaster selection for configuration files and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecasterKind {
    /// Constant estimate, no learning
    #[default]
    Uniform,
    /// Running request frequency
    Frequency,
    /// Exponentially weighted moving average with smoothing `alpha`
    Ewma { alpha: f64 },
}

impl ForecasterKind {
    /// Instantiate the selected forecaster for a catalog of `catalog_size` items.
    pub fn build(&self, capacity: usize, catalog_size: usize) -> Result<Box<dyn Forecaster>> {
        Ok(match *self {
            ForecasterKind::Uniform => Box::new(UniformForecaster::new(capacity, catalog_size)),
            ForecasterKind::Frequency => Box::new(FrequencyForecaster::new(catalog_size)),
            ForecasterKind::Ewma { alpha } => Box::new(EwmaForecaster::new(catalog_size, alpha)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_each_kind() {
        let mut uniform = ForecasterKind::Uniform.build(2, 4).unwrap();
        assert_eq!(uniform.name(), "uniform");
        assert_eq!(uniform.predict(0, &[]).len(), 4);

        let frequency = ForecasterKind::Frequency.build(2, 4).unwrap();
        assert_eq!(frequency.name(), "frequency");

        let ewma = ForecasterKind::Ewma { alpha: 0.3 }.build(2, 4).unwrap();
        assert_eq!(ewma.name(), "ewma");

        assert!(ForecasterKind::Ewma { alpha: 0.0 }.build(2, 4).is_err());
    }

    #[test]
    fn test_kind_from_yaml() {
        let kind: ForecasterKind = serde_yaml::from_str("kind: ewma\nalpha: 0.5\n").unwrap();
        assert_eq!(kind, ForecasterKind::Ewma { alpha: 0.5 });

        let kind: ForecasterKind = serde_yaml::from_str("kind: frequency\n").unwrap();
        assert_eq!(kind, ForecasterKind::Frequency);
    }
}
