//! Engine Configuration
//!
//! Regularizer, learning-rate schedule, rounding seed and miss cost. Every
//! field has a default; configurations can also be read from YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default seed for the rounding engine
pub const DEFAULT_SEED: u64 = 0x5EED_CAC4E;

/// Default cost charged for a single miss
pub const DEFAULT_MISS_COST: f64 = 1.0;

/// Strictly convex regularizer used by the decision core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Regularizer {
    /// Negative entropy; exponential-weights scores with KL projection
    #[default]
    Entropic,
    /// Half squared Euclidean norm; water-filling Euclidean projection
    Euclidean,
}

impl std::fmt::Display for Regularizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regularizer::Entropic => write!(f, "entropic"),
            Regularizer::Euclidean => write!(f, "euclidean"),
        }
    }
}

impl std::str::FromStr for Regularizer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "entropic" | "entropy" => Ok(Regularizer::Entropic),
            "euclidean" | "squared-norm" | "squared_norm" | "l2" => Ok(Regularizer::Euclidean),
            other => Err(Error::config(format!("unknown regularizer: {}", other))),
        }
    }
}

/// Non-increasing learning-rate schedule η_t, with t counted from 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schedule", rename_all = "snake_case")]
pub enum LearningRate {
    /// η_t = eta
    Constant { eta: f64 },
    /// η_t = eta0 / √t
    InverseSqrt { eta0: f64 },
}

impl Default for LearningRate {
    fn default() -> Self {
        LearningRate::InverseSqrt { eta0: 1.0 }
    }
}

impl LearningRate {
    /// Learning rate for round `t` (1-based; 0 is treated as 1)
    pub fn at(&self, t: u64) -> f64 {
        match *self {
            LearningRate::Constant { eta } => eta,
            LearningRate::InverseSqrt { eta0 } => eta0 / (t.max(1) as f64).sqrt(),
        }
    }

    /// The configured η (constant) or η0 (schedule)
    pub fn base(&self) -> f64 {
        match *self {
            LearningRate::Constant { eta } => eta,
            LearningRate::InverseSqrt { eta0 } => eta0,
        }
    }
}

/// Tunable options for [`OftrlCache`](crate::engine::OftrlCache)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Regularizer for the decision core
    pub regularizer: Regularizer,
    /// Learning-rate schedule
    pub learning_rate: LearningRate,
    /// Seed for the rounding engine
    pub seed: u64,
    /// Cost charged for each miss
    pub miss_cost: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regularizer: Regularizer::default(),
            learning_rate: LearningRate::default(),
            seed: DEFAULT_SEED,
            miss_cost: DEFAULT_MISS_COST,
        }
    }
}

impl EngineConfig {
    /// Entropic regularizer with the default schedule
    pub fn entropic() -> Self {
        Self::default()
    }

    /// Euclidean regularizer with the default schedule
    pub fn euclidean() -> Self {
        Self {
            regularizer: Regularizer::Euclidean,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: LearningRate) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_miss_cost(mut self, miss_cost: f64) -> Self {
        self.miss_cost = miss_cost;
        self
    }

    /// Check numeric options
    pub fn validate(&self) -> Result<()> {
        let eta = self.learning_rate.base();
        if !(eta.is_finite() && eta > 0.0) {
            return Err(Error::config(format!(
                "learning rate must be finite and positive, got {}",
                eta
            )));
        }
        if !(self.miss_cost.is_finite() && self.miss_cost > 0.0) {
            return Err(Error::config(format!(
                "miss cost must be finite and positive, got {}",
                self.miss_cost
            )));
        }
        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

// =============================================================================
// Tests
// =============================================================================
