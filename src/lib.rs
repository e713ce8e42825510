//! OFTRL Cache - Online Cache Decisions with Regret Guarantees
//!
//! Decides, before each request arrives, which `k` of `n` catalog items to
//! hold in cache. Decisions come from Optimistic Follow-The-Regularized-Leader
//! over the capped simplex, rounded to an integral cache by systematic
//! sampling, and scored against the best fixed cache in hindsight.
//!
//! # Architecture
//!
//! ```text
//! Forecaster → Decision Core → Capacity Projector → Rounding Engine
//!                    ▲                                     │
//!                    └──── gradient ◀── Results Aggregator ◀┘
//! ```
//!
//! # Modules
//!
//! - [`config`] - Regularizer, learning rate, seed and miss cost
//! - [`domain`] - Value objects and the forecaster port
//! - [`engine`] - The per-round loop, results and checkpoints
//! - [`error`] - Error types
//! - [`forecaster`] - Uniform, frequency and EWMA forecasters
//! - [`metrics`] - Prometheus metrics
//! - [`oftrl`] - Decision core, projector and rounding engine
//!
//! # Usage
//!
//! ```rust
//! use oftrl_cache::{OftrlCache, UniformForecaster};
//!
//! let mut engine = OftrlCache::new(UniformForecaster::new(2, 5), 2, 5)?;
//! engine.get_all_indices(&[0, 0, 1, 1, 2])?;
//! let results = engine.results();
//! assert_eq!(results.rounds, 5);
//! # Ok::<(), oftrl_cache::Error>(())
//! ```

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod forecaster;
pub mod metrics;
pub mod oftrl;

// Re-export commonly used types
pub use config::{EngineConfig, LearningRate, Regularizer};
pub use domain::{
    CacheSet, Catalog, DemandEstimate, Forecaster, ItemIndex, OccupancyVector, RequestVector,
    RoundOutcome,
};
pub use engine::{Checkpoint, OftrlCache, RunResults};
pub use error::{Error, Result};
pub use forecaster::{EwmaForecaster, ForecasterKind, FrequencyForecaster, UniformForecaster};
pub use metrics::EngineMetrics;
pub use oftrl::{CapacityProjector, DecisionCore, RoundingEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
