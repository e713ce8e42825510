//! OFTRL Decision Module
//!
//! Online convex optimization for cache placement.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         OFTRL Decision Module                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  DemandEstimate ──▶ ┌──────────────┐    ┌──────────────┐                 │
//! │                     │ DecisionCore │───▶│  Capacity    │                 │
//! │   gradient  ──────▶ │ (cumulative  │    │  Projector   │                 │
//! │                     │  gradient)   │    └──────┬───────┘                 │
//! │                     └──────────────┘           │ OccupancyVector         │
//! │                                         ┌──────▼───────┐                 │
//! │                                         │   Rounding   │──▶ CacheSet     │
//! │                                         │    Engine    │                 │
//! │                                         └──────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Decision core** (`core.rs`): cumulative gradient, learning-rate
//!   schedule, optimistic scores, checkpointing
//! - **Capacity projector** (`projector.rs`): Euclidean and KL projection
//!   onto the capped simplex
//! - **Rounding engine** (`rounding.rs`): seeded systematic sampling with
//!   exact cache size and preserved marginals

pub mod core;
pub mod projector;
pub mod rounding;

#[cfg(test)]
mod proptest;

pub use self::core::{CoreCheckpoint, Decision, DecisionCore};
pub use projector::CapacityProjector;
pub use rounding::RoundingEngine;
