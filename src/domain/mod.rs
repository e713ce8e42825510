//! Domain Layer
//!
//! Value objects shared by every stage of the decision pipeline, and the
//! ports (traits) the engine depends on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌──────────────────────┐    ┌──────────────────────────┐   │
//! │  │    Value Objects     │    │      Ports (Traits)      │   │
//! │  │  RequestVector       │    │  Forecaster              │   │
//! │  │  DemandEstimate      │    │                          │   │
//! │  │  OccupancyVector     │    │                          │   │
//! │  │  CacheSet / Catalog  │    │                          │   │
//! │  └──────────────────────┘    └──────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod ports;
pub mod types;

pub use ports::Forecaster;
pub use types::{
    CacheSet, Catalog, DemandEstimate, ItemIndex, OccupancyVector, RequestVector, RoundOutcome,
    FEASIBILITY_TOLERANCE, MAX_DEMAND,
};
