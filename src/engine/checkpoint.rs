//! Run Checkpoints
//!
//! A run can be interrupted between rounds and resumed later. The decision
//! core needs only its round counter and cumulative gradient; the aggregator
//! carries the request history that forecasters replay from.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::results::ResultsAggregator;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::oftrl::CoreCheckpoint;

/// Everything needed to resume an engine, minus the forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub capacity: usize,
    pub catalog_size: usize,
    pub config: EngineConfig,
    pub core: CoreCheckpoint,
    pub aggregator: ResultsAggregator,
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Write the checkpoint as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(
            path = %path.display(),
            round = self.core.round,
            "Saved checkpoint"
        );
        Ok(())
    }

    /// Read a checkpoint written by [`Checkpoint::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
