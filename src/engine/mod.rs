//! Cache Decision Engine
//!
//! Drives the per-round loop:
//!
//! ```text
//! Forecaster ─▶ DecisionCore ─▶ CapacityProjector ─▶ RoundingEngine
//!      ▲                                                   │ CacheSet
//!      │                                                   ▼
//!   history ◀── ResultsAggregator ◀── reveal request ◀─────┘
//!                      │
//!                      └─▶ gradient update ─▶ DecisionCore
//! ```
//!
//! Rounds run strictly in order on `&mut self`. `get_all` may be called
//! repeatedly; each call continues from the current cumulative state.

mod checkpoint;
mod results;

pub use checkpoint::Checkpoint;
pub use results::{ResultsAggregator, RunResults};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{Forecaster, ItemIndex, RequestVector, RoundOutcome};
use crate::error::{Error, Result};
use crate::metrics::EngineMetrics;
use crate::oftrl::{DecisionCore, RoundingEngine};

/// Online cache-decision engine over a fixed catalog.
pub struct OftrlCache<F: Forecaster> {
    forecaster: F,
    capacity: usize,
    catalog_size: usize,
    config: EngineConfig,
    core: DecisionCore,
    rounding: RoundingEngine,
    aggregator: ResultsAggregator,
    metrics: Option<EngineMetrics>,
}

impl<F: Forecaster> OftrlCache<F> {
    /// Create an engine with the default configuration.
    pub fn new(forecaster: F, capacity: usize, catalog_size: usize) -> Result<Self> {
        Self::with_config(forecaster, capacity, catalog_size, EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    ///
    /// Fails with a configuration error if `capacity > catalog_size`, the
    /// catalog is empty, or the configuration is invalid.
    pub fn with_config(
        forecaster: F,
        capacity: usize,
        catalog_size: usize,
        config: EngineConfig,
    ) -> Result<Self> {
        let core = DecisionCore::new(capacity, catalog_size, &config)?;

        info!(
            forecaster = forecaster.name(),
            capacity,
            catalog_size,
            regularizer = %config.regularizer,
            seed = config.seed,
            "Created OFTRL cache engine"
        );

        Ok(Self {
            forecaster,
            capacity,
            catalog_size,
            rounding: RoundingEngine::new(capacity, config.seed),
            aggregator: ResultsAggregator::new(capacity, catalog_size, config.miss_cost),
            core,
            config,
            metrics: None,
        })
    }

    /// Resume a run from a checkpoint.
    pub fn restore(forecaster: F, checkpoint: Checkpoint) -> Result<Self> {
        let mut engine = Self::with_config(
            forecaster,
            checkpoint.capacity,
            checkpoint.catalog_size,
            checkpoint.config,
        )?;

        let aggregator = checkpoint
            .aggregator
            .verify(engine.capacity, engine.catalog_size)?;
        if aggregator.rounds() != checkpoint.core.round {
            return Err(Error::config(format!(
                "checkpoint core is at round {} but {} outcomes were recorded",
                checkpoint.core.round,
                aggregator.rounds()
            )));
        }

        engine.core.restore(&checkpoint.core)?;
        engine.aggregator = aggregator;

        info!(
            round = engine.core.round(),
            saved_at = %checkpoint.saved_at,
            "Restored engine from checkpoint"
        );
        Ok(engine)
    }

    /// Attach a metrics registry updated every round.
    ///
    /// Counters start from the rounds already recorded, so a restored engine
    /// reports totals for the whole run.
    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        let summary = self.aggregator.summary();
        metrics.observe_totals(&summary);
        metrics.observe_results(&summary);
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn catalog_size(&self) -> usize {
        self.catalog_size
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Completed rounds
    pub fn round(&self) -> u64 {
        self.core.round()
    }

    pub fn core(&self) -> &DecisionCore {
        &self.core
    }

    pub fn forecaster(&self) -> &F {
        &self.forecaster
    }

    /// Process every request in order.
    ///
    /// The whole batch is validated first; a malformed request rejects the
    /// batch before any round is played.
    pub fn get_all<V: AsRef<[f64]>>(&mut self, requests: &[V]) -> Result<()> {
        self.get_all_cancellable(requests, &CancellationToken::new())
            .map(|_| ())
    }

    /// Process requests given as catalog indices.
    pub fn get_all_indices(&mut self, requests: &[ItemIndex]) -> Result<()> {
        let parsed = requests
            .iter()
            .map(|&i| RequestVector::one_hot(i, self.catalog_size))
            .collect::<Result<Vec<_>>>()?;
        self.run_requests(&parsed, &CancellationToken::new())
            .map(|_| ())
    }

    /// Like [`get_all`](Self::get_all), stopping between rounds once `cancel`
    /// fires. Returns the number of rounds processed.
    pub fn get_all_cancellable<V: AsRef<[f64]>>(
        &mut self,
        requests: &[V],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let parsed = requests
            .iter()
            .map(|r| RequestVector::from_dense(r.as_ref(), self.catalog_size))
            .collect::<Result<Vec<_>>>()?;
        self.run_requests(&parsed, cancel)
    }

    fn run_requests(
        &mut self,
        requests: &[RequestVector],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let start_round = self.core.round();
        let mut processed = 0;
        for &request in requests {
            if cancel.is_cancelled() {
                warn!(
                    processed,
                    remaining = requests.len() - processed,
                    "Run cancelled between rounds"
                );
                break;
            }
            self.step(request)?;
            processed += 1;
        }

        let summary = self.aggregator.summary();
        if let Some(metrics) = &self.metrics {
            metrics.observe_results(&summary);
        }
        info!(
            from_round = start_round,
            processed,
            hit_rate = summary.hit_rate,
            regret = summary.regret,
            "Processed request batch"
        );
        Ok(processed)
    }

    /// Play a single round: forecast, decide, round, reveal, update.
    pub fn step(&mut self, request: RequestVector) -> Result<RoundOutcome> {
        if request.catalog_size() != self.catalog_size {
            return Err(Error::validation(format!(
                "request sized for {} items, catalog has {}",
                request.catalog_size(),
                self.catalog_size
            )));
        }

        let round = self.core.round();
        let mut demand = self.forecaster.predict(round, self.aggregator.history());
        demand.check_len(self.catalog_size)?;
        let mut recovered = false;
        if let Err(err) = demand.check_finite() {
            warn!(
                error = %err,
                round,
                forecaster = self.forecaster.name(),
                "Clipping forecaster output"
            );
            demand = demand.clipped();
            recovered = true;
        }

        let decision = self.core.decision(&demand)?;
        if recovered || decision.clipped {
            self.aggregator.record_recovered_error();
            if let Some(metrics) = &self.metrics {
                metrics.observe_recovered_error();
            }
        }

        let occupancy = decision.occupancy;
        let cache_set = self.rounding.round(&occupancy, round)?;
        let fractional_cost = self.core.update(&occupancy, &request)?;

        let outcome = self.aggregator.record(
            round,
            cache_set,
            &occupancy,
            request.index(),
            fractional_cost,
        );

        if let Some(metrics) = &self.metrics {
            metrics.observe_round(&outcome);
        }
        debug!(
            round,
            requested = outcome.requested,
            hit = outcome.hit,
            occupancy = outcome.occupancy,
            cache = ?outcome.cache_set.items(),
            "Round complete"
        );
        Ok(outcome)
    }

    /// Snapshot of the run; zero-valued before the first round.
    pub fn results(&self) -> RunResults {
        self.aggregator.results()
    }

    /// Totals of the run without per-round outcomes.
    pub fn summary(&self) -> RunResults {
        self.aggregator.summary()
    }

    /// Capture state for [`restore`](Self::restore).
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            capacity: self.capacity,
            catalog_size: self.catalog_size,
            config: self.config.clone(),
            core: self.core.checkpoint(),
            aggregator: self.aggregator.clone(),
            saved_at: Utc::now(),
        }
    }
}

impl<F: Forecaster> std::fmt::Debug for OftrlCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OftrlCache")
            .field("forecaster", &self.forecaster.name())
            .field("capacity", &self.capacity)
            .field("catalog_size", &self.catalog_size)
            .field("round", &self.core.round())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DemandEstimate, FEASIBILITY_TOLERANCE};
    use crate::forecaster::UniformForecaster;

    fn one_hot(i: usize, n: usize) -> Vec<f64> {
        let mut v = vec![0.0; n];
        v[i] = 1.0;
        v
    }

    /// Returns a fixed vector every round.
    struct Scripted(Vec<f64>);

    impl Forecaster for Scripted {
        fn predict(&mut self, _round: u64, _history: &[ItemIndex]) -> DemandEstimate {
            DemandEstimate::new(self.0.clone())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_construction_validates_capacity() {
        let err = OftrlCache::new(UniformForecaster::new(6, 5), 6, 5).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(OftrlCache::new(UniformForecaster::new(0, 5), 0, 5).is_ok());
    }

    #[test]
    fn test_fresh_results_are_zero() {
        let engine = OftrlCache::new(UniformForecaster::new(2, 5), 2, 5).unwrap();
        let results = engine.results();
        assert_eq!(results.rounds, 0);
        assert_eq!(results.cumulative_cost, 0.0);
        assert_eq!(results.hit_rate, 0.0);
        // reading results has no side effects
        assert_eq!(engine.results(), results);
    }

    #[test]
    fn test_get_all_records_one_outcome_per_round() {
        let mut engine = OftrlCache::new(UniformForecaster::new(2, 5), 2, 5).unwrap();
        let requests: Vec<Vec<f64>> = [0, 0, 1, 1, 2].iter().map(|&i| one_hot(i, 5)).collect();
        engine.get_all(&requests).unwrap();

        let results = engine.results();
        assert_eq!(results.rounds, 5);
        assert_eq!(engine.round(), 5);
        for (t, outcome) in results.outcomes.iter().enumerate() {
            assert_eq!(outcome.round, t as u64);
            assert_eq!(outcome.cache_set.len(), 2);
            assert_eq!(outcome.hit, outcome.cache_set.contains(outcome.requested));
        }
    }

    #[test]
    fn test_invalid_batch_is_rejected_atomically() {
        let mut engine = OftrlCache::new(UniformForecaster::new(2, 4), 2, 4).unwrap();
        let requests = vec![one_hot(0, 4), one_hot(1, 4), vec![0.0, 1.0, 1.0, 0.0]];

        let err = engine.get_all(&requests).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(engine.round(), 0);
        assert_eq!(engine.results().rounds, 0);
        assert!(engine.core().cumulative_gradient().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_index_requests_out_of_range() {
        let mut engine = OftrlCache::new(UniformForecaster::new(1, 3), 1, 3).unwrap();
        assert!(matches!(
            engine.get_all_indices(&[0, 3]),
            Err(Error::Validation(_))
        ));
        engine.get_all_indices(&[0, 2]).unwrap();
        assert_eq!(engine.round(), 2);
    }

    #[test]
    fn test_wrong_length_forecast_is_fatal() {
        let mut engine = OftrlCache::new(Scripted(vec![1.0; 3]), 1, 4).unwrap();
        let err = engine.get_all_indices(&[0]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(engine.results().rounds, 0);
    }

    #[test]
    fn test_non_finite_forecast_is_recovered() {
        let forecaster = Scripted(vec![f64::NAN, f64::INFINITY, 0.5, -1.0]);
        let metrics = EngineMetrics::new().unwrap();
        let mut engine = OftrlCache::new(forecaster, 2, 4)
            .unwrap()
            .with_metrics(metrics);

        engine.get_all_indices(&[0, 1, 2]).unwrap();
        let results = engine.results();
        assert_eq!(results.rounds, 3);
        assert_eq!(results.recovered_errors, 3);
        assert_eq!(engine.metrics().unwrap().rounds(), 3);
    }

    #[test]
    fn test_cancelled_run_stops_between_rounds() {
        let mut engine = OftrlCache::new(UniformForecaster::new(1, 3), 1, 3).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let processed = engine
            .get_all_cancellable(&[one_hot(0, 3), one_hot(1, 3)], &token)
            .unwrap();
        assert_eq!(processed, 0);
        assert_eq!(engine.round(), 0);
    }

    #[test]
    fn test_step_rejects_foreign_request() {
        let mut engine = OftrlCache::new(UniformForecaster::new(1, 3), 1, 3).unwrap();
        let request = RequestVector::one_hot(0, 4).unwrap();
        assert!(matches!(engine.step(request), Err(Error::Validation(_))));
    }

    #[test]
    fn test_occupancy_stays_feasible() {
        let mut engine = OftrlCache::with_config(
            UniformForecaster::new(3, 8),
            3,
            8,
            EngineConfig::euclidean(),
        )
        .unwrap();
        let requests: Vec<usize> = (0..200).map(|t| (t * 7 + t / 3) % 8).collect();
        engine.get_all_indices(&requests).unwrap();

        let x = engine
            .core()
            .decide(&DemandEstimate::uniform(8, 0.0))
            .unwrap();
        assert!(x.is_feasible(3, FEASIBILITY_TOLERANCE));
    }

    #[test]
    fn test_clipped_decision_scores_are_counted() {
        let config = EngineConfig::default().with_miss_cost(1.0e303);
        let metrics = EngineMetrics::new().unwrap();
        let mut engine = OftrlCache::with_config(Scripted(vec![1.0e6, 0.0, 0.0]), 1, 3, config)
            .unwrap()
            .with_metrics(metrics);

        engine.get_all_indices(&[0, 1, 2]).unwrap();
        assert_eq!(engine.results().recovered_errors, 3);
        assert_eq!(engine.metrics().unwrap().recovered_errors(), 3);
    }

    #[test]
    fn test_restore_rejects_tampered_request_counts() {
        let mut engine = OftrlCache::new(UniformForecaster::new(1, 3), 1, 3).unwrap();
        engine.get_all_indices(&[0, 1]).unwrap();

        let mut json = serde_json::to_value(engine.checkpoint()).unwrap();
        json["aggregator"]["request_counts"] = serde_json::json!([50, 0, 0]);
        let checkpoint: Checkpoint = serde_json::from_value(json).unwrap();

        let err = OftrlCache::restore(UniformForecaster::new(1, 3), checkpoint).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_restore_rebuilds_forecaster_history() {
        let mut engine = OftrlCache::new(UniformForecaster::new(1, 3), 1, 3).unwrap();
        engine.get_all_indices(&[2, 0, 2]).unwrap();

        let json = serde_json::to_string(&engine.checkpoint()).unwrap();
        let checkpoint: Checkpoint = serde_json::from_str(&json).unwrap();
        let restored = OftrlCache::restore(UniformForecaster::new(1, 3), checkpoint).unwrap();
        assert_eq!(restored.aggregator.history(), &[2, 0, 2]);
    }

    #[test]
    fn test_single_request_batches_match_one_batch() {
        let requests: Vec<usize> = (0..60).map(|t| (t * 5 + t / 4) % 6).collect();

        let mut whole = OftrlCache::new(UniformForecaster::new(2, 6), 2, 6).unwrap();
        whole.get_all_indices(&requests).unwrap();

        let mut piecewise = OftrlCache::new(UniformForecaster::new(2, 6), 2, 6).unwrap();
        for &r in &requests {
            piecewise.get_all_indices(&[r]).unwrap();
        }

        assert_eq!(piecewise.results(), whole.results());
        let summary = piecewise.summary();
        assert!(summary.outcomes.is_empty());
        assert_eq!(summary.rounds, 60);
        assert_eq!(summary.regret, whole.results().regret);
    }

    #[test]
    fn test_metrics_cover_restored_rounds() {
        let mut engine = OftrlCache::new(UniformForecaster::new(1, 3), 1, 3).unwrap();
        engine.get_all_indices(&[0, 0, 1, 2]).unwrap();
        let before = engine.results();

        let mut restored = OftrlCache::restore(UniformForecaster::new(1, 3), engine.checkpoint())
            .unwrap()
            .with_metrics(EngineMetrics::new().unwrap());
        let metrics = restored.metrics().unwrap();
        assert_eq!(metrics.rounds(), 4);
        assert_eq!(metrics.hits(), before.hits);
        assert_eq!(metrics.misses(), before.misses);

        restored.get_all_indices(&[0]).unwrap();
        assert_eq!(restored.metrics().unwrap().rounds(), 5);
    }
}
