//! Engine metrics registry

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};

use crate::domain::RoundOutcome;
use crate::engine::RunResults;
use crate::error::{Error, Result};

/// Metrics for one engine, registered on a private registry so several
/// engines can coexist in one process.
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    rounds: IntCounter,
    hits: IntCounter,
    misses: IntCounter,
    recovered_errors: IntCounter,
    hit_rate: Gauge,
    regret: Gauge,
    fractional_regret: Gauge,
}

impl EngineMetrics {
    /// Create and register every metric.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let rounds = IntCounter::new("oftrl_cache_rounds_total", "Total rounds processed")?;
        let hits = IntCounter::new("oftrl_cache_hits_total", "Requests served from cache")?;
        let misses = IntCounter::new("oftrl_cache_misses_total", "Requests not in cache")?;
        let recovered_errors = IntCounter::new(
            "oftrl_cache_recovered_errors_total",
            "Numerical problems clipped within a round",
        )?;
        let hit_rate = Gauge::new("oftrl_cache_hit_rate", "Hit rate over the run")?;
        let regret = Gauge::new(
            "oftrl_cache_regret",
            "Cumulative cost minus best fixed cache cost",
        )?;
        let fractional_regret = Gauge::new(
            "oftrl_cache_fractional_regret",
            "Fractional cost minus best fixed cache cost",
        )?;

        registry.register(Box::new(rounds.clone()))?;
        registry.register(Box::new(hits.clone()))?;
        registry.register(Box::new(misses.clone()))?;
        registry.register(Box::new(recovered_errors.clone()))?;
        registry.register(Box::new(hit_rate.clone()))?;
        registry.register(Box::new(regret.clone()))?;
        registry.register(Box::new(fractional_regret.clone()))?;

        Ok(Self {
            registry,
            rounds,
            hits,
            misses,
            recovered_errors,
            hit_rate,
            regret,
            fractional_regret,
        })
    }

    /// Count one processed round
    pub fn observe_round(&self, outcome: &RoundOutcome) {
        self.rounds.inc();
        if outcome.hit {
            self.hits.inc();
        } else {
            self.misses.inc();
        }
    }

    /// Add totals already recorded elsewhere, e.g. by a restored run
    pub fn observe_totals(&self, results: &RunResults) {
        self.rounds.inc_by(results.rounds);
        self.hits.inc_by(results.hits);
        self.misses.inc_by(results.misses);
        self.recovered_errors.inc_by(results.recovered_errors);
    }

    pub fn observe_recovered_error(&self) {
        self.recovered_errors.inc();
    }

    /// Refresh gauges from a results snapshot
    pub fn observe_results(&self, results: &RunResults) {
        self.hit_rate.set(results.hit_rate);
        self.regret.set(results.regret);
        self.fractional_regret.set(results.fractional_regret);
    }

    pub fn rounds(&self) -> u64 {
        self.rounds.get()
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    pub fn recovered_errors(&self) -> u64 {
        self.recovered_errors.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::Internal(format!("metrics output is not UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("rounds", &self.rounds.get())
            .field("hits", &self.hits.get())
            .field("misses", &self.misses.get())
            .finish()
    }
}
