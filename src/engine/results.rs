//! Results Aggregation
//!
//! Hit/miss accounting against committed cache sets, and regret against the
//! best fixed cache chosen with full hindsight.

use serde::{Deserialize, Serialize};

use crate::domain::{CacheSet, ItemIndex, OccupancyVector, RoundOutcome};
use crate::error::{Error, Result};

/// Aggregate statistics for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunResults {
    /// Rounds processed
    pub rounds: u64,
    pub hits: u64,
    pub misses: u64,
    /// hits / rounds, 0 before any round
    pub hit_rate: f64,
    /// Integral miss cost of the committed cache sets
    pub cumulative_cost: f64,
    /// Linearized cost of the fractional decisions
    pub fractional_cost: f64,
    /// Best fixed cache in hindsight
    pub best_fixed_set: CacheSet,
    /// Cost the best fixed cache would have paid
    pub best_fixed_cost: f64,
    /// cumulative_cost − best_fixed_cost
    pub regret: f64,
    /// fractional_cost − best_fixed_cost
    pub fractional_regret: f64,
    /// Rounds in which a numerical problem was clipped away
    pub recovered_errors: u64,
    /// Per-round records, oldest first
    pub outcomes: Vec<RoundOutcome>,
}

impl RunResults {
    /// Average regret per round
    pub fn regret_per_round(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.regret / self.rounds as f64
        }
    }
}

impl std::fmt::Display for RunResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "rounds:            {}", self.rounds)?;
        writeln!(
            f,
            "hits / misses:     {} / {} (hit rate {:.4})",
            self.hits, self.misses, self.hit_rate
        )?;
        writeln!(f, "cumulative cost:   {:.4}", self.cumulative_cost)?;
        writeln!(f, "fractional cost:   {:.4}", self.fractional_cost)?;
        writeln!(
            f,
            "best fixed cache:  {:?} (cost {:.4})",
            self.best_fixed_set.items(),
            self.best_fixed_cost
        )?;
        write!(
            f,
            "regret:            {:.4} (fractional {:.4})",
            self.regret, self.fractional_regret
        )
    }
}

/// Running tallies for one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsAggregator {
    capacity: usize,
    miss_cost: f64,
    request_counts: Vec<u64>,
    hits: u64,
    cumulative_cost: f64,
    fractional_cost: f64,
    recovered_errors: u64,
    outcomes: Vec<RoundOutcome>,
    /// Requested items, oldest first; rebuilt from `outcomes` on load
    #[serde(skip)]
    requests: Vec<ItemIndex>,
}

impl ResultsAggregator {
    pub fn new(capacity: usize, catalog_size: usize, miss_cost: f64) -> Self {
        Self {
            capacity,
            miss_cost,
            request_counts: vec![0; catalog_size],
            hits: 0,
            cumulative_cost: 0.0,
            fractional_cost: 0.0,
            recovered_errors: 0,
            outcomes: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Rounds recorded so far
    pub fn rounds(&self) -> u64 {
        self.outcomes.len() as u64
    }

    pub fn catalog_size(&self) -> usize {
        self.request_counts.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requested items, oldest first
    pub fn history(&self) -> &[ItemIndex] {
        &self.requests
    }

    /// Check a deserialized aggregator against its own outcomes and rebuild
    /// the request log.
    pub fn verify(mut self, capacity: usize, catalog_size: usize) -> Result<Self> {
        if self.capacity != capacity || self.request_counts.len() != catalog_size {
            return Err(Error::config(format!(
                "aggregator is sized for capacity {} of {} items, expected {} of {}",
                self.capacity,
                self.request_counts.len(),
                capacity,
                catalog_size
            )));
        }

        let mut counts = vec![0u64; catalog_size];
        let mut hits = 0u64;
        for (t, outcome) in self.outcomes.iter().enumerate() {
            if outcome.round != t as u64 {
                return Err(Error::config(format!(
                    "outcome {} is labelled round {}",
                    t, outcome.round
                )));
            }
            if outcome.requested >= catalog_size {
                return Err(Error::config(format!(
                    "round {} requested item {} outside a catalog of {}",
                    outcome.round, outcome.requested, catalog_size
                )));
            }
            let set = &outcome.cache_set;
            let items = set.items();
            if items.len() != capacity
                || items.iter().any(|&i| i >= catalog_size)
                || items.windows(2).any(|w| w[0] >= w[1])
            {
                return Err(Error::config(format!(
                    "round {} committed an invalid cache set {:?}",
                    outcome.round, items
                )));
            }
            if outcome.hit != set.contains(outcome.requested) {
                return Err(Error::config(format!(
                    "round {} hit flag disagrees with its cache set",
                    outcome.round
                )));
            }
            counts[outcome.requested] += 1;
            if outcome.hit {
                hits += 1;
            }
        }

        if counts != self.request_counts {
            return Err(Error::config("request counts do not match the recorded outcomes"));
        }
        if hits != self.hits {
            return Err(Error::config(format!(
                "{} hits recorded but outcomes contain {}",
                self.hits, hits
            )));
        }

        self.requests = self.outcomes.iter().map(|o| o.requested).collect();
        Ok(self)
    }

    /// Classify the revealed request against the committed set and record it.
    pub fn record(
        &mut self,
        round: u64,
        cache_set: CacheSet,
        occupancy: &OccupancyVector,
        requested: ItemIndex,
        fractional_cost: f64,
    ) -> RoundOutcome {
        let hit = cache_set.contains(requested);
        let cost = if hit { 0.0 } else { self.miss_cost };

        if hit {
            self.hits += 1;
        }
        self.cumulative_cost += cost;
        self.fractional_cost += fractional_cost;
        if let Some(count) = self.request_counts.get_mut(requested) {
            *count += 1;
        }

        let outcome = RoundOutcome {
            round,
            cache_set,
            requested,
            hit,
            cost,
            occupancy: occupancy.get(requested),
            fractional_cost,
        };
        self.outcomes.push(outcome.clone());
        self.requests.push(requested);
        outcome
    }

    /// Count a numerical problem that was clipped away.
    pub fn record_recovered_error(&mut self) {
        self.recovered_errors += 1;
    }

    /// Best fixed cache in hindsight and its cost.
    ///
    /// With a linear miss cost the optimum keeps the k most requested items
    /// (lower index first on ties), and no fractional cache does better.
    pub fn best_fixed_cache(&self) -> (CacheSet, f64) {
        let mut order: Vec<ItemIndex> = (0..self.request_counts.len()).collect();
        order.sort_by(|&a, &b| {
            self.request_counts[b]
                .cmp(&self.request_counts[a])
                .then(a.cmp(&b))
        });
        order.truncate(self.capacity);

        let covered: u64 = order.iter().map(|&i| self.request_counts[i]).sum();
        let missed = self.rounds().saturating_sub(covered);
        (CacheSet::new(order), missed as f64 * self.miss_cost)
    }

    /// Totals without the per-round outcomes; zero-valued before the first
    /// round.
    pub fn summary(&self) -> RunResults {
        let rounds = self.rounds();
        if rounds == 0 {
            return RunResults {
                recovered_errors: self.recovered_errors,
                ..RunResults::default()
            };
        }

        let (best_fixed_set, best_fixed_cost) = self.best_fixed_cache();
        RunResults {
            rounds,
            hits: self.hits,
            misses: rounds.saturating_sub(self.hits),
            hit_rate: self.hits as f64 / rounds as f64,
            cumulative_cost: self.cumulative_cost,
            fractional_cost: self.fractional_cost,
            best_fixed_set,
            best_fixed_cost,
            regret: self.cumulative_cost - best_fixed_cost,
            fractional_regret: self.fractional_cost - best_fixed_cost,
            recovered_errors: self.recovered_errors,
            outcomes: Vec::new(),
        }
    }

    /// Snapshot of the run so far, including every outcome.
    pub fn results(&self) -> RunResults {
        RunResults {
            outcomes: self.outcomes.clone(),
            ..self.summary()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
