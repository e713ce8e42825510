//! Frequency-count forecaster

use crate::domain::{DemandEstimate, Forecaster, ItemIndex};

/// Predicts each item's empirical request share over the full history.
///
/// Counts are kept incrementally; only the suffix of `history` not seen on
/// the previous call is folded in.
#[derive(Debug, Clone)]
pub struct FrequencyForecaster {
    counts: Vec<u64>,
    seen: usize,
}

impl FrequencyForecaster {
    pub fn new(catalog_size: usize) -> Self {
        Self {
            counts: vec![0; catalog_size],
            seen: 0,
        }
    }

    fn absorb(&mut self, history: &[ItemIndex]) {
        // A shorter history means the caller restarted; recount from scratch.
        if history.len() < self.seen {
            self.counts.iter_mut().for_each(|c| *c = 0);
            self.seen = 0;
        }
        for &item in &history[self.seen..] {
            if let Some(count) = self.counts.get_mut(item) {
                *count += 1;
            }
        }
        self.seen = history.len();
    }
}

impl Forecaster for FrequencyForecaster {
    fn predict(&mut self, _round: u64, history: &[ItemIndex]) -> DemandEstimate {
        self.absorb(history);

        let n = self.counts.len();
        if self.seen == 0 {
            return DemandEstimate::uniform(n, if n == 0 { 0.0 } else { 1.0 / n as f64 });
        }

        let total = self.seen as f64;
        DemandEstimate::new(self.counts.iter().map(|&c| c as f64 / total).collect())
    }

    fn name(&self) -> &str {
        "frequency"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_without_history() {
        let mut f = FrequencyForecaster::new(4);
        assert_eq!(f.predict(0, &[]).as_slice(), &[0.25; 4]);
    }

    #[test]
    fn test_tracks_shares_incrementally() {
        let mut f = FrequencyForecaster::new(3);
        let history = [0, 0, 1, 0];

        let d = f.predict(2, &history[..2]);
        assert_eq!(d.as_slice(), &[1.0, 0.0, 0.0]);

        let d = f.predict(4, &history);
        assert_eq!(d.as_slice(), &[0.75, 0.25, 0.0]);
    }

    #[test]
    fn test_recounts_on_shorter_history() {
        let mut f = FrequencyForecaster::new(2);
        f.predict(3, &[0, 0, 0]);
        let d = f.predict(1, &[1]);
        assert_eq!(d.as_slice(), &[0.0, 1.0]);
    }
}
