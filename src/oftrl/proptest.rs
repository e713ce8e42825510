//! Property-Based Tests for the Decision Pipeline
//!
//! # Test Properties
//!
//! 1. **Feasibility**: both projections land on the capped simplex
//! 2. **Order preservation**: a higher score never gets less occupancy
//! 3. **Exact size**: rounding always returns k distinct items
//! 4. **Support**: rounding never picks an item with zero occupancy

#![cfg(test)]

use proptest::prelude::*;

use super::projector::CapacityProjector;
use super::rounding::RoundingEngine;
use crate::domain::{OccupancyVector, FEASIBILITY_TOLERANCE};

// =============================================================================
// Property Strategies
// =============================================================================

/// Score vector of length 1..=24 paired with a capacity in [0, n].
fn scores_and_capacity() -> impl Strategy<Value = (Vec<f64>, usize)> {
    prop::collection::vec(-50.0f64..50.0, 1..=24).prop_flat_map(|scores| {
        let n = scores.len();
        (Just(scores), 0..=n)
    })
}

// =============================================================================
// Projection Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: Euclidean projection is feasible for any scores and capacity.
    #[test]
    fn prop_euclidean_feasible((scores, k) in scores_and_capacity()) {
        let x = CapacityProjector::new(k).euclidean(&scores)?;
        prop_assert!(x.is_feasible(k, FEASIBILITY_TOLERANCE), "x = {:?}, k = {}", x, k);
    }

    /// Property: KL projection is feasible for any scores and capacity.
    #[test]
    fn prop_entropic_feasible((scores, k) in scores_and_capacity()) {
        let x = CapacityProjector::new(k).entropic(&scores)?;
        prop_assert!(x.is_feasible(k, FEASIBILITY_TOLERANCE), "x = {:?}, k = {}", x, k);
    }

    /// Property: both projections are monotone in the score.
    #[test]
    fn prop_projection_preserves_order((scores, k) in scores_and_capacity()) {
        let projector = CapacityProjector::new(k);
        for x in [projector.euclidean(&scores)?, projector.entropic(&scores)?] {
            for i in 0..scores.len() {
                for j in 0..scores.len() {
                    if scores[i] > scores[j] {
                        prop_assert!(x.get(i) + 1e-9 >= x.get(j));
                    }
                }
            }
        }
    }
}

// =============================================================================
// Rounding Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: any projected occupancy rounds to exactly k distinct items.
    #[test]
    fn prop_rounding_exact_size(
        (scores, k) in scores_and_capacity(),
        u in 0.0f64..1.0,
    ) {
        let x = CapacityProjector::new(k).euclidean(&scores)?;
        let set = RoundingEngine::new(k, 0).systematic(&x, u)?;
        prop_assert_eq!(set.len(), k);
        prop_assert!(set.items().iter().all(|&i| i < scores.len()));
    }

    /// Property: zero-occupancy items are never cached.
    #[test]
    fn prop_rounding_respects_support(
        (scores, k) in scores_and_capacity(),
        u in 0.0f64..1.0,
    ) {
        prop_assume!(k > 0);
        let x = CapacityProjector::new(k).euclidean(&scores)?;
        let set = RoundingEngine::new(k, 0).systematic(&x, u)?;
        for &i in set.items() {
            prop_assert!(x.get(i) > 0.0, "picked item {} with zero occupancy", i);
        }
    }

    /// Property: integral occupancy vectors round to themselves.
    #[test]
    fn prop_rounding_fixes_integral_vectors(
        mask in prop::collection::vec(any::<bool>(), 1..=24),
        u in 0.0f64..1.0,
    ) {
        let k = mask.iter().filter(|&&b| b).count();
        let x = OccupancyVector::new(mask.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect());
        prop_assume!(k > 0);
        let set = RoundingEngine::new(k, 0).systematic(&x, u)?;
        let expected: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        prop_assert_eq!(set.items(), expected.as_slice());
    }
}
