//! Domain Value Objects
//!
//! Dense vectors indexed by catalog position. Every type checks its own
//! dimensions so a mismatch surfaces before it can reach optimizer state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stable position of an item in the catalog
pub type ItemIndex = usize;

/// Ceiling applied to non-finite forecaster output
pub const MAX_DEMAND: f64 = 1.0e6;

/// Tolerance used when checking feasibility of fractional vectors
pub const FEASIBILITY_TOLERANCE: f64 = 1.0e-6;

// =============================================================================
// Catalog
// =============================================================================

/// Ordered collection of distinct item names.
///
/// The engine itself only sees indices; this is the caller-side lookup used
/// to turn names into one-hot requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    names: Vec<String>,
    index: HashMap<String, ItemIndex>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate or empty item lists.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(Error::config("catalog must contain at least one item"));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(Error::config(format!("duplicate catalog item: {}", name)));
            }
        }

        Ok(Self { names, index })
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of an item by name
    pub fn index_of(&self, name: &str) -> Option<ItemIndex> {
        self.index.get(name).copied()
    }

    /// Name of an item by index
    pub fn name(&self, index: ItemIndex) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// One-hot request for a named item
    pub fn request(&self, name: &str) -> Result<RequestVector> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::validation(format!("unknown catalog item: {}", name)))?;
        RequestVector::one_hot(index, self.len())
    }
}

// =============================================================================
// RequestVector
// =============================================================================

/// One-hot request over the catalog, stored as the hot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestVector {
    index: ItemIndex,
    catalog_size: usize,
}

impl RequestVector {
    /// Request for `index` in a catalog of `catalog_size` items
    pub fn one_hot(index: ItemIndex, catalog_size: usize) -> Result<Self> {
        if index >= catalog_size {
            return Err(Error::validation(format!(
                "request index {} out of range for catalog of {} items",
                index, catalog_size
            )));
        }
        Ok(Self {
            index,
            catalog_size,
        })
    }

    /// Parse a dense numeric vector, requiring exactly one coordinate equal
    /// to 1 and every other coordinate equal to 0.
    pub fn from_dense(values: &[f64], catalog_size: usize) -> Result<Self> {
        if values.len() != catalog_size {
            return Err(Error::validation(format!(
                "request vector has length {}, expected {}",
                values.len(),
                catalog_size
            )));
        }

        let mut hot = None;
        for (i, &v) in values.iter().enumerate() {
            if v == 1.0 {
                if hot.is_some() {
                    return Err(Error::validation(
                        "request vector has more than one hot coordinate",
                    ));
                }
                hot = Some(i);
            } else if v != 0.0 {
                return Err(Error::validation(format!(
                    "request vector coordinate {} is {}, expected 0 or 1",
                    i, v
                )));
            }
        }

        let index = hot.ok_or_else(|| Error::validation("request vector has no hot coordinate"))?;
        Self::one_hot(index, catalog_size)
    }

    /// Requested item
    pub fn index(&self) -> ItemIndex {
        self.index
    }

    pub fn catalog_size(&self) -> usize {
        self.catalog_size
    }

    /// Dense one-hot representation
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.catalog_size];
        dense[self.index] = 1.0;
        dense
    }
}

// =============================================================================
// DemandEstimate
// =============================================================================

/// Non-negative per-item demand produced by a forecaster. Need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandEstimate(Vec<f64>);

impl DemandEstimate {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Same demand for every item
    pub fn uniform(catalog_size: usize, value: f64) -> Self {
        Self(vec![value; catalog_size])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Reject estimates sized for a different catalog.
    pub fn check_len(&self, catalog_size: usize) -> Result<()> {
        if self.0.len() != catalog_size {
            return Err(Error::config(format!(
                "forecaster returned {} values for a catalog of {} items",
                self.0.len(),
                catalog_size
            )));
        }
        Ok(())
    }

    /// Report the first coordinate that is not a finite non-negative number.
    pub fn check_finite(&self) -> Result<()> {
        match self.0.iter().position(|v| !v.is_finite() || *v < 0.0) {
            Some(i) => Err(Error::computation(format!(
                "forecast coordinate {} is {}",
                i, self.0[i]
            ))),
            None => Ok(()),
        }
    }

    /// NaN and negative values become 0; +inf and overly large values
    /// saturate at [`MAX_DEMAND`].
    pub fn clipped(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|&v| {
                    if v.is_nan() || v < 0.0 {
                        0.0
                    } else {
                        v.min(MAX_DEMAND)
                    }
                })
                .collect(),
        )
    }
}

// =============================================================================
// OccupancyVector
// =============================================================================

/// Fractional cache: 0 <= x_i <= 1 and sum(x) = capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyVector(Vec<f64>);

impl OccupancyVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Occupancy of a single item
    pub fn get(&self, index: ItemIndex) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    /// Total fractional mass
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Check the capped-simplex invariant for `capacity`.
    pub fn is_feasible(&self, capacity: usize, tolerance: f64) -> bool {
        self.0
            .iter()
            .all(|&x| x.is_finite() && x >= -tolerance && x <= 1.0 + tolerance)
            && (self.total() - capacity as f64).abs() <= tolerance
    }
}

// =============================================================================
// CacheSet
// =============================================================================

/// Integral caching decision: distinct indices, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CacheSet(Vec<ItemIndex>);

impl CacheSet {
    pub fn new(mut items: Vec<ItemIndex>) -> Self {
        items.sort_unstable();
        items.dedup();
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: ItemIndex) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn items(&self) -> &[ItemIndex] {
        &self.0
    }
}

// =============================================================================
// RoundOutcome
// =============================================================================

/// Record of one processed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Zero-based round index across the whole run
    pub round: u64,
    /// Items committed to cache before the request was revealed
    pub cache_set: CacheSet,
    /// Item that was requested
    pub requested: ItemIndex,
    /// Whether the requested item was cached
    pub hit: bool,
    /// Integral cost incurred (miss cost on a miss, 0 on a hit)
    pub cost: f64,
    /// Fractional occupancy of the requested item
    pub occupancy: f64,
    /// Linearized cost of the fractional decision
    pub fractional_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::new(["a", "b", "c"]).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.index_of("b"), Some(1));
        assert_eq!(catalog.name(2), Some("c"));
        assert_eq!(catalog.index_of("z"), None);

        let req = catalog.request("c").unwrap();
        assert_eq!(req.to_dense(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_empty() {
        assert!(matches!(
            Catalog::new(["a", "a"]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Catalog::new(Vec::<String>::new()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_request_from_dense() {
        let req = RequestVector::from_dense(&[0.0, 1.0, 0.0], 3).unwrap();
        assert_eq!(req.index(), 1);
        assert_eq!(req.catalog_size(), 3);
    }

    #[test]
    fn test_request_rejects_malformed() {
        // wrong length
        assert!(matches!(
            RequestVector::from_dense(&[1.0, 0.0], 3),
            Err(Error::Validation(_))
        ));
        // two hot coordinates
        assert!(matches!(
            RequestVector::from_dense(&[1.0, 1.0, 0.0], 3),
            Err(Error::Validation(_))
        ));
        // no hot coordinate
        assert!(matches!(
            RequestVector::from_dense(&[0.0, 0.0, 0.0], 3),
            Err(Error::Validation(_))
        ));
        // fractional coordinate
        assert!(matches!(
            RequestVector::from_dense(&[0.5, 0.5, 0.0], 3),
            Err(Error::Validation(_))
        ));
        // index out of range
        assert!(matches!(
            RequestVector::one_hot(3, 3),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_demand_clipping() {
        let demand = DemandEstimate::new(vec![f64::NAN, f64::INFINITY, -2.0, 0.5]);
        assert!(matches!(demand.check_finite(), Err(Error::Computation(_))));

        let clipped = demand.clipped();
        assert_eq!(clipped.as_slice(), &[0.0, MAX_DEMAND, 0.0, 0.5]);
        assert!(clipped.check_finite().is_ok());
    }

    #[test]
    fn test_demand_length_check() {
        let demand = DemandEstimate::uniform(4, 1.0);
        assert!(demand.check_len(4).is_ok());
        assert!(matches!(demand.check_len(5), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_occupancy_feasibility() {
        let x = OccupancyVector::new(vec![0.5, 0.5, 1.0]);
        assert!(x.is_feasible(2, FEASIBILITY_TOLERANCE));
        assert!(!x.is_feasible(3, FEASIBILITY_TOLERANCE));

        let over = OccupancyVector::new(vec![1.5, 0.5, 0.0]);
        assert!(!over.is_feasible(2, FEASIBILITY_TOLERANCE));
    }

    #[test]
    fn test_cache_set_normalizes() {
        let set = CacheSet::new(vec![4, 1, 4]);
        assert_eq!(set.items(), &[1, 4]);
        assert!(set.contains(4));
        assert!(!set.contains(2));
    }
}
