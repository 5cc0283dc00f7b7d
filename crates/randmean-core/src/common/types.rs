//! # Request Limits and Result Types
//!
//! Shared types passed between the fan-out orchestrator and the HTTP handler,
//! plus the limits both sides enforce.
//!
//! - [`RandomSet`] - the integers returned by one upstream call
//! - [`SetCollection`] - one [`RandomSet`] per concurrent call, in request
//!   order
//! - [`CalculationResult`] - one entry of the JSON response body

use crate::{Result, stats};
use serde::{Deserialize, Serialize};

/// Ordered integers returned by a single upstream call.
///
/// Values are passed through as received; the length is expected, not
/// guaranteed, to match the requested count.
pub type RandomSet = Vec<i64>;

/// Smallest integer requested from the upstream.
pub const MIN_VALUE: i64 = 1;

/// Largest integer requested from the upstream.
pub const MAX_VALUE: i64 = 1000;

/// Upper bound on the `length` query parameter.
pub const MAX_LENGTH: i64 = 10_000;

/// Upper bound on the `requests` query parameter.
pub const MAX_REQUESTS: i64 = 100;

/// Fixed-size, index-ordered collection of random sets.
///
/// Slot `i` always holds the result of the `i`-th upstream request,
/// independent of the order in which the requests completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetCollection {
    sets: Vec<RandomSet>,
}

impl SetCollection {
    pub const fn new(sets: Vec<RandomSet>) -> Self {
        Self { sets }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets(&self) -> &[RandomSet] {
        &self.sets
    }

    pub fn iter(&self) -> core::slice::Iter<'_, RandomSet> {
        self.sets.iter()
    }

    /// Total number of integers across all sets.
    pub fn total_values(&self) -> usize {
        self.sets.iter().map(Vec::len).sum()
    }

    /// Concatenation of every set in slot order.
    pub fn aggregate(&self) -> RandomSet {
        let mut aggregate = Vec::with_capacity(self.total_values());
        for set in &self.sets {
            aggregate.extend_from_slice(set);
        }
        aggregate
    }

    /// Computes one [`CalculationResult`] per set followed by one over the
    /// aggregate, so the batch always holds `len() + 1` entries.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EmptySample`] if any set (or the aggregate) is
    /// empty.
    pub fn calculate(&self) -> Result<Vec<CalculationResult>> {
        let mut results = Vec::with_capacity(self.sets.len() + 1);
        for set in &self.sets {
            results.push(CalculationResult::from_set(set.clone())?);
        }
        results.push(CalculationResult::from_set(self.aggregate())?);
        Ok(results)
    }

    pub fn into_sets(self) -> Vec<RandomSet> {
        self.sets
    }
}

impl<'a> IntoIterator for &'a SetCollection {
    type Item = &'a RandomSet;
    type IntoIter = core::slice::Iter<'a, RandomSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

/// Standard deviation of a set alongside the set itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    #[serde(rename = "stddev")]
    pub std_dev: f64,
    pub data: RandomSet,
}

impl CalculationResult {
    /// # Errors
    ///
    /// Returns [`crate::Error::EmptySample`] if `data` is empty.
    pub fn from_set(data: RandomSet) -> Result<Self> {
        Ok(Self {
            std_dev: stats::standard_deviation(&data)?,
            data,
        })
    }
}
